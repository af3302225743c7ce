use std::collections::HashMap;

use log::warn;

use crate::{
    dispatch::{
        listener::{ListenerKind, OrderingConstraints},
        payload::PayloadKind,
    },
    ordering::{constraint::ConstraintSet, error::SolveError, solver},
    types::Rank,
};

#[derive(Default)]
struct PayloadRanks {
    ranks: HashMap<ListenerKind, Rank>,
    /// Set when the last solve failed; ranks then follow registration order.
    fallback: bool,
    warned_unranked: bool,
}

/// Per-payload mapping from listener type to rank in the computed total
/// order.
///
/// Entries are created lazily on first dispatch of a payload type and grow
/// (never shrink) as new listener types register, e.g. across a hot reload.
/// On a constraint contradiction the cache degrades to registration order for
/// that payload, logged once per rebuild, rather than failing the dispatch.
pub struct RankCache {
    payloads: HashMap<PayloadKind, PayloadRanks>,
}

impl RankCache {
    pub fn new() -> Self {
        Self {
            payloads: HashMap::new(),
        }
    }

    /// Drops every computed ordering; the next dispatch per payload rebuilds.
    pub fn clear(&mut self) {
        self.payloads.clear();
    }

    pub(crate) fn is_complete(
        &self,
        payload_kind: PayloadKind,
        declared: &[(ListenerKind, OrderingConstraints)],
    ) -> bool {
        match self.payloads.get(&payload_kind) {
            Some(entry) => declared
                .iter()
                .all(|(kind, _)| entry.ranks.contains_key(kind)),
            None => declared.is_empty(),
        }
    }

    /// Recomputes the order over every declared listener kind for a payload.
    ///
    /// `before`/`after` references to kinds absent from `declared` are
    /// dropped: constraints expand against known types only.
    pub(crate) fn rebuild(
        &mut self,
        payload_kind: PayloadKind,
        declared: &[(ListenerKind, OrderingConstraints)],
    ) {
        let index_of: HashMap<ListenerKind, usize> = declared
            .iter()
            .enumerate()
            .map(|(index, (kind, _))| (*kind, index))
            .collect();

        let mut set = ConstraintSet::new(declared.len());
        for (index, (_, constraints)) in declared.iter().enumerate() {
            if constraints.run_first {
                set.mark_first(index);
            }
            if constraints.run_last {
                set.mark_last(index);
            }
            for other in &constraints.run_before {
                if let Some(&later) = index_of.get(other) {
                    set.add_pair(index, later);
                }
            }
            for other in &constraints.run_after {
                if let Some(&earlier) = index_of.get(other) {
                    set.add_pair(earlier, index);
                }
            }
        }

        let entry = self.payloads.entry(payload_kind).or_default();
        match solver::solve(&set) {
            Ok(order) => {
                entry.fallback = false;
                for (rank, &item) in order.iter().enumerate() {
                    entry.ranks.insert(declared[item].0, rank as Rank);
                }
            }
            Err(error) => {
                warn!(
                    "Listener ordering for payload {} is unsolvable ({}); falling back to registration order",
                    payload_kind.name(),
                    describe(&error, declared),
                );
                entry.fallback = true;
                for (index, (kind, _)) in declared.iter().enumerate() {
                    entry.ranks.insert(*kind, index as Rank);
                }
            }
        }
    }

    /// Whether ordering for a payload degraded to registration order after a
    /// constraint contradiction.
    pub fn is_fallback(&self, payload_kind: PayloadKind) -> bool {
        self.payloads
            .get(&payload_kind)
            .map(|entry| entry.fallback)
            .unwrap_or(false)
    }

    pub(crate) fn ranks_for(
        &self,
        payload_kind: PayloadKind,
    ) -> Option<&HashMap<ListenerKind, Rank>> {
        self.payloads.get(&payload_kind).map(|entry| &entry.ranks)
    }

    /// True the first time an unranked listener is seen for a payload; used
    /// to warn once per payload kind instead of once per dispatch.
    pub(crate) fn mark_unranked_warned(&mut self, payload_kind: PayloadKind) -> bool {
        let entry = self.payloads.entry(payload_kind).or_default();
        if entry.warned_unranked {
            false
        } else {
            entry.warned_unranked = true;
            true
        }
    }
}

impl Default for RankCache {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(error: &SolveError, declared: &[(ListenerKind, OrderingConstraints)]) -> String {
    match error {
        SolveError::Contradiction { earlier, later } => format!(
            "contradictory constraints between {} and {}",
            declared[*earlier].0.name(),
            declared[*later].0.name(),
        ),
        other => other.to_string(),
    }
}
