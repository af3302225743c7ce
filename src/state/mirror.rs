use std::rc::Rc;

use crate::{
    clock::SimTime,
    state::{
        graph::{StateGraph, StateId},
        machine::StateSyncEvent,
    },
};

/// Follower-side read-only view of a replicated state machine.
///
/// A mirror reduces the authority's [`StateSyncEvent`] stream into local
/// activation flags: it computes the same ancestor diff the authority did and
/// toggles visibility, but it has no hooks, no dispatcher, and no mutators
/// for the replicated fields. Lifecycle side effects are authority-only by
/// construction, not by runtime check.
pub struct StateMirror {
    graph: Rc<StateGraph>,
    active: Vec<bool>,
    current: Option<StateId>,
    pending: Option<(StateId, SimTime)>,
}

impl StateMirror {
    pub fn new(graph: Rc<StateGraph>) -> Self {
        let active = vec![false; graph.len()];
        Self {
            graph,
            active,
            current: None,
            pending: None,
        }
    }

    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    /// The mirrored scheduled transition; informational only.
    pub fn pending(&self) -> Option<(StateId, SimTime)> {
        self.pending
    }

    pub fn is_active(&self, id: StateId) -> bool {
        self.active[id.index()]
    }

    pub fn active_path(&self) -> Vec<StateId> {
        self.current
            .map(|current| self.graph.chain(current))
            .unwrap_or_default()
    }

    /// Applies one replicated event. Events must be applied in the order the
    /// authority published them; the channel is assumed last-value-wins.
    pub fn apply(&mut self, event: StateSyncEvent) {
        match event {
            StateSyncEvent::Current { state } => {
                let old_chain = self.active_path();
                let new_chain = state
                    .map(|id| self.graph.chain(id))
                    .unwrap_or_default();

                for id in old_chain.iter().rev() {
                    if !new_chain.contains(id) {
                        self.active[id.index()] = false;
                    }
                }
                for id in &new_chain {
                    if !old_chain.contains(id) {
                        self.active[id.index()] = true;
                    }
                }
                self.current = state;
            }
            StateSyncEvent::Pending { transition } => {
                self.pending = transition;
            }
        }
    }
}
