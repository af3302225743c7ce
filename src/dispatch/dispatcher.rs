use std::{cell::RefCell, rc::Rc};

use log::{error, warn};

use crate::{
    clock::SimDuration,
    dispatch::{
        error::{DispatchReport, ListenerError, ListenerFault},
        listener::{Listener, OrderingConstraints},
        payload::{Payload, PayloadKind},
        rank_cache::RankCache,
        registry::{ListenerHandle, ListenerRegistry, Scope},
    },
    state::graph::{StateGraph, StateId},
    types::{Rank, RegistrationIndex},
};

/// What to do with listeners that carry no nameable kind (bare callbacks) and
/// therefore cannot be placed by the ordering solver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnrankedPolicy {
    /// Invoke them at a default rank, after every ordered listener.
    InvokeLast,
    /// Skip them entirely.
    Skip,
}

#[derive(Clone, Copy, Debug)]
pub struct DispatcherConfig {
    pub unranked: UnrankedPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            unranked: UnrankedPolicy::InvokeLast,
        }
    }
}

/// Deferred machine mutation queued by a listener during dispatch and drained
/// by the owning state machine after the dispatch pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionCommand {
    Transition { next: StateId, delay: SimDuration },
    Clear,
}

/// Discovers listener instances for a payload type within a scope and invokes
/// them in deterministic, constraint-ordered sequence.
///
/// Dispatch is synchronous and reentrant: listener lists are snapshotted
/// before iteration and the rank cache is only borrowed between invocations,
/// so a listener may dispatch further payloads through the `cx` handle it
/// receives. Registration requires `&mut self` and is therefore impossible
/// mid-dispatch; listener structure is fixed while a pass is running.
pub struct Dispatcher {
    graph: Rc<StateGraph>,
    config: DispatcherConfig,
    registry: ListenerRegistry,
    cache: RefCell<RankCache>,
    queued: RefCell<Vec<TransitionCommand>>,
}

impl Dispatcher {
    pub fn new(graph: Rc<StateGraph>) -> Self {
        Self::with_config(graph, DispatcherConfig::default())
    }

    pub fn with_config(graph: Rc<StateGraph>, config: DispatcherConfig) -> Self {
        Self {
            graph,
            config,
            registry: ListenerRegistry::new(),
            cache: RefCell::new(RankCache::new()),
            queued: RefCell::new(Vec::new()),
        }
    }

    /// Registers a listener instance for payload type `P` within `scope`.
    pub fn register<P: Payload, L: Listener<P>>(
        &mut self,
        scope: Scope,
        listener: Rc<RefCell<L>>,
        constraints: OrderingConstraints,
    ) {
        self.registry.register(scope, listener, constraints);
    }

    /// Registers a bare callback for payload type `P` within `scope`.
    ///
    /// Callbacks have no nameable listener kind, so ordering constraints
    /// cannot reference them; whether they run at all is governed by
    /// [`DispatcherConfig::unranked`].
    pub fn register_fn<P: Payload, F>(&mut self, scope: Scope, callback: F)
    where
        F: FnMut(&P, &Dispatcher) -> Result<(), ListenerError> + 'static,
    {
        self.registry.register_fn(scope, callback);
    }

    /// Number of listeners that a dispatch of `P` within `scope` would
    /// discover, before the unranked policy is applied.
    pub fn listener_count<P: Payload>(&self, scope: Scope) -> usize {
        self.registry
            .entries_for(PayloadKind::of::<P>())
            .iter()
            .filter(|entry| self.scope_matches(entry.scope, scope))
            .count()
    }

    /// Drops all cached orderings; they rebuild lazily on next dispatch.
    pub fn clear_rank_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Whether listener ordering for `P` degraded to registration order after
    /// a constraint contradiction.
    pub fn is_rank_fallback<P: Payload>(&self) -> bool {
        self.cache.borrow().is_fallback(PayloadKind::of::<P>())
    }

    /// Queues a transition request for the owning machine. Last write wins
    /// once the machine drains the queue.
    pub fn request_transition(&self, next: StateId, delay: SimDuration) {
        self.queued
            .borrow_mut()
            .push(TransitionCommand::Transition { next, delay });
    }

    /// Queues cancellation of the pending scheduled transition.
    pub fn request_clear_transition(&self) {
        self.queued.borrow_mut().push(TransitionCommand::Clear);
    }

    /// Drains commands queued by listeners since the last call.
    pub fn take_commands(&self) -> Vec<TransitionCommand> {
        std::mem::take(&mut self.queued.borrow_mut())
    }

    /// Invokes every listener for `P` within `scope`, ordered by cached rank,
    /// with per-listener failure isolation.
    pub fn dispatch<P: Payload>(&self, scope: Scope, payload: &P) -> DispatchReport {
        let payload_kind = PayloadKind::of::<P>();
        let entries = self.registry.entries_for(payload_kind);
        if entries.is_empty() {
            return DispatchReport::default();
        }

        let declared = self.registry.declared_for(payload_kind);
        {
            let mut cache = self.cache.borrow_mut();
            if !cache.is_complete(payload_kind, declared) {
                cache.rebuild(payload_kind, declared);
            }
        }

        // snapshot the matching listeners with their sort keys; the cache
        // borrow ends before any listener runs
        let mut has_unranked = false;
        let mut selected: Vec<Selected<P>> = Vec::new();
        {
            let cache = self.cache.borrow();
            let ranks = cache.ranks_for(payload_kind);
            for entry in entries {
                if !self.scope_matches(entry.scope, scope) {
                    continue;
                }
                let sort_key = match entry.kind {
                    Some(kind) => {
                        let rank = ranks.and_then(|map| map.get(&kind)).copied().unwrap_or(0);
                        (0u8, rank, entry.index)
                    }
                    None => {
                        has_unranked = true;
                        match self.config.unranked {
                            UnrankedPolicy::InvokeLast => (1u8, 0, entry.index),
                            UnrankedPolicy::Skip => continue,
                        }
                    }
                };
                // the registry keys entries by payload kind, so this
                // downcast cannot fail
                let Some(handle) = entry.handle.downcast_ref::<ListenerHandle<P>>() else {
                    continue;
                };
                selected.push(Selected {
                    label: entry.kind.map(|kind| kind.name()).unwrap_or("<anonymous>"),
                    sort_key,
                    object: Rc::clone(&handle.object),
                });
            }
        }
        if has_unranked && self.cache.borrow_mut().mark_unranked_warned(payload_kind) {
            match self.config.unranked {
                UnrankedPolicy::InvokeLast => warn!(
                    "Payload {} has listeners without a nameable type; they run after all ordered listeners, in registration order",
                    payload_kind.name(),
                ),
                UnrankedPolicy::Skip => warn!(
                    "Payload {} has listeners without a nameable type; they are skipped per dispatcher policy",
                    payload_kind.name(),
                ),
            }
        }

        selected.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));

        let mut report = DispatchReport::default();
        for listener in &selected {
            match listener.object.try_borrow_mut() {
                Ok(mut object) => {
                    report.invoked += 1;
                    if let Err(err) = object.receive(payload, self) {
                        report.faults.push(ListenerFault {
                            listener: listener.label.to_string(),
                            error: err,
                        });
                    }
                }
                // the instance is already executing further up the stack
                Err(_) => report.faults.push(ListenerFault {
                    listener: listener.label.to_string(),
                    error: ListenerError::new(
                        "listener instance is already executing; reentrant dispatch to the same instance is not supported",
                    ),
                }),
            }
        }

        if !report.is_clean() {
            self.log_faults(payload_kind, &report);
        }
        report
    }

    fn log_faults(&self, payload_kind: PayloadKind, report: &DispatchReport) {
        if let [fault] = report.faults.as_slice() {
            error!(
                "Listener {} failed during {} dispatch: {}",
                fault.listener,
                payload_kind.name(),
                fault.error,
            );
        } else {
            let combined: Vec<String> = report
                .faults
                .iter()
                .map(|fault| format!("{}: {}", fault.listener, fault.error))
                .collect();
            error!(
                "{} listeners failed during {} dispatch: [{}]",
                report.faults.len(),
                payload_kind.name(),
                combined.join("; "),
            );
        }
    }

    fn scope_matches(&self, registered: Scope, requested: Scope) -> bool {
        match (registered, requested) {
            (_, Scope::Global) => true,
            // global listeners sit above every node and observe all scopes
            (Scope::Global, Scope::Node(_)) => true,
            (Scope::Node(at), Scope::Node(root)) => self.graph.is_in_scope(at, root),
        }
    }
}

struct Selected<P: Payload> {
    label: &'static str,
    sort_key: (u8, Rank, RegistrationIndex),
    object: Rc<RefCell<dyn Listener<P>>>,
}
