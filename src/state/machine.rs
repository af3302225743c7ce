use std::{collections::HashMap, rc::Rc};

use log::error;

use crate::{
    clock::{SimDuration, SimTime},
    dispatch::{
        dispatcher::{Dispatcher, DispatcherConfig, TransitionCommand},
        registry::Scope,
    },
    state::{
        error::MachineError,
        graph::{StateGraph, StateId},
        node::{EnterState, LeaveState, NodeHooks, UpdateState},
    },
};

#[derive(Clone, Copy, Debug)]
pub struct MachineConfig {
    /// Upper bound on transitions committed within a single tick; the guard
    /// that turns a zero-delay transition cycle into a detectable error.
    pub max_instant_transitions: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_instant_transitions: 16,
        }
    }
}

/// Replication event published by the authority whenever it mutates a
/// replicated field. The transport is an external collaborator: the caller
/// drains [`StateMachine::take_outgoing_events`] and delivers the events to
/// follower [`StateMirror`](crate::state::mirror::StateMirror)s in order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateSyncEvent {
    /// The authoritative current state changed.
    Current { state: Option<StateId> },
    /// The authoritative scheduled transition changed or was cleared.
    Pending {
        transition: Option<(StateId, SimTime)>,
    },
}

/// The authoritative side of a replicated hierarchical state machine.
///
/// Owns the single writable copy of `current` and the pending scheduled
/// transition, drives enter/update/leave lifecycles through its dispatcher,
/// and publishes [`StateSyncEvent`]s for follower mirrors. Followers get a
/// separate, mutation-free type; there is no follower code path in here.
pub struct StateMachine {
    graph: Rc<StateGraph>,
    config: MachineConfig,
    dispatcher: Dispatcher,
    active: Vec<bool>,
    current: Option<StateId>,
    pending: Option<(StateId, SimTime)>,
    hooks: HashMap<StateId, NodeHooks>,
    outgoing: Vec<StateSyncEvent>,
}

impl StateMachine {
    pub fn new(graph: Rc<StateGraph>) -> Self {
        Self::with_config(graph, MachineConfig::default(), DispatcherConfig::default())
    }

    pub fn with_config(
        graph: Rc<StateGraph>,
        config: MachineConfig,
        dispatcher_config: DispatcherConfig,
    ) -> Self {
        let dispatcher = Dispatcher::with_config(Rc::clone(&graph), dispatcher_config);
        let active = vec![false; graph.len()];
        Self {
            graph,
            config,
            dispatcher,
            active,
            current: None,
            pending: None,
            hooks: HashMap::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn graph(&self) -> &Rc<StateGraph> {
        &self.graph
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Mutable dispatcher access, for listener registration.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    pub fn pending(&self) -> Option<(StateId, SimTime)> {
        self.pending
    }

    pub fn is_active(&self, id: StateId) -> bool {
        self.active[id.index()]
    }

    /// Root-to-leaf chain of the currently active states.
    pub fn active_path(&self) -> Vec<StateId> {
        self.current
            .map(|current| self.graph.chain(current))
            .unwrap_or_default()
    }

    /// Registers a direct enter callback for `state`.
    pub fn on_enter(&mut self, state: StateId, hook: impl FnMut(StateId, SimTime) + 'static) {
        self.assert_known(state);
        self.hooks.entry(state).or_default().enter = Some(Box::new(hook));
    }

    /// Registers a direct update callback for `state`.
    pub fn on_update(&mut self, state: StateId, hook: impl FnMut(StateId, SimTime) + 'static) {
        self.assert_known(state);
        self.hooks.entry(state).or_default().update = Some(Box::new(hook));
    }

    /// Registers a direct leave callback for `state`.
    pub fn on_leave(&mut self, state: StateId, hook: impl FnMut(StateId, SimTime) + 'static) {
        self.assert_known(state);
        self.hooks.entry(state).or_default().leave = Some(Box::new(hook));
    }

    /// Schedules a transition to `next` after `delay`. Last write wins: any
    /// previously pending transition is replaced, never queued behind.
    pub fn transition(&mut self, next: StateId, delay: SimDuration, now: SimTime) {
        self.assert_known(next);
        debug_assert!(
            delay >= SimDuration::ZERO,
            "transition delay must not be negative, got {:?}",
            delay
        );
        self.pending = Some((next, now + delay));
        self.outgoing.push(StateSyncEvent::Pending {
            transition: self.pending,
        });
    }

    /// Cancels the pending scheduled transition, if any.
    pub fn clear_transition(&mut self) {
        self.pending = None;
        self.outgoing
            .push(StateSyncEvent::Pending { transition: None });
    }

    /// Drains the replication events published since the last call.
    pub fn take_outgoing_events(&mut self) -> Vec<StateSyncEvent> {
        std::mem::take(&mut self.outgoing)
    }

    /// Advances the machine by one authoritative tick.
    ///
    /// Updates the current state, then commits every due scheduled
    /// transition, re-arming default-next chains as states are entered, up to
    /// the configured instant-transition bound.
    pub fn tick(&mut self, now: SimTime) -> Result<(), MachineError> {
        if let Some(current) = self.current {
            self.update_node(current, now);
        }

        let mut committed: u32 = 0;
        while let Some((next, at)) = self.pending {
            if now < at {
                break;
            }
            committed += 1;
            if committed > self.config.max_instant_transitions {
                self.pending = None;
                self.outgoing
                    .push(StateSyncEvent::Pending { transition: None });
                let limit = self.config.max_instant_transitions;
                error!(
                    "State machine exceeded {} instant transitions in one tick (last target '{}'); dropping the pending transition",
                    limit,
                    self.graph.name(next),
                );
                return Err(MachineError::InstantTransitionOverflow { limit });
            }

            // re-arm to the entered state's own default-next, else clear
            self.pending = self
                .graph
                .default_next(next)
                .map(|(default_next, delay)| (default_next, now + delay));
            self.outgoing.push(StateSyncEvent::Pending {
                transition: self.pending,
            });

            self.commit(next, now);
        }
        Ok(())
    }

    /// Leaves the old branch child-to-root, enters the new branch
    /// root-to-leaf, then publishes the new current state.
    fn commit(&mut self, next: StateId, now: SimTime) {
        let old_chain = self.active_path();
        let new_chain = self.graph.chain(next);

        for id in old_chain.iter().rev() {
            if !new_chain.contains(id) {
                self.leave_node(*id, now);
            }
        }
        for id in &new_chain {
            if !old_chain.contains(id) {
                self.enter_node(*id, now);
            }
        }

        self.current = Some(next);
        self.outgoing
            .push(StateSyncEvent::Current { state: Some(next) });
    }

    fn enter_node(&mut self, id: StateId, now: SimTime) {
        self.active[id.index()] = true;
        if let Some(hook) = self.hooks.get_mut(&id).and_then(|hooks| hooks.enter.as_mut()) {
            hook(id, now);
        }
        self.dispatcher
            .dispatch(Scope::Node(id), &EnterState { state: id, time: now });
        self.drain_commands(now);
    }

    fn update_node(&mut self, id: StateId, now: SimTime) {
        if let Some(hook) = self.hooks.get_mut(&id).and_then(|hooks| hooks.update.as_mut()) {
            hook(id, now);
        }
        self.dispatcher
            .dispatch(Scope::Node(id), &UpdateState { state: id, time: now });
        self.drain_commands(now);
    }

    fn leave_node(&mut self, id: StateId, now: SimTime) {
        if let Some(hook) = self.hooks.get_mut(&id).and_then(|hooks| hooks.leave.as_mut()) {
            hook(id, now);
        }
        self.dispatcher
            .dispatch(Scope::Node(id), &LeaveState { state: id, time: now });
        self.drain_commands(now);
        self.active[id.index()] = false;
    }

    /// Applies transition commands listeners queued during a dispatch pass.
    fn drain_commands(&mut self, now: SimTime) {
        for command in self.dispatcher.take_commands() {
            match command {
                TransitionCommand::Transition { next, delay } => self.transition(next, delay, now),
                TransitionCommand::Clear => self.clear_transition(),
            }
        }
    }

    fn assert_known(&self, id: StateId) {
        assert!(
            self.graph.contains(id),
            "state {:?} is not a state in this machine's graph",
            id
        );
    }
}
