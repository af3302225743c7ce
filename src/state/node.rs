use crate::{clock::SimTime, dispatch::payload::Payload, state::graph::StateId};

/// Dispatched (scoped to the entered node) when a state becomes active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnterState {
    pub state: StateId,
    pub time: SimTime,
}

/// Dispatched (scoped to the current node) once per authoritative tick while
/// a state is the current state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateState {
    pub state: StateId,
    pub time: SimTime,
}

/// Dispatched (scoped to the leaving node) just before a state is marked
/// inactive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeaveState {
    pub state: StateId,
    pub time: SimTime,
}

impl Payload for EnterState {}
impl Payload for UpdateState {}
impl Payload for LeaveState {}

/// Direct per-node lifecycle callback, invoked before the corresponding
/// payload is dispatched. Authority-only, like all lifecycle side effects.
pub type StateHook = Box<dyn FnMut(StateId, SimTime)>;

#[derive(Default)]
pub(crate) struct NodeHooks {
    pub(crate) enter: Option<StateHook>,
    pub(crate) update: Option<StateHook>,
    pub(crate) leave: Option<StateHook>,
}
