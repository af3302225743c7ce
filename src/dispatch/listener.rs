use std::any::{type_name, TypeId};

use crate::dispatch::{dispatcher::Dispatcher, error::ListenerError, payload::Payload};

/// Single-method contract for reacting to one payload type.
///
/// The `cx` handle is what makes dispatch reentrant: a listener may dispatch
/// further payloads, or queue a state transition command, without ever holding
/// a mutable reference to the dispatcher or the machine. Dispatching a payload
/// the receiving *instance* is itself subscribed to is reported as a fault on
/// the inner dispatch rather than corrupting the outer iteration.
pub trait Listener<P: Payload>: 'static {
    fn receive(&mut self, payload: &P, cx: &Dispatcher) -> Result<(), ListenerError>;
}

/// Identifies a listener *type*. Ordering constraints relate kinds, never
/// instances: every instance of the same type shares one rank.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ListenerKind {
    type_id: TypeId,
    name: &'static str,
}

impl ListenerKind {
    pub fn of<L: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<L>(),
            name: type_name::<L>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Declarative ordering metadata supplied at registration time.
///
/// The registration-time equivalent of ordering attributes on a handler
/// method: multiple declarations may be combined, and `before`/`after`
/// references to listener types that never register for the payload are
/// ignored during constraint expansion.
#[derive(Clone, Debug, Default)]
pub struct OrderingConstraints {
    pub(crate) run_first: bool,
    pub(crate) run_last: bool,
    pub(crate) run_before: Vec<ListenerKind>,
    pub(crate) run_after: Vec<ListenerKind>,
}

impl OrderingConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run before every listener not itself marked first.
    pub fn first(mut self) -> Self {
        self.run_first = true;
        self
    }

    /// Run after every listener not itself marked last.
    pub fn last(mut self) -> Self {
        self.run_last = true;
        self
    }

    /// Run before listeners of type `L`.
    pub fn before<L: 'static>(mut self) -> Self {
        self.run_before.push(ListenerKind::of::<L>());
        self
    }

    /// Run after listeners of type `L`.
    pub fn after<L: 'static>(mut self) -> Self {
        self.run_after.push(ListenerKind::of::<L>());
        self
    }
}
