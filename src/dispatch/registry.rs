use std::{
    any::Any,
    cell::RefCell,
    collections::HashMap,
    marker::PhantomData,
    rc::Rc,
};

use crate::{
    dispatch::{
        dispatcher::Dispatcher,
        error::ListenerError,
        listener::{Listener, ListenerKind, OrderingConstraints},
        payload::{Payload, PayloadKind},
    },
    state::graph::StateId,
    types::RegistrationIndex,
};

/// Discovery scope for registration and dispatch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Scope {
    /// Everything: listeners registered here observe every dispatch, and a
    /// dispatch here reaches every registered listener for the payload.
    Global,
    /// The given state node and its descendants.
    Node(StateId),
}

/// Type-erased handle to a listener instance; concrete per payload type so a
/// dispatch site can recover the typed object with a plain downcast.
pub(crate) struct ListenerHandle<P: Payload> {
    pub(crate) object: Rc<RefCell<dyn Listener<P>>>,
}

pub(crate) struct ListenerEntry {
    /// `None` for anonymous callbacks, which cannot participate in
    /// constraint resolution.
    pub(crate) kind: Option<ListenerKind>,
    pub(crate) scope: Scope,
    pub(crate) index: RegistrationIndex,
    pub(crate) handle: Rc<dyn Any>,
}

/// Explicit listener registry: components register typed instances (or bare
/// callbacks) per payload type, with ordering metadata supplied up front.
///
/// Ordering constraints are per listener *type*; the first registration of a
/// kind for a payload fixes that kind's constraints, later registrations of
/// the same kind contribute instances only.
pub struct ListenerRegistry {
    entries: HashMap<PayloadKind, Vec<ListenerEntry>>,
    declared: HashMap<PayloadKind, Vec<(ListenerKind, OrderingConstraints)>>,
    next_index: RegistrationIndex,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            declared: HashMap::new(),
            next_index: 0,
        }
    }

    pub(crate) fn register<P: Payload, L: Listener<P>>(
        &mut self,
        scope: Scope,
        listener: Rc<RefCell<L>>,
        constraints: OrderingConstraints,
    ) {
        let payload_kind = PayloadKind::of::<P>();
        let kind = ListenerKind::of::<L>();
        let object: Rc<RefCell<dyn Listener<P>>> = listener;
        self.push_entry(payload_kind, Some(kind), scope, object);

        let declared = self.declared.entry(payload_kind).or_default();
        if !declared.iter().any(|(existing, _)| *existing == kind) {
            declared.push((kind, constraints));
        }
    }

    pub(crate) fn register_fn<P: Payload, F>(&mut self, scope: Scope, callback: F)
    where
        F: FnMut(&P, &Dispatcher) -> Result<(), ListenerError> + 'static,
    {
        let object: Rc<RefCell<dyn Listener<P>>> = Rc::new(RefCell::new(FnListener {
            callback,
            marker: PhantomData,
        }));
        self.push_entry(PayloadKind::of::<P>(), None, scope, object);
    }

    fn push_entry<P: Payload>(
        &mut self,
        payload_kind: PayloadKind,
        kind: Option<ListenerKind>,
        scope: Scope,
        object: Rc<RefCell<dyn Listener<P>>>,
    ) {
        let index = self.next_index;
        self.next_index += 1;
        self.entries
            .entry(payload_kind)
            .or_default()
            .push(ListenerEntry {
                kind,
                scope,
                index,
                handle: Rc::new(ListenerHandle { object }),
            });
    }

    pub(crate) fn entries_for(&self, payload_kind: PayloadKind) -> &[ListenerEntry] {
        self.entries
            .get(&payload_kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Named listener kinds for a payload, in first-registration order.
    pub(crate) fn declared_for(
        &self,
        payload_kind: PayloadKind,
    ) -> &[(ListenerKind, OrderingConstraints)] {
        self.declared
            .get(&payload_kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter given to `register_fn`: a bare closure acting as a listener with
/// no nameable kind.
struct FnListener<P: Payload, F> {
    callback: F,
    marker: PhantomData<fn(&P)>,
}

impl<P: Payload, F> Listener<P> for FnListener<P, F>
where
    F: FnMut(&P, &Dispatcher) -> Result<(), ListenerError> + 'static,
{
    fn receive(&mut self, payload: &P, cx: &Dispatcher) -> Result<(), ListenerError> {
        (self.callback)(payload, cx)
    }
}
