use std::any::{type_name, TypeId};

/// Marker contract for dispatchable notification values.
///
/// A payload is an immutable value describing one occurrence of something
/// notable; its *type* is the dispatch key that selects which listeners run.
pub trait Payload: 'static {}

/// Process-unique key identifying a payload type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PayloadKind {
    type_id: TypeId,
    name: &'static str,
}

impl PayloadKind {
    pub fn of<P: Payload>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            name: type_name::<P>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
