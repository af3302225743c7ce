/// Position of a listener type within a payload's computed total order.
pub type Rank = u32;

/// Monotonic counter assigned at registration time; the deterministic
/// tie-break when two listeners share a rank.
pub(crate) type RegistrationIndex = u32;
