use thiserror::Error;

/// Errors that can occur while ticking the authoritative state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// The bounded instant-transition loop did not settle
    #[error("Exceeded {limit} instant transitions within a single tick. This indicates a zero-delay transition cycle in the default-next-state configuration; auto-transition processing was halted for this tick")]
    InstantTransitionOverflow { limit: u32 },
}
