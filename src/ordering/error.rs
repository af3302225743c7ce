use thiserror::Error;

/// Errors that can occur while solving ordering constraints
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// Two constraints require both orderings of the same item pair
    #[error("Contradictory ordering constraints: item {earlier} is required to run both before and after item {later}. Remove one of the conflicting first/last/before/after declarations")]
    Contradiction { earlier: usize, later: usize },

    /// Extraction finished without placing every item
    #[error("Ordering extraction placed only {placed} of {expected} items. This indicates an internal solver invariant violation")]
    Incomplete { placed: usize, expected: usize },
}
