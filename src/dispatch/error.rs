use thiserror::Error;

/// Failure produced by a single listener; isolated per listener and never
/// propagated to the dispatch caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Listener failure: {message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One isolated listener failure collected during a dispatch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFault {
    /// Type name of the failing listener, or `"<anonymous>"` for callbacks.
    pub listener: String,
    pub error: ListenerError,
}

/// Outcome of one dispatch pass.
///
/// Listener failures are aggregated here (and logged once) instead of being
/// returned as `Err`: a failing listener never prevents the remaining
/// listeners from running, and never fails the dispatch caller.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Number of listeners actually invoked.
    pub invoked: usize,
    pub faults: Vec<ListenerFault>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}
