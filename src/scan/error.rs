//! Scan session error types.

/// Errors surfaced to callers of the scan session core.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The request was rejected before any session was created.
    #[error("{0}")]
    InvalidInput(String),

    /// No session is registered under the given identifier.
    #[error("Scan session not found: {0}")]
    NotFound(String),

    /// The scanner process could not be launched.
    #[error("Failed to spawn scanner {program}: {source}")]
    SpawnFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Error returned when a scan is requested without a target.
    #[must_use]
    pub fn target_required() -> Self {
        Self::InvalidInput("target is required".to_string())
    }

    /// Returns `true` if this error was caused by the caller's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }
}
