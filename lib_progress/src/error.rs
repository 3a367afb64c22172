use thiserror::Error;

/// Errors raised by the progress log core.
///
/// Apart from `Canceled`, every variant is a broken contract rather than a
/// runtime condition worth retrying: the core performs no I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The cancellation token fired while waiting. Callers treat this as a
    /// normal way to stop, not as a failure.
    #[error("Operation canceled by shutdown")]
    Canceled,

    #[error("No tokio runtime is available to run the drainer")]
    NoRuntime,

    #[error("The sink dropped a delivery without running it")]
    SinkUnavailable,

    #[error("The drainer task panicked: {0}")]
    DrainerPanicked(String),
}

/// Errors raised while reading a [`crate::ProgressConfig`] from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),
}
