//! Error types for engine operations.

use thiserror::Error;

/// Errors produced while running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An input record could not be decoded into a request.
    #[error("malformed request record #{index}")]
    Decode {
        /// Zero-based index of the offending record.
        index: usize,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A response could not be serialized.
    #[error("failed to encode response")]
    Encode(#[source] serde_json::Error),
    /// Reading input or writing output failed.
    #[error("i/o error")]
    Io(#[from] std::io::Error),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread panicked.
    #[error("worker `{0}` panicked")]
    WorkerPanicked(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
