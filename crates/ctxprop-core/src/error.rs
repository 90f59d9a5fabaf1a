//! Error types for context propagation.

use thiserror::Error;

/// Result type for context propagation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for context propagation operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A wrapper (function/callable/future) was constructed with a missing
    /// snapshot, delegate, or supplier. Raised eagerly at construction time;
    /// never swallowed.
    #[error("context configuration error: {message}")]
    Configuration {
        /// What was missing or invalid.
        message: String,
    },

    /// A single manager failed to activate a captured value during
    /// reactivation.
    #[error("manager '{manager}' failed to activate its captured value")]
    Activation {
        /// Name of the manager that rejected the value.
        manager: String,
        /// The underlying cause reported by the manager.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Snapshot reactivation failed partway through; any handles already
    /// created before the failing manager have been closed in reverse order.
    #[error("snapshot reactivation failed at manager '{manager}'")]
    Reactivation {
        /// Name of the manager whose activation triggered the rollback.
        manager: String,
        /// The underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Build a [`Error::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
