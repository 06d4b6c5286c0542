//! Backend error types
//!
//! A backend either returns a result payload or one of these. The executor
//! maps every variant to `Error::Dispatch` (or `Error::Cancelled`) at the
//! bridge, so the script sees a single failure shape regardless of backend.

use docshell_core::CoreError;
use thiserror::Error;

/// Result type alias for backend calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Failures raised while executing a request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The backend understood the request and refused it
    #[error("{reason}")]
    Rejected {
        /// Backend-provided message
        reason: String,
    },

    /// The request uses something this backend does not implement
    #[error("unsupported: {feature}")]
    Unsupported {
        /// Operator, stage or op name
        feature: String,
    },

    /// The call was cancelled before it completed
    #[error("operation cancelled")]
    Cancelled,

    /// The server could not be reached
    #[error("connection failed: {reason}")]
    Connection {
        /// Driver message
        reason: String,
    },

    /// The request violated the wire contract
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl BackendError {
    /// Shorthand for [`BackendError::Rejected`]
    pub fn rejected(reason: impl Into<String>) -> Self {
        BackendError::Rejected {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`BackendError::Unsupported`]
    pub fn unsupported(feature: impl Into<String>) -> Self {
        BackendError::Unsupported {
            feature: feature.into(),
        }
    }
}
