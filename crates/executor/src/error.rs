//! Error types for the shell runtime.
//!
//! Every failure a script or host can observe is an [`Error`]. Errors are:
//! - **Structured**: each variant has typed fields
//! - **Serializable**: can be converted to/from JSON for hosts that forward them
//! - **Op-tagged**: bridge failures name the operation that failed

use serde::{Deserialize, Serialize};

use docshell_core::CoreError;
use docshell_engine::{BackendError, ConfigError};

/// Shell runtime errors.
///
/// # Categories
///
/// | Category | Variants | Description |
/// |----------|----------|-------------|
/// | Bridge | `Dispatch`, `Timeout`, `Cancelled`, `BridgeClosed` | A backend call did not produce a result |
/// | Input | `InvalidArgument` | An argument cannot become a document |
/// | Script | `Script` | Compile or runtime failure in user code |
/// | System | `Config`, `Io` | Host-side setup failures |
///
/// # Example
///
/// ```ignore
/// match users.find(session.bridge(), filter) {
///     Ok(docs) => { /* render */ }
///     Err(Error::Dispatch { op, reason }) => eprintln!("{} failed: {}", op, reason),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Bridge ====================
    /// The backend rejected or failed the request
    #[error("{op} failed: {reason}")]
    Dispatch { op: String, reason: String },

    /// The call did not complete within the configured timeout
    #[error("{op} timed out after {millis} ms")]
    Timeout { op: String, millis: u64 },

    /// The call was cancelled by the host
    #[error("{op} cancelled")]
    Cancelled { op: String },

    /// The bridge worker could not be reached
    #[error("operation bridge is closed")]
    BridgeClosed,

    // ==================== Input ====================
    /// An argument could not be turned into a request
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // ==================== Script ====================
    /// Script compile or runtime failure
    #[error("{reason}")]
    Script { reason: String },

    // ==================== System ====================
    /// Configuration could not be loaded
    #[error("config error: {reason}")]
    Config { reason: String },

    /// I/O error
    #[error("I/O error: {reason}")]
    Io { reason: String },
}

impl Error {
    /// Map a backend failure for `op` onto the runtime error shape
    pub fn from_backend(op: impl Into<String>, err: BackendError) -> Self {
        match err {
            BackendError::Cancelled => Error::Cancelled { op: op.into() },
            BackendError::Core(core) => core.into(),
            other => Error::Dispatch {
                op: op.into(),
                reason: other.to_string(),
            },
        }
    }

    /// Whether this error came from the bridge rather than from the script or host
    pub fn is_bridge_error(&self) -> bool {
        matches!(
            self,
            Error::Dispatch { .. }
                | Error::Timeout { .. }
                | Error::Cancelled { .. }
                | Error::BridgeClosed
        )
    }
}

impl From<CoreError> for Error {
    fn from(e: CoreError) -> Self {
        Error::InvalidArgument {
            reason: e.to_string(),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config {
            reason: e.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidArgument {
            reason: e.to_string(),
        }
    }
}
