//! Error types for the docshell wire contract
//!
//! These errors describe requests that cannot cross the operation bridge at all:
//! an op name nobody knows, a database-level op aimed at a collection, or the
//! wrong number of arguments. They say nothing about document shapes; those are
//! the backend's business.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

use crate::op::OpName;

/// Result type alias for contract checks
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Contract violations detected before a request reaches a backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Op name is not part of the bridge contract
    #[error("unknown operation: {name}")]
    UnknownOp {
        /// Name as received
        name: String,
    },

    /// Op was aimed at the wrong kind of target
    #[error("operation {op} expects a {expected} target")]
    TargetMismatch {
        /// Offending op
        op: OpName,
        /// "collection" or "database"
        expected: &'static str,
    },

    /// Wrong number of arguments for the op
    #[error("operation {op} expects {expected} argument(s), got {actual}")]
    Arity {
        /// Offending op
        op: OpName,
        /// Arguments the op takes
        expected: usize,
        /// Arguments supplied
        actual: usize,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_op() {
        let err = CoreError::UnknownOp {
            name: "op_explode".to_string(),
        };
        assert_eq!(err.to_string(), "unknown operation: op_explode");
    }

    #[test]
    fn test_error_display_arity() {
        let err = CoreError::Arity {
            op: OpName::UpdateOne,
            expected: 2,
            actual: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("update_one"));
        assert!(msg.contains("expects 2"));
        assert!(msg.contains("got 1"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
