//! Core types for docshell
//!
//! This crate defines the wire contract between the shell runtime and a backend:
//! - DatabaseDescriptor / CollectionDescriptor: what an operation targets
//! - OpName: the fixed set of backend operations
//! - OpRequest: one serialized call crossing the operation bridge
//! - Document helpers: identifier values (`{ "$oid": ... }`) and empty filters
//! - CoreError: contract violations (unknown op, wrong target, wrong arity)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod op;
pub mod types;

pub use document::{as_object_id, empty_filter, is_object_id, object_id, Document, OID_KEY};
pub use error::{CoreError, CoreResult};
pub use op::{OpName, OpRequest};
pub use types::{CollectionDescriptor, DatabaseDescriptor, Target};
