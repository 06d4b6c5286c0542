//! # docshell executor
//!
//! The host-facing API of the shell runtime. It provides:
//! - [`ShellContext`] / [`SessionState`] - which database a script instance has selected
//! - [`DatabaseHandle`] / [`CollectionHandle`] - the values behind `db` and `db.<name>`
//! - [`OperationBridge`] - synchronous, timeout-bounded calls into a backend
//! - [`Error`] - every failure a script or host can observe
//!
//! ## Quick Start
//!
//! ```text
//! use docshell_executor::{MemoryBackend, OperationBridge, ShellConfig, ShellContext};
//!
//! let config = ShellConfig::default();
//! let bridge = OperationBridge::new(Arc::new(MemoryBackend::new()), config.timeout());
//! let mut ctx = ShellContext::new(&config, bridge);
//!
//! ctx.select_database("shop");
//! let users = ctx.db().collection("users");
//! users.insert_one(ctx.bridge(), json!({ "name": "ada" }))?;
//! let found = users.find(ctx.bridge(), json!({}))?;
//! ```
//!
//! ## Operations
//!
//! | Handle method | Op | Result |
//! |---------------|----|--------|
//! | `find` | `find` | array of documents |
//! | `insert_one` / `insert_many` | `insert_one` / `insert_many` | `{ insertedId }` / `{ insertedIds }` |
//! | `update_one` / `update_many` | `update_one` / `update_many` | `{ matchedCount, modifiedCount, upsertedId }` |
//! | `delete_one` / `delete_many` | `delete_one` / `delete_many` | `{ deletedCount }` |
//! | `aggregate` | `aggregate` | array of documents |
//! | `drop` | `drop` | `true` |
//! | `save` | `save` | insert or update result |
//! | `list_collections` / `list_databases` | same | array of names |

#![warn(missing_docs)]

mod bridge;
mod error;
mod handles;
mod session;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API - Everything hosts need is re-exported here
// =============================================================================

pub use bridge::{BridgeStats, OperationBridge};
pub use error::Error;
pub use handles::{CollectionHandle, DatabaseHandle, DbMember};
pub use session::{SessionState, ShellContext};

// Wire types, so hosts don't need docshell-core directly
pub use docshell_core::{
    as_object_id, empty_filter, is_object_id, object_id, CollectionDescriptor, DatabaseDescriptor,
    Document, OpName, OpRequest, Target, OID_KEY,
};

// Backends and configuration, so hosts don't need docshell-engine directly
pub use docshell_engine::{
    Backend, BackendError, BackendResult, CancelToken, ConfigError, MemoryBackend, ShellConfig,
    CONFIG_FILE_NAME,
};
#[cfg(feature = "mongo")]
pub use docshell_engine::MongoBackend;

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, Error>;
