//! docshell - scriptable document-store shell runtime
//!
//! docshell gives a script a mongo-shell-like vocabulary (`db`, `use(name)`,
//! collection methods, `ObjectId`, `assert`) and forwards every collection
//! call to a storage backend through a synchronous operation bridge.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docshell::{MemoryBackend, OperationBridge, ShellConfig, ShellContext};
//!
//! let bridge = OperationBridge::new(Arc::new(MemoryBackend::new()), ShellConfig::default().timeout());
//! let mut session = ShellContext::new(&ShellConfig::default(), bridge);
//!
//! session.select_database("shop");
//! let users = session.db().collection("users");
//! users.insert_one(session.bridge(), serde_json::json!({ "name": "a" }))?;
//! ```
//!
//! The scripting surface itself lives in the `docshell-script` crate; the
//! interactive shell is the `docshell` binary in `docshell-cli`.

// Re-export the public API from docshell-executor
pub use docshell_executor::*;

/// The Rhai scripting surface (`db`, `use`, `console`, `assert`, `ObjectId`)
pub use docshell_script as script;
