//! Backends and configuration for docshell
//!
//! This crate sits behind the operation bridge:
//! - Backend: the trait every store implements, plus the CancelToken it honours
//! - MemoryBackend: in-process store used by tests and `--memory` mode
//! - MongoBackend: MongoDB driver backend (feature `mongo`)
//! - ShellConfig: `docshell.toml` loading and defaults
//!
//! Nothing here knows about scripts. A backend receives one validated
//! [`docshell_core::OpRequest`] at a time and returns a JSON payload.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
#[cfg(feature = "mongo")]
pub mod mongo;

pub use backend::{Backend, CancelToken};
pub use config::{ConfigError, ShellConfig, CONFIG_FILE_NAME};
pub use error::{BackendError, BackendResult};
pub use memory::MemoryBackend;
#[cfg(feature = "mongo")]
pub use mongo::MongoBackend;
