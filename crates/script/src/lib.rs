//! # docshell script
//!
//! The scripting surface of the shell, on top of [Rhai](https://rhai.rs).
//!
//! ```text
//! use("shop");
//! db.users.insertOne(#{ name: "ada" });
//! let found = db.users.find(#{ name: "ada" });
//! console.log(found.len(), db.getName());
//! assert.eq(found.len(), 1, "expected one user");
//! ```
//!
//! - [`ShellRuntime`] - one script instance: engine, scope and session
//! - [`PrintAdapter`] / [`PrintSink`] - where `console.*`, `print` and `debug` go
//! - [`convert`] - script values to documents and back
//! - [`assert`] - the assertion helpers behind `assert.eq` / `assert.throws`

#![warn(missing_docs)]

pub mod assert;
pub mod convert;
mod print;
mod runtime;

#[cfg(test)]
mod tests;

pub use print::{BufferSink, OutputStream, PrintAdapter, PrintSink, StdioSink};
pub use runtime::{Assert, Console, ShellRuntime};

// Everything a host needs to build a context
pub use docshell_executor as executor;
