//! Session wrapper around one script instance.
//!
//! The REPL, pipe mode and `docshell script.rhai` all drive a single
//! [`ShellRuntime`], so `use`, variables and functions carry from one line
//! (or file) to the next.

use std::path::Path;
use std::sync::Arc;

use docshell_executor::{
    Backend, CancelToken, OperationBridge, Result, ShellConfig, ShellContext,
};
use docshell_script::convert::to_json_lossy;
use docshell_script::{PrintSink, ShellRuntime};
use rhai::Dynamic;
use serde_json::Value;

/// Wraps the script runtime and exposes what the CLI needs.
pub struct SessionState {
    runtime: ShellRuntime,
}

impl SessionState {
    /// Start a session against `backend`, printing script output to `sink`.
    pub fn new(
        config: &ShellConfig,
        backend: Arc<dyn Backend>,
        sink: Arc<dyn PrintSink>,
    ) -> Result<Self> {
        let bridge = OperationBridge::new(backend, config.timeout());
        let context = ShellContext::new(config, bridge);
        Ok(Self {
            runtime: ShellRuntime::new(context, sink)?,
        })
    }

    /// Evaluate one snippet. `None` when it evaluates to unit.
    pub fn eval(&mut self, source: &str) -> Result<Option<Value>> {
        self.runtime.eval(source).map(result_value)
    }

    /// Run a script file in this session.
    pub fn run_file(&mut self, path: &Path) -> Result<Option<Value>> {
        self.runtime.eval_file(path).map(result_value)
    }

    /// `use <db>`
    pub fn use_database(&mut self, name: &str) -> String {
        self.runtime.select_database(name)
    }

    /// Collection names in the current database.
    pub fn show_collections(&self) -> Result<Value> {
        let ctx = self.runtime.context();
        ctx.db().list_collections(ctx.bridge())
    }

    /// Database names on the server.
    pub fn show_databases(&self) -> Result<Value> {
        let ctx = self.runtime.context();
        ctx.db().list_databases(ctx.bridge())
    }

    /// Cancels the database call the session is blocked on.
    pub fn cancel_handle(&self) -> CancelToken {
        self.runtime.cancel_handle()
    }

    /// Current database name.
    pub fn database(&self) -> String {
        self.runtime.context().state().database().to_string()
    }

    /// Prompt string: `"<db>> "`
    pub fn prompt(&self) -> String {
        self.runtime.context().prompt()
    }
}

fn result_value(value: Dynamic) -> Option<Value> {
    if value.is_unit() {
        None
    } else {
        Some(to_json_lossy(&value))
    }
}
