//! Per-instance session state.
//!
//! A [`ShellContext`] is created when a script instance starts and dropped
//! when it ends. It owns the [`SessionState`] (which database is selected and
//! where the server is) and the [`OperationBridge`] used for every call the
//! instance makes. Two instances never share a context.
//!
//! # Usage
//!
//! ```ignore
//! use docshell_executor::{OperationBridge, ShellConfig, ShellContext};
//!
//! let config = ShellConfig::default();
//! let mut ctx = ShellContext::new(&config, bridge);
//!
//! assert_eq!(ctx.db().name(), "test");
//! ctx.select_database("shop");
//! let users = ctx.db().collection("users");
//! users.insert_one(ctx.bridge(), json!({ "name": "ada" }))?;
//! ```

use tracing::info;

use docshell_engine::{CancelToken, ShellConfig};

use crate::bridge::OperationBridge;
use crate::handles::DatabaseHandle;
use docshell_core::DatabaseDescriptor;

/// The selected database plus the server it lives on.
///
/// Only [`SessionState::select_database`] changes it, and only the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    database: String,
    address: String,
    port: u16,
}

impl SessionState {
    /// Start in `database` on `address:port`
    pub fn new(database: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            database: database.into(),
            address: address.into(),
            port,
        }
    }

    /// Initial state from configuration (`database` defaults to `"test"`)
    pub fn from_config(config: &ShellConfig) -> Self {
        Self::new(&config.database, &config.host, config.port)
    }

    /// Select `name` as the current database and return it.
    ///
    /// The name is not validated; address and port are unchanged.
    pub fn select_database(&mut self, name: &str) -> String {
        self.database = name.to_string();
        self.database.clone()
    }

    /// Selected database name
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Server address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// A fresh handle on the selected database
    pub fn database_handle(&self) -> DatabaseHandle {
        DatabaseHandle::new(DatabaseDescriptor::new(
            &self.database,
            &self.address,
            self.port,
        ))
    }
}

/// Everything one script instance owns.
#[derive(Debug)]
pub struct ShellContext {
    state: SessionState,
    bridge: OperationBridge,
}

impl ShellContext {
    /// Create a context in the configured initial database
    pub fn new(config: &ShellConfig, bridge: OperationBridge) -> Self {
        Self::with_state(SessionState::from_config(config), bridge)
    }

    /// Create a context from explicit state
    pub fn with_state(state: SessionState, bridge: OperationBridge) -> Self {
        Self { state, bridge }
    }

    /// Current session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Switch databases. Returns the new name.
    pub fn select_database(&mut self, name: &str) -> String {
        let selected = self.state.select_database(name);
        info!(database = %selected, "switched database");
        selected
    }

    /// `db`: a handle rebuilt from the current state
    pub fn db(&self) -> DatabaseHandle {
        self.state.database_handle()
    }

    /// The bridge every call goes through
    pub fn bridge(&self) -> &OperationBridge {
        &self.bridge
    }

    /// Token that cancels whatever call this instance is blocked on
    pub fn cancel_token(&self) -> CancelToken {
        self.bridge.cancel_token()
    }

    /// REPL prompt: `"<db>> "`
    pub fn prompt(&self) -> String {
        format!("{}> ", self.state.database())
    }
}
