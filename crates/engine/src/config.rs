//! Shell configuration via `docshell.toml`
//!
//! Every field has a default, so an empty (or missing) file is a valid
//! configuration. Command-line flags override whatever the file says.

use docshell_core::DatabaseDescriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "docshell.toml";

/// Errors loading or writing a config file
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config file '{path}': {reason}")]
    Read {
        /// File path
        path: String,
        /// OS error
        reason: String,
    },

    /// File is not valid TOML or has wrongly typed fields
    #[error("failed to parse config file '{path}': {reason}")]
    Parse {
        /// File path
        path: String,
        /// Parser message
        reason: String,
    },

    /// File parsed but a value is out of range
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong
        reason: String,
    },

    /// File could not be written
    #[error("failed to write config file '{path}': {reason}")]
    Write {
        /// File path
        path: String,
        /// OS error
        reason: String,
    },
}

/// Shell configuration loaded from `docshell.toml`.
///
/// # Example
///
/// ```toml
/// host = "127.0.0.1"
/// port = 27017
/// database = "test"
/// timeout_ms = 30000
/// history = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Server host name or address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database selected when a script instance starts
    #[serde(default = "default_database")]
    pub database: String,
    /// Longest a single bridge call may block, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Keep REPL history between sessions
    #[serde(default = "default_history")]
    pub history: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    27017
}

fn default_database() -> String {
    "test".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_history() -> bool {
    true
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            timeout_ms: default_timeout_ms(),
            history: default_history(),
        }
    }
}

impl ShellConfig {
    /// Bridge call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Descriptor of the database a new script instance starts in
    pub fn initial_database(&self) -> DatabaseDescriptor {
        DatabaseDescriptor::new(&self.database, &self.host, self.port)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty host or database, port 0, or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let reason = if self.host.trim().is_empty() {
            "host must not be empty"
        } else if self.port == 0 {
            "port must be between 1 and 65535"
        } else if self.database.is_empty() {
            "database must not be empty"
        } else if self.timeout_ms == 0 {
            "timeout_ms must be greater than zero"
        } else {
            return Ok(());
        };
        Err(ConfigError::Invalid {
            reason: reason.to_string(),
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docshell configuration
#
# Server the shell talks to
host = "127.0.0.1"
port = 27017

# Database selected at startup (switch with `use <name>`)
database = "test"

# Longest a single database call may block before the shell gives up
timeout_ms = 30000

# Keep REPL history in ~/.docshell_history
history = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: ShellConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| ConfigError::Write {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ShellConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 27017);
        assert_eq!(config.database, "test");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.history);
    }

    #[test]
    fn default_toml_parses_to_default() {
        let config: ShellConfig = toml::from_str(ShellConfig::default_toml()).unwrap();
        assert_eq!(config, ShellConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: ShellConfig = toml::from_str("database = \"shop\"\nport = 27018").unwrap();
        assert_eq!(config.database, "shop");
        assert_eq!(config.port, 27018);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.initial_database().uri(), "mongodb://127.0.0.1:27018/shop");
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = ShellConfig {
            timeout_ms: 0,
            ..ShellConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn validate_rejects_port_zero() {
        let config = ShellConfig {
            port: 0,
            ..ShellConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        let err = ShellConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = ShellConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "").unwrap();

        let config = ShellConfig::from_file(&path).unwrap();
        assert_eq!(config, ShellConfig::default());
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "database = \"admin\"\n").unwrap();

        ShellConfig::write_default_if_missing(&path).unwrap();

        let config = ShellConfig::from_file(&path).unwrap();
        assert_eq!(config.database, "admin");
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = ShellConfig {
            host: "db.internal".to_string(),
            port: 27100,
            database: "inventory".to_string(),
            timeout_ms: 1500,
            history: false,
        };

        config.write_to_file(&path).unwrap();
        assert_eq!(ShellConfig::from_file(&path).unwrap(), config);
    }
}
