//! Result → human/json/raw string formatting.
//!
//! Three modes:
//! - **Human** (default): pretty-printed JSON, e.g. `{\n  "insertedId": 1\n}`
//! - **JSON** (`--json`): one value per line, `serde_json::to_string`
//! - **Raw** (`--raw`): strings unquoted, everything else compact JSON

use docshell_executor::Error;
use serde_json::Value;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Raw,
}

/// Format the value of an evaluated expression.
pub fn format_value(value: &Value, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => value.to_string(),
        OutputMode::Raw => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        OutputMode::Human => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    }
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::json!({ "error": err.to_string() }).to_string(),
        OutputMode::Raw => err.to_string(),
        OutputMode::Human => format!("(error) {}", err),
    }
}

/// Format a list of names (`show collections`, `show databases`).
///
/// Human and raw modes print one name per line; JSON mode prints the array.
pub fn format_names(names: &Value, mode: OutputMode) -> String {
    match (mode, names) {
        (OutputMode::Json, _) => names.to_string(),
        (_, Value::Array(items)) if items.is_empty() => match mode {
            OutputMode::Human => "(empty)".to_string(),
            _ => String::new(),
        },
        (_, Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        (_, other) => format_value(other, mode),
    }
}
