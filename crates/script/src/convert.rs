//! Conversion between script values and documents.
//!
//! | Script value | Document |
//! |--------------|----------|
//! | `()` | `null` |
//! | bool / int / float | bool / number (non-finite floats become `null`) |
//! | string / char | string |
//! | array / object map | array / object |
//! | `Database` / `Collection` handle | its descriptor |
//!
//! Anything else (function pointers, ranges, timestamps) has no document form.

use rhai::{Array, Dynamic, Map};
use serde_json::Value;

use docshell_executor::{CollectionHandle, DatabaseHandle, Document, Error, Result};

/// Convert a script value into a document for the bridge.
pub fn to_document(value: &Dynamic) -> Result<Document> {
    dynamic_to_json(value).map_err(|type_name| Error::InvalidArgument {
        reason: format!("cannot convert a value of type '{}' to a document", type_name),
    })
}

/// Like [`to_document`], rendering unconvertible values as `null`.
pub fn to_json_lossy(value: &Dynamic) -> Document {
    dynamic_to_json(value).unwrap_or(Value::Null)
}

/// Convert a document returned by the bridge into a script value.
///
/// Integers beyond the script's `i64` range come back as floats.
pub fn from_document(doc: &Document) -> Result<Dynamic> {
    rhai::serde::to_dynamic(doc).map_err(|e| Error::Script {
        reason: format!("cannot convert document to a script value: {}", e),
    })
}

/// Returns the offending type name on failure.
fn dynamic_to_json(value: &Dynamic) -> std::result::Result<Value, &'static str> {
    if let Some(items) = value.read_lock::<Array>() {
        return items
            .iter()
            .map(dynamic_to_json)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array);
    }
    if let Some(map) = value.read_lock::<Map>() {
        let mut out = serde_json::Map::new();
        for (key, item) in map.iter() {
            out.insert(key.to_string(), dynamic_to_json(item)?);
        }
        return Ok(Value::Object(out));
    }
    if let Some(db) = value.read_lock::<DatabaseHandle>() {
        return serde_json::to_value(&*db).map_err(|_| value.type_name());
    }
    if let Some(coll) = value.read_lock::<CollectionHandle>() {
        return serde_json::to_value(&*coll).map_err(|_| value.type_name());
    }
    // scalars; a NaN float deserializes to null
    rhai::serde::from_dynamic::<Value>(&value.flatten_clone()).map_err(|_| value.type_name())
}
