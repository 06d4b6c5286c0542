//! Documents and identifier values.
//!
//! A document is plain JSON. The only convention the runtime itself knows about
//! is the identifier wrapper `{ "$oid": <raw> }`, which lets backends and front
//! ends recognise identifier-shaped values inside documents.

use serde_json::{Map, Value};

/// A document, filter, update spec or pipeline stage.
pub type Document = Value;

/// Key of the identifier wrapper
pub const OID_KEY: &str = "$oid";

/// Wrap a raw value as an identifier: `{ "$oid": value }`.
///
/// No validation: any raw value is accepted and carried unchanged.
pub fn object_id(value: impl Into<Value>) -> Document {
    let mut map = Map::with_capacity(1);
    map.insert(OID_KEY.to_string(), value.into());
    Value::Object(map)
}

/// Whether `doc` is exactly an identifier wrapper
pub fn is_object_id(doc: &Document) -> bool {
    as_object_id(doc).is_some()
}

/// The raw value inside an identifier wrapper
pub fn as_object_id(doc: &Document) -> Option<&Value> {
    match doc {
        Value::Object(map) if map.len() == 1 => map.get(OID_KEY),
        _ => None,
    }
}

/// `{}`: the filter matching every document
pub fn empty_filter() -> Document {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_id_exact_shape() {
        assert_eq!(object_id("abc"), json!({ "$oid": "abc" }));
        assert_eq!(object_id(42), json!({ "$oid": 42 }));
    }

    #[test]
    fn test_as_object_id() {
        assert_eq!(as_object_id(&json!({ "$oid": "abc" })), Some(&json!("abc")));
        assert!(as_object_id(&json!({ "$oid": "abc", "x": 1 })).is_none());
        assert!(as_object_id(&json!("abc")).is_none());
        assert!(is_object_id(&object_id(json!(null))));
    }

    #[test]
    fn test_empty_filter() {
        assert_eq!(empty_filter(), json!({}));
    }
}
