//! Dotted field paths and value ordering.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Look up `a.b.c` in a document. Numeric segments index into arrays.
pub(crate) fn get_path<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set `a.b.c`, creating intermediate objects. Fails if a non-object is in the way.
pub(crate) fn set_path(doc: &mut Map<String, Value>, path: &str, value: Value) -> Result<(), String> {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match child {
                Value::Object(inner) => set_path(inner, rest, value),
                other => Err(format!(
                    "cannot create field '{}' in element {{{}: {}}}",
                    rest, head, other
                )),
            }
        }
    }
}

/// Remove `a.b.c`. Returns whether anything was removed.
pub(crate) fn remove_path(doc: &mut Map<String, Value>, path: &str) -> bool {
    match path.split_once('.') {
        None => doc.remove(path).is_some(),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Value::Object(inner)) => remove_path(inner, rest),
            _ => false,
        },
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Object(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Bool(_)) => 6,
    }
}

/// Total order across JSON values: null, numbers, strings, objects, arrays, booleans.
///
/// A missing field sorts with null.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(Some(l), Some(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        _ => Ordering::Equal,
    }
}

/// Equality used by filters: numbers compare by value (`1 == 1.0`).
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => {
            compare_values(Some(a), Some(b)) == Ordering::Equal
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).map_or(false, |w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_get_path_nested_and_indexed() {
        let doc = obj(json!({"a": {"b": [10, {"c": 3}]}}));
        assert_eq!(get_path(&doc, "a.b.0"), Some(&json!(10)));
        assert_eq!(get_path(&doc, "a.b.1.c"), Some(&json!(3)));
        assert_eq!(get_path(&doc, "a.x"), None);
    }

    #[test]
    fn test_set_path_creates_intermediates() {
        let mut doc = obj(json!({}));
        set_path(&mut doc, "a.b.c", json!(1)).unwrap();
        assert_eq!(Value::Object(doc), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_set_path_refuses_to_overwrite_scalar_parent() {
        let mut doc = obj(json!({"a": 5}));
        assert!(set_path(&mut doc, "a.b", json!(1)).is_err());
    }

    #[test]
    fn test_remove_path() {
        let mut doc = obj(json!({"a": {"b": 1, "c": 2}}));
        assert!(remove_path(&mut doc, "a.b"));
        assert!(!remove_path(&mut doc, "a.z"));
        assert_eq!(Value::Object(doc), json!({"a": {"c": 2}}));
    }

    #[test]
    fn test_ordering_across_types() {
        assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10.5))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(99)), Some(&json!("1"))), Ordering::Less);
    }

    #[test]
    fn test_numeric_equality_ignores_representation() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!({"a": [1]}), &json!({"a": [1.0]})));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }
}
