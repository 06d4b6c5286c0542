//! Update operators: `$set`, `$unset`, `$inc`, `$push`.

use serde_json::{Map, Number, Value};

use super::path::{get_path, remove_path, set_path, values_equal};
use crate::error::{BackendError, BackendResult};

/// Check an update spec up front so a bad spec touches no document.
pub(crate) fn validate(update: &Map<String, Value>) -> BackendResult<()> {
    if update.is_empty() {
        return Err(BackendError::rejected("update document must not be empty"));
    }
    for (op, fields) in update {
        if !op.starts_with('$') {
            return Err(BackendError::rejected(
                "update document requires atomic operators",
            ));
        }
        if !matches!(op.as_str(), "$set" | "$unset" | "$inc" | "$push") {
            return Err(BackendError::unsupported(format!("update operator {}", op)));
        }
        let fields = fields.as_object().ok_or_else(|| {
            BackendError::rejected(format!("{} argument must be an object", op))
        })?;
        if fields.contains_key("_id") && op != "$unset" {
            return Err(BackendError::rejected("performing an update on _id is not allowed"));
        }
        if op == "$inc" && fields.values().any(|v| !v.is_number()) {
            return Err(BackendError::rejected("cannot increment with non-numeric argument"));
        }
    }
    Ok(())
}

/// Apply a validated update spec. Returns whether the document changed.
pub(crate) fn apply(doc: &mut Map<String, Value>, update: &Map<String, Value>) -> BackendResult<bool> {
    let before = doc.clone();
    for (op, fields) in update {
        let Some(fields) = fields.as_object() else {
            continue;
        };
        for (path, operand) in fields {
            match op.as_str() {
                "$set" => set_path(doc, path, operand.clone()).map_err(BackendError::rejected)?,
                "$unset" => {
                    remove_path(doc, path);
                }
                "$inc" => {
                    let current = get_path(doc, path).cloned();
                    let next = match current {
                        None => operand.clone(),
                        Some(Value::Number(n)) => add(&n, operand),
                        Some(other) => {
                            return Err(BackendError::rejected(format!(
                                "cannot apply $inc to a value of non-numeric type: {}",
                                other
                            )))
                        }
                    };
                    set_path(doc, path, next).map_err(BackendError::rejected)?;
                }
                "$push" => {
                    let next = match get_path(doc, path).cloned() {
                        None => Value::Array(vec![operand.clone()]),
                        Some(Value::Array(mut items)) => {
                            items.push(operand.clone());
                            Value::Array(items)
                        }
                        Some(_) => {
                            return Err(BackendError::rejected(format!(
                                "the field '{}' must be an array",
                                path
                            )))
                        }
                    };
                    set_path(doc, path, next).map_err(BackendError::rejected)?;
                }
                other => return Err(BackendError::unsupported(format!("update operator {}", other))),
            }
        }
    }
    Ok(!values_equal(&Value::Object(before), &Value::Object(doc.clone())))
}

fn add(current: &Number, delta: &Value) -> Value {
    match (current.as_i64(), delta.as_i64()) {
        (Some(a), Some(b)) => match a.checked_add(b) {
            Some(sum) => Value::from(sum),
            None => Value::from(a as f64 + b as f64),
        },
        _ => {
            let a = current.as_f64().unwrap_or(0.0);
            let b = delta.as_f64().unwrap_or(0.0);
            Value::from(a + b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(doc: Value, update: Value) -> (Value, bool) {
        let mut doc = doc.as_object().unwrap().clone();
        let update = update.as_object().unwrap();
        validate(update).unwrap();
        let changed = apply(&mut doc, update).unwrap();
        (Value::Object(doc), changed)
    }

    #[test]
    fn test_set_and_unset() {
        let (doc, changed) = run(
            json!({"a": 1, "b": 2}),
            json!({"$set": {"a": 5, "c.d": true}, "$unset": {"b": ""}}),
        );
        assert!(changed);
        assert_eq!(doc, json!({"a": 5, "c": {"d": true}}));
    }

    #[test]
    fn test_set_same_value_is_not_a_modification() {
        let (_, changed) = run(json!({"a": 1}), json!({"$set": {"a": 1}}));
        assert!(!changed);
    }

    #[test]
    fn test_inc_int_float_and_missing() {
        let (doc, _) = run(
            json!({"n": 1, "f": 1.5}),
            json!({"$inc": {"n": 2, "f": 1, "m": 3}}),
        );
        assert_eq!(doc, json!({"n": 3, "f": 2.5, "m": 3}));
    }

    #[test]
    fn test_push() {
        let (doc, _) = run(json!({"tags": ["a"]}), json!({"$push": {"tags": "b", "new": 1}}));
        assert_eq!(doc, json!({"tags": ["a", "b"], "new": [1]}));
    }

    #[test]
    fn test_replacement_document_rejected() {
        let err = validate(json!({"name": "x"}).as_object().unwrap()).unwrap_err();
        assert!(matches!(err, BackendError::Rejected { .. }));
    }

    #[test]
    fn test_unknown_operator_unsupported() {
        let err = validate(json!({"$rename": {"a": "b"}}).as_object().unwrap()).unwrap_err();
        assert!(matches!(err, BackendError::Unsupported { .. }));
    }

    #[test]
    fn test_id_is_immutable() {
        assert!(validate(json!({"$set": {"_id": 1}}).as_object().unwrap()).is_err());
    }
}
