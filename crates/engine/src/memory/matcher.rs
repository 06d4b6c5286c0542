//! Query filter evaluation.
//!
//! Supported: field equality (with dotted paths and array membership),
//! `$eq $ne $gt $gte $lt $lte $in $nin $exists` on fields, and
//! `$and $or $nor` at the top level.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use docshell_core::is_object_id;

use super::path::{compare_values, get_path, values_equal};
use crate::error::{BackendError, BackendResult};

/// Whether `doc` satisfies `filter`.
///
/// # Errors
///
/// Unknown operators and malformed operands are rejected rather than ignored.
pub(crate) fn matches(doc: &Map<String, Value>, filter: &Map<String, Value>) -> BackendResult<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => clauses(condition, key)?
                .iter()
                .try_fold(true, |acc, c| Ok::<_, BackendError>(acc && matches(doc, c)?))?,
            "$or" => {
                let mut any = false;
                for clause in clauses(condition, key)? {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for clause in clauses(condition, key)? {
                    if matches(doc, clause)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            op if op.starts_with('$') => {
                return Err(BackendError::unsupported(format!("query operator {}", op)))
            }
            field => field_matches(get_path(doc, field), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(condition: &'a Value, op: &str) -> BackendResult<Vec<&'a Map<String, Value>>> {
    let items = condition
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| BackendError::rejected(format!("{} argument must be a non-empty array", op)))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| BackendError::rejected(format!("{} entries must be objects", op)))
        })
        .collect()
}

fn is_operator_doc(condition: &Value) -> bool {
    match condition {
        Value::Object(map) => {
            !map.is_empty() && !is_object_id(condition) && map.keys().all(|k| k.starts_with('$'))
        }
        _ => false,
    }
}

fn field_matches(value: Option<&Value>, condition: &Value) -> BackendResult<bool> {
    if !is_operator_doc(condition) {
        return Ok(equals(value, condition));
    }
    let ops = condition.as_object().into_iter().flatten();
    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compares(value, operand, |o| o == Ordering::Greater),
            "$gte" => compares(value, operand, |o| o != Ordering::Less),
            "$lt" => compares(value, operand, |o| o == Ordering::Less),
            "$lte" => compares(value, operand, |o| o != Ordering::Greater),
            "$in" => in_list(value, operand, "$in")?,
            "$nin" => !in_list(value, operand, "$nin")?,
            "$exists" => {
                let wanted = match operand {
                    Value::Bool(b) => *b,
                    Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
                    _ => true,
                };
                value.is_some() == wanted
            }
            other => return Err(BackendError::unsupported(format!("query operator {}", other))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality with array membership: `{tags: "a"}` matches `tags: ["a", "b"]`.
/// `{x: null}` matches a missing field.
fn equals(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        None => expected.is_null(),
        Some(actual) => {
            if values_equal(actual, expected) {
                return true;
            }
            match actual {
                Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
                _ => false,
            }
        }
    }
}

/// Range comparisons only match values of the same type class.
fn compares(value: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let same_class = |v: &Value| {
        matches!(
            (v, operand),
            (Value::Number(_), Value::Number(_))
                | (Value::String(_), Value::String(_))
                | (Value::Bool(_), Value::Bool(_))
        )
    };
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| same_class(item) && accept(compare_values(Some(item), Some(operand)))),
        Some(v) => same_class(v) && accept(compare_values(Some(v), Some(operand))),
        None => false,
    }
}

fn in_list(value: Option<&Value>, operand: &Value, op: &str) -> BackendResult<bool> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| BackendError::rejected(format!("{} needs an array", op)))?;
    Ok(candidates.iter().any(|candidate| equals(value, candidate)))
}
