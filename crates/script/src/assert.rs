//! `assert.eq` and `assert.throws`.
//!
//! Assertions never raise. A failed assertion writes a line through the
//! [`PrintAdapter`] and the script keeps running.

use rhai::{Dynamic, EvalAltResult};
use serde_json::Value;

use crate::convert;
use crate::print::PrintAdapter;

/// Diagnostic logged when `assert.throws` gets a function that returns normally.
pub const EXPECTED_THROW: &str = "Expected function to throw";

/// `assert.eq(a, b, message)`: `true` when equal, otherwise logs `message` and returns `false`.
pub fn assert_eq_outcome(printer: &PrintAdapter, a: &Dynamic, b: &Dynamic, message: Dynamic) -> bool {
    let equal = match (convert::to_document(a), convert::to_document(b)) {
        (Ok(a), Ok(b)) => loose_eq(&a, &b),
        _ => false,
    };
    if !equal {
        printer.log(&[message]);
    }
    equal
}

/// `assert.throws(fn)` given the outcome of calling `fn`.
///
/// Returns `true` if the call raised. Otherwise logs [`EXPECTED_THROW`] and
/// returns unit rather than `false`; scripts written against the JavaScript
/// shell depend on that.
pub fn assert_throws_outcome(
    printer: &PrintAdapter,
    outcome: Result<Dynamic, Box<EvalAltResult>>,
) -> Dynamic {
    match outcome {
        Err(_) => Dynamic::TRUE,
        Ok(_) => {
            printer.log(&[Dynamic::from(EXPECTED_THROW)]);
            Dynamic::UNIT
        }
    }
}

/// Loose equality over documents.
///
/// Maps and arrays compare structurally. Numbers compare by value across
/// int/float. Between a number, a numeric string and a boolean the operands
/// are compared as numbers (`"2" == 2`, `true == 1`). `null` equals only `null`.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(_), Value::Number(_)) => as_number(a) == as_number(b),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map_or(false, |w| loose_eq(v, w)))
        }
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        // remaining pairs mix number, string and bool
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                s.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::BufferSink;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_loose_eq_numbers_across_int_and_float() {
        assert!(loose_eq(&json!(2), &json!(2.0)));
        assert!(!loose_eq(&json!(2), &json!(3)));
    }

    #[test]
    fn test_loose_eq_coerces_scalars() {
        assert!(loose_eq(&json!("2"), &json!(2)));
        assert!(loose_eq(&json!(true), &json!(1)));
        assert!(loose_eq(&json!(""), &json!(0)));
        assert!(loose_eq(&json!("1"), &json!(true)));
        assert!(!loose_eq(&json!("abc"), &json!(0)));
        assert!(!loose_eq(&json!("a"), &json!("b")));
    }

    #[test]
    fn test_loose_eq_null_only_equals_null() {
        assert!(loose_eq(&json!(null), &json!(null)));
        assert!(!loose_eq(&json!(null), &json!(0)));
        assert!(!loose_eq(&json!(false), &json!(null)));
    }

    #[test]
    fn test_loose_eq_structural() {
        assert!(loose_eq(&json!({"a": [1, "2"]}), &json!({"a": ["1", 2]})));
        assert!(!loose_eq(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!loose_eq(&json!([1, 2]), &json!([1])));
        assert!(!loose_eq(&json!([1]), &json!(1)));
    }

    #[test]
    fn test_eq_outcome_logs_only_on_failure() {
        let sink = BufferSink::new();
        let printer = PrintAdapter::new(Arc::new(sink.clone()));

        assert!(assert_eq_outcome(&printer, &Dynamic::from(2_i64), &Dynamic::from(2_i64), "x".into()));
        assert!(sink.lines().is_empty());

        assert!(!assert_eq_outcome(&printer, &Dynamic::from(2_i64), &Dynamic::from(3_i64), "x".into()));
        assert_eq!(sink.stdout(), vec![r#""x""#.to_string()]);
    }

    #[test]
    fn test_throws_outcome_is_true_or_unit() {
        let sink = BufferSink::new();
        let printer = PrintAdapter::new(Arc::new(sink.clone()));

        let raised = assert_throws_outcome(&printer, Err("boom".into()));
        assert_eq!(raised.as_bool(), Ok(true));
        assert!(sink.lines().is_empty());

        let returned = assert_throws_outcome(&printer, Ok(Dynamic::UNIT));
        assert!(returned.is_unit());
        assert_eq!(sink.stdout(), vec![format!("\"{}\"", EXPECTED_THROW)]);
    }
}
