//! Aggregation pipeline: `$match $sort $skip $limit $project $count`.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::matcher;
use super::path::{compare_values, get_path, remove_path, set_path};
use crate::error::{BackendError, BackendResult};

type Doc = Map<String, Value>;

/// Run `pipeline` over `docs` in stage order.
pub(crate) fn run(mut docs: Vec<Doc>, pipeline: &[Value]) -> BackendResult<Vec<Doc>> {
    for stage in pipeline {
        let (name, spec) = single_key(stage)?;
        docs = match name {
            "$match" => {
                let filter = object(spec, name)?;
                let mut kept = Vec::with_capacity(docs.len());
                for doc in docs {
                    if matcher::matches(&doc, filter)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            "$sort" => sort(docs, object(spec, name)?)?,
            "$skip" => docs.into_iter().skip(count(spec, name)?).collect(),
            "$limit" => {
                let n = count(spec, name)?;
                if n == 0 {
                    return Err(BackendError::rejected("the limit must be positive"));
                }
                docs.into_iter().take(n).collect()
            }
            "$project" => project(docs, object(spec, name)?)?,
            "$count" => {
                let field = spec
                    .as_str()
                    .filter(|s| !s.is_empty() && !s.starts_with('$'))
                    .ok_or_else(|| BackendError::rejected("$count needs a non-empty field name"))?;
                if docs.is_empty() {
                    Vec::new()
                } else {
                    let mut out = Map::new();
                    out.insert(field.to_string(), Value::from(docs.len() as u64));
                    vec![out]
                }
            }
            other => return Err(BackendError::unsupported(format!("pipeline stage {}", other))),
        };
    }
    Ok(docs)
}

fn single_key(stage: &Value) -> BackendResult<(&str, &Value)> {
    match stage.as_object() {
        Some(map) if map.len() == 1 => map
            .iter()
            .next()
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| BackendError::rejected("empty pipeline stage")),
        _ => Err(BackendError::rejected(
            "a pipeline stage must be an object with exactly one field",
        )),
    }
}

fn object<'a>(spec: &'a Value, stage: &str) -> BackendResult<&'a Doc> {
    spec.as_object()
        .ok_or_else(|| BackendError::rejected(format!("{} specification must be an object", stage)))
}

fn count(spec: &Value, stage: &str) -> BackendResult<usize> {
    spec.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| BackendError::rejected(format!("{} needs a non-negative integer", stage)))
}

fn sort(mut docs: Vec<Doc>, spec: &Doc) -> BackendResult<Vec<Doc>> {
    if spec.is_empty() {
        return Err(BackendError::rejected("$sort needs at least one key"));
    }
    let mut keys = Vec::with_capacity(spec.len());
    for (field, dir) in spec {
        let descending = match dir.as_i64() {
            Some(1) => false,
            Some(-1) => true,
            _ => return Err(BackendError::rejected("$sort direction must be 1 or -1")),
        };
        keys.push((field.as_str(), descending));
    }
    docs.sort_by(|a, b| {
        for (field, descending) in &keys {
            let ord = compare_values(get_path(a, field), get_path(b, field));
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(docs)
}

fn project(docs: Vec<Doc>, spec: &Doc) -> BackendResult<Vec<Doc>> {
    let flag = |v: &Value| match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    };
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    let mut keep_id = true;
    for (field, value) in spec {
        let on = flag(value).ok_or_else(|| {
            BackendError::unsupported(format!("$project expression for '{}'", field))
        })?;
        if field == "_id" {
            keep_id = on;
        } else if on {
            include.push(field.as_str());
        } else {
            exclude.push(field.as_str());
        }
    }
    if !include.is_empty() && !exclude.is_empty() {
        return Err(BackendError::rejected(
            "cannot mix inclusion and exclusion in $project",
        ));
    }

    docs.into_iter()
        .map(|doc| {
            if !include.is_empty() {
                let mut out = Map::new();
                if keep_id {
                    if let Some(id) = doc.get("_id") {
                        out.insert("_id".to_string(), id.clone());
                    }
                }
                for field in &include {
                    if let Some(v) = get_path(&doc, field) {
                        set_path(&mut out, field, v.clone()).map_err(BackendError::rejected)?;
                    }
                }
                Ok(out)
            } else {
                let mut out = doc;
                for field in &exclude {
                    remove_path(&mut out, field);
                }
                if !keep_id {
                    out.remove("_id");
                }
                Ok(out)
            }
        })
        .collect()
}
