//! Mapping of JSON documents onto field observations.
//!
//! Nested objects are flattened into dotted keys (`{"mem": {"heap": 1}}`
//! becomes `mem.heap`). Every element of an array is an observation of the
//! array's key, so `{"lat": [1, 2]}` yields two values for `lat`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{FetchResult, SourceError};
use crate::field::Field;
use crate::storage::Point;

/// Flattens a JSON object into dotted keys and their leaf values.
pub fn flatten(doc: &Value) -> Result<HashMap<String, Vec<&Value>>, SourceError> {
    let Value::Object(map) = doc else {
        return Err(SourceError::Malformed(format!(
            "expected a JSON object, got {}",
            type_name(doc)
        )));
    };

    let mut out = HashMap::new();
    visit_object("", map, &mut out);
    Ok(out)
}

fn visit_object<'a>(
    prefix: &str,
    map: &'a Map<String, Value>,
    out: &mut HashMap<String, Vec<&'a Value>>,
) {
    for (k, v) in map {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{}.{}", prefix, k)
        };
        visit_value(key, v, out);
    }
}

fn visit_value<'a>(key: String, value: &'a Value, out: &mut HashMap<String, Vec<&'a Value>>) {
    match value {
        Value::Object(map) => visit_object(&key, map, out),
        Value::Array(items) => {
            // An empty array still names the key, with no observations.
            out.entry(key.clone()).or_default();
            for item in items {
                visit_value(key.clone(), item, out);
            }
        }
        leaf => out.entry(key).or_default().push(leaf),
    }
}

/// Interprets a JSON leaf as a number. Numeric strings are accepted.
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Builds a fetch result for `fields` from a decoded document.
///
/// Fields are looked up by name and keyed by ID. A field the document does
/// not mention is left out of the result; a present but non-numeric value is
/// an error.
pub fn to_fetch_result(
    doc: &Value,
    fields: &[Field],
    timestamp: DateTime<Utc>,
) -> Result<FetchResult, SourceError> {
    let flat = flatten(doc)?;
    let mut result = FetchResult::new();

    for field in fields {
        let Some(values) = flat.get(&field.name) else {
            continue;
        };
        result.declare(&field.id);
        for value in values {
            let Some(v) = numeric(value) else {
                return Err(SourceError::Malformed(format!(
                    "{}: expected a number, got {}",
                    field.name, value
                )));
            };
            result.push(&field.id, Point::new(timestamp, v));
        }
    }

    Ok(result)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
