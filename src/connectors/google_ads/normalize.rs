//! Response row normalization.
//!
//! Each schema field is a dotted path into the nested row object returned
//! by the API. Lookup is explicit: a segment that is absent is retried
//! with a trailing underscore (the API's generated row types suffix
//! reserved words, e.g. `ad.type` is exposed as `ad.type_`), and a path
//! that resolves neither way is an error.
//!
//! The coercion cascade exists because the API exposes hundreds of
//! heterogeneous nested message types that cannot all be modeled: values
//! outside the flat JSON scalar set are stringified, and fields declared
//! as free-form protobuf messages are forced to string (or array of
//! string) regardless of shape.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

use crate::schema::{FieldSchema, JsonType, ReportSchema};

/// Walks `path` through nested objects in `row`, trying the
/// underscore-suffixed variant of any segment that is absent.
pub fn resolve_field<'a>(row: &'a Value, path: &str) -> Result<&'a Value> {
    let mut current = row;
    for segment in path.split('.') {
        let object = current.as_object().ok_or_else(|| {
            anyhow!(
                "Field '{}': segment '{}' reached a non-object value",
                path,
                segment
            )
        })?;
        current = match object.get(segment) {
            Some(value) => value,
            None => object.get(&format!("{}_", segment)).ok_or_else(|| {
                anyhow!(
                    "Field '{}' not present on response row (tried '{}' and '{}_')",
                    path,
                    segment,
                    segment
                )
            })?,
        };
    }
    Ok(current)
}

/// Applies the type coercion cascade to one resolved value.
pub fn coerce_value(value: &Value, schema: &FieldSchema) -> Value {
    // Free-form protobuf message fields are forced to string, or array of
    // string when the declared type is an array.
    if schema.protobuf_message {
        return if schema.is_array() {
            match value {
                Value::Array(items) => {
                    Value::Array(items.iter().map(|v| Value::String(value_to_string(v))).collect())
                }
                other => Value::Array(vec![Value::String(value_to_string(other))]),
            }
        } else {
            Value::String(value_to_string(value))
        };
    }

    match value {
        // Repeated fields become arrays of strings.
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| Value::String(value_to_string(v))).collect())
        }
        // A nested message where the schema wants a plain string is
        // stringified rather than individually modeled.
        Value::Object(_) if schema.types == [JsonType::String] => {
            Value::String(value_to_string(value))
        }
        other => other.clone(),
    }
}

/// Stringifies a value: strings pass through, everything else renders as
/// compact JSON.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Normalizes one response row into a flat field → value record.
pub fn parse_row(schema: &ReportSchema, row: &Value) -> Result<Map<String, Value>> {
    let mut record = Map::new();
    for (field, field_schema) in schema.iter() {
        let value = resolve_field(row, field)?;
        record.insert(field.to_string(), coerce_value(value, field_schema));
    }
    Ok(record)
}
