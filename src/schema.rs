//! Declarative field schemas.
//!
//! A stream's schema is an ordered list of field paths (dotted, e.g.
//! `customer.id`) with the JSON type each field must carry in output
//! records. Schemas drive both query construction (every field is
//! selected) and response-value coercion.

use serde_json::{json, Map, Value};

/// JSON output type for a schema field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl JsonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

/// Type declaration for a single schema field.
///
/// All fields are nullable in output. `protobuf_message` marks fields whose
/// underlying API type is a free-form message; their values are forced to
/// string (or array of string) during normalization no matter what shape
/// the API returns.
#[derive(Clone, Debug)]
pub struct FieldSchema {
    pub types: Vec<JsonType>,
    pub protobuf_message: bool,
}

impl FieldSchema {
    /// A nullable scalar field.
    pub fn new(ty: JsonType) -> Self {
        Self {
            types: vec![ty],
            protobuf_message: false,
        }
    }

    /// A nullable array field with string items.
    pub fn array() -> Self {
        Self {
            types: vec![JsonType::Array],
            protobuf_message: false,
        }
    }

    /// Marks the field as a free-form protobuf message type.
    pub fn message(mut self) -> Self {
        self.protobuf_message = true;
        self
    }

    pub fn is_array(&self) -> bool {
        self.types.contains(&JsonType::Array)
    }
}

/// Ordered field-path → type declaration for one stream.
#[derive(Clone, Debug, Default)]
pub struct ReportSchema {
    properties: Vec<(String, FieldSchema)>,
}

impl ReportSchema {
    pub fn new(properties: Vec<(&str, FieldSchema)>) -> Self {
        Self {
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
        }
    }

    /// Field paths in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, field: &str) -> Option<&FieldSchema> {
        self.properties
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, schema)| schema)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.properties
            .iter()
            .map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Renders the schema as a JSON Schema document for the stream catalog.
    pub fn json_schema(&self) -> Value {
        let mut props = Map::new();
        for (name, field) in &self.properties {
            let mut types: Vec<Value> = vec![Value::String("null".into())];
            types.extend(field.types.iter().map(|t| Value::String(t.as_str().into())));
            let mut decl = Map::new();
            decl.insert("type".into(), Value::Array(types));
            if field.is_array() {
                decl.insert("items".into(), json!({ "type": "string" }));
            }
            props.insert(name.clone(), Value::Object(decl));
        }
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": Value::Object(props),
        })
    }
}
