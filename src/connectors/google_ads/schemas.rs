//! Static report schemas.
//!
//! Field names are dotted attribute paths on the API's row object and
//! select directly into the query the stream issues.

use crate::schema::{FieldSchema, JsonType, ReportSchema};

/// Schema for the internal account-enumeration stream
/// (`customer` resource).
pub fn service_accounts() -> ReportSchema {
    ReportSchema::new(vec![
        ("customer.id", FieldSchema::new(JsonType::Integer)),
        ("customer.manager", FieldSchema::new(JsonType::Boolean)),
        ("customer.time_zone", FieldSchema::new(JsonType::String)),
        ("customer.currency_code", FieldSchema::new(JsonType::String)),
    ])
}

/// Schema for the geo constants stream (`geo_target_constant` resource).
pub fn geo_constants() -> ReportSchema {
    ReportSchema::new(vec![
        (
            "geo_target_constant.canonical_name",
            FieldSchema::new(JsonType::String),
        ),
        (
            "geo_target_constant.country_code",
            FieldSchema::new(JsonType::String),
        ),
        ("geo_target_constant.id", FieldSchema::new(JsonType::Integer)),
        (
            "geo_target_constant.name",
            FieldSchema::new(JsonType::String),
        ),
        (
            "geo_target_constant.parent_geo_target",
            FieldSchema::new(JsonType::String),
        ),
        (
            "geo_target_constant.resource_name",
            FieldSchema::new(JsonType::String),
        ),
        (
            "geo_target_constant.status",
            FieldSchema::new(JsonType::String),
        ),
        (
            "geo_target_constant.target_type",
            FieldSchema::new(JsonType::String),
        ),
    ])
}
