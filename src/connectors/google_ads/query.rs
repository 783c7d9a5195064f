//! GAQL query construction.
//!
//! Report names are mapped to API resource names through a fixed table;
//! the query selects every field the stream's schema declares. Custom
//! queries are user-authored text, touched only to extract the column
//! list and (at check time) to inject a synthetic date filter.

use anyhow::{bail, Context, Result};

use crate::schema::ReportSchema;

/// Report name → API resource name.
pub const REPORT_MAPPING: &[(&str, &str)] = &[
    ("service_accounts", "customer"),
    ("geo_constants", "geo_target_constant"),
];

/// Resolves a report name to its source resource. Unknown names are fatal.
pub fn resource_for_report(report_name: &str) -> Result<&'static str> {
    REPORT_MAPPING
        .iter()
        .find(|(name, _)| *name == report_name)
        .map(|(_, resource)| *resource)
        .with_context(|| format!("No resource mapping for report '{}'", report_name))
}

/// Builds the SELECT query for one report from its schema.
pub fn build_query(schema: &ReportSchema, report_name: &str) -> Result<String> {
    let resource = resource_for_report(report_name)?;
    let fields: Vec<&str> = schema.fields().collect();
    Ok(format!("SELECT {} FROM {}", fields.join(", "), resource))
}

/// Extracts the SELECT column list from a user-authored query.
pub fn fields_from_query(query: &str) -> Result<Vec<String>> {
    let select = find_keyword(query, "SELECT")
        .with_context(|| format!("Custom query has no SELECT clause: {}", query))?;
    let from = find_keyword(query, "FROM")
        .with_context(|| format!("Custom query has no FROM clause: {}", query))?;
    if from <= select {
        bail!("Custom query has FROM before SELECT: {}", query);
    }
    let columns = &query[select + "SELECT".len()..from];
    let fields: Vec<String> = columns
        .split(',')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    if fields.is_empty() {
        bail!("Custom query selects no fields: {}", query);
    }
    Ok(fields)
}

/// Injects a `segments.date BETWEEN` predicate into a user-authored query.
///
/// Appended with AND when the query already has a WHERE clause, inserted
/// as a new WHERE clause ahead of any ORDER BY / LIMIT / PARAMETERS
/// otherwise.
pub fn insert_date_filter(query: &str, start: &str, end: &str) -> String {
    let condition = format!("segments.date BETWEEN '{}' AND '{}'", start, end);

    let tail_start = ["ORDER BY", "LIMIT", "PARAMETERS"]
        .iter()
        .filter_map(|kw| find_keyword(query, kw))
        .min();
    let (head, tail) = match tail_start {
        Some(i) => (&query[..i], &query[i..]),
        None => (query, ""),
    };

    let joined = if find_keyword(head, "WHERE").is_some() {
        format!("{} AND {} {}", head.trim_end(), condition, tail)
    } else {
        format!("{} WHERE {} {}", head.trim_end(), condition, tail)
    };
    joined.trim_end().to_string()
}

/// Case-insensitive word-boundary search for a keyword; returns the byte
/// offset of the first match.
fn find_keyword(query: &str, keyword: &str) -> Option<usize> {
    let haystack = query.as_bytes();
    let needle = keyword.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    let boundary = |c: u8| !(c.is_ascii_alphanumeric() || c == b'_' || c == b'.');
    for start in 0..=haystack.len() - needle.len() {
        let end = start + needle.len();
        if haystack[start..end].eq_ignore_ascii_case(needle)
            && (start == 0 || boundary(haystack[start - 1]))
            && (end == haystack.len() || boundary(haystack[end]))
        {
            return Some(start);
        }
    }
    None
}
