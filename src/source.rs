//! Source and stream interfaces.
//!
//! A source is one connector: it validates a configuration, enumerates the
//! streams it can extract, and answers connection checks. A stream is one
//! logical table, read slice by slice (one slice per account).

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::protocol::{ConnectorSpecification, Record, SyncMode};

/// One unit of work for a stream: a single account to query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSlice {
    pub customer_id: String,
}

impl StreamSlice {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
        }
    }
}

/// A logical table exposed by a source.
#[async_trait]
pub trait SourceStream: Send + Sync {
    /// Stream name as it appears in the catalog and on records.
    fn name(&self) -> &str;

    /// JSON Schema describing output records.
    fn json_schema(&self) -> Value;

    fn sync_modes(&self) -> Vec<SyncMode> {
        vec![SyncMode::FullRefresh]
    }

    /// Slices to read, one per account.
    fn slices(&self) -> Vec<StreamSlice>;

    /// Reads and normalizes every record for one slice.
    async fn read_records(&self, slice: &StreamSlice) -> Result<Vec<Record>>;

    /// Current incremental state, if this stream keeps any.
    fn state(&self) -> Option<Value> {
        None
    }

    /// Restores incremental state persisted by the host framework.
    /// Merge semantics: per-customer entries accumulate, they are not
    /// replaced wholesale.
    fn set_state(&mut self, _value: Value) {}
}

/// A connector entry point.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    /// Connector specification: documentation URL plus the configuration
    /// JSON Schema.
    fn spec(&self) -> ConnectorSpecification;

    /// Validates that the configuration can reach the upstream API.
    ///
    /// Returns `(true, None)` on success, or `(false, Some(message))` when
    /// the vendor API rejects the configuration with a structured error.
    /// Any other failure propagates as `Err`.
    async fn check_connection(&self, config: &Value) -> Result<(bool, Option<String>)>;

    /// Builds the concrete streams to run for this configuration.
    async fn streams(&self, config: &Value) -> Result<Vec<Box<dyn SourceStream>>>;
}
