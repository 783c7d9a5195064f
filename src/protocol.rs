//! Host protocol messages.
//!
//! Sources talk to the host ETL framework over stdout, one JSON document
//! per line. Each message carries a `type` tag and one payload field named
//! after the tag, mirroring the message framing used by Singer-style taps.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

/// One normalized output row.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub stream: String,
    pub data: Value,
    pub emitted_at: i64,
}

impl Record {
    pub fn new(stream: &str, data: Value) -> Self {
        Self {
            stream: stream.to_string(),
            data,
            emitted_at: Utc::now().timestamp_millis(),
        }
    }
}

/// Result of a connection check.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConnectionStatus {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Succeeded,
    Failed,
}

/// Stream catalog produced by `discover`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogStream>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogStream {
    pub name: String,
    pub json_schema: Value,
    pub supported_sync_modes: Vec<SyncMode>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    FullRefresh,
    Incremental,
}

/// Connector specification produced by `spec`: documentation pointer plus
/// the JSON Schema a configuration file must satisfy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectorSpecification {
    pub documentation_url: String,
    pub connection_specification: Value,
}

/// Catalog subset passed to `read` to select which streams to sync.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    pub streams: Vec<ConfiguredStream>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfiguredStream {
    pub stream: StreamDescriptor,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub name: String,
}

/// Envelope for every line emitted on stdout.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "RECORD")]
    Record { record: Record },
    #[serde(rename = "STATE")]
    State { state: StateMessage },
    #[serde(rename = "CONNECTION_STATUS")]
    ConnectionStatus {
        #[serde(rename = "connectionStatus")]
        connection_status: ConnectionStatus,
    },
    #[serde(rename = "CATALOG")]
    Catalog { catalog: Catalog },
    #[serde(rename = "SPEC")]
    Spec { spec: ConnectorSpecification },
}

/// State payload: per-stream state objects keyed by stream name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateMessage {
    pub data: Value,
}

impl Message {
    /// Writes the message as one JSON line.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let line = serde_json::to_string(self).context("Failed to serialize message")?;
        writeln!(out, "{}", line).context("Failed to write message")?;
        Ok(())
    }

    /// Writes the message to stdout.
    pub fn emit(&self) -> Result<()> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.write_to(&mut lock)
    }
}
