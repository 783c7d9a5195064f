//! Ads Connectors - data-extraction sources for an ETL platform.
//!
//! Each source connector authenticates against an ads-reporting API,
//! translates a declarative field schema into a query, pages through
//! results, and normalizes every row into flat records emitted over the
//! host framework's JSON-line protocol.
//!
//! # Architecture
//!
//! ```text
//! Host framework (spec / check / discover / read)
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       entrypoint::launch                 │
//! │  - Parse command + config file           │
//! │  - Dispatch to the Source                │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Source (implements trait)          │
//! │  - Build API client from credentials     │
//! │  - Enumerate accounts and streams        │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Streams (one per report)           │
//! │  - Schema → query                        │
//! │  - Page through API results              │
//! │  - Normalize rows into records           │
//! └─────────────────────────────────────────┘
//!          ↓
//!   stdout: RECORD / STATE / CATALOG / … JSON lines
//! ```
//!
//! # Core Types
//!
//! - [`Source`] - Trait each connector's entry object implements
//! - [`SourceStream`] - One logical table, read slice by slice
//! - [`Record`] - One normalized output row
//! - [`ReportSchema`] - Declarative field-path → type schema
//!
//! # Connectors
//!
//! - `connectors::google_ads` - Google Ads non-segmented reports
//! - `connectors::bing_ads` - Bing Ads entities by account id

pub mod connectors;
pub mod entrypoint;
pub mod protocol;
pub mod schema;
pub mod source;
pub mod state;

// Re-export the types connectors and binaries touch most.
pub use entrypoint::launch;
pub use protocol::{ConnectionStatus, Record};
pub use schema::{FieldSchema, JsonType, ReportSchema};
pub use source::{Source, SourceStream, StreamSlice};
pub use state::StreamState;
