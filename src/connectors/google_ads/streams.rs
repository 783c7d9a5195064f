//! Google Ads streams.
//!
//! Each stream reads one report per customer: build the query from the
//! schema, pull pages from the client, normalize every row. Streams that
//! catch API errors skip a customer when the API reports it as not
//! enabled; the internal account-enumeration stream does not catch, since
//! no accounts means no data at all.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use crate::protocol::{Record, SyncMode};
use crate::schema::{FieldSchema, JsonType, ReportSchema};
use crate::source::{SourceStream, StreamSlice};
use crate::state::StreamState;

use super::client::{FieldMetadata, GoogleAdsClient, GoogleAdsException};
use super::config::CustomQueryConfig;
use super::customer::Customer;
use super::normalize::parse_row;
use super::query::{build_query, fields_from_query};
use super::schemas;

/// Reads and normalizes one report for one customer.
///
/// With `catch_api_errors`, a failure whose errors are all
/// CUSTOMER_NOT_ENABLED is logged and the customer is skipped; anything
/// else propagates.
pub(crate) async fn read_report(
    client: &GoogleAdsClient,
    schema: &ReportSchema,
    query: &str,
    stream_name: &str,
    customer_id: &str,
    catch_api_errors: bool,
) -> Result<Vec<Record>> {
    let mut pager = client.search(query, customer_id);
    let mut records = Vec::new();
    loop {
        let page = match pager.next_page().await {
            Ok(Some(page)) => page,
            Ok(None) => break,
            Err(e) => {
                if catch_api_errors {
                    if let Some(exception) = e.downcast_ref::<GoogleAdsException>() {
                        if exception.is_customer_not_enabled() {
                            for api_error in &exception.errors {
                                error!(
                                    stream = stream_name,
                                    customer_id = customer_id,
                                    "{}",
                                    api_error.message
                                );
                            }
                            return Ok(records);
                        }
                    }
                }
                return Err(e);
            }
        };
        for row in &page.results {
            let data = parse_row(schema, row)?;
            records.push(Record::new(stream_name, Value::Object(data)));
        }
    }
    Ok(records)
}

fn slices_for(customers: &[Customer]) -> Vec<StreamSlice> {
    customers
        .iter()
        .map(|customer| StreamSlice::new(customer.id.clone()))
        .collect()
}

/// Geo target constants: dimension-only, so manager accounts are
/// included. Incremental scaffolding: the watermark is exposed to the
/// host framework but not yet advanced by query construction.
pub struct GeoConstants {
    client: Arc<GoogleAdsClient>,
    customers: Vec<Customer>,
    schema: ReportSchema,
    state: StreamState,
}

impl GeoConstants {
    pub const NAME: &'static str = "geo_constants";

    pub fn new(client: Arc<GoogleAdsClient>, customers: Vec<Customer>) -> Self {
        Self {
            client,
            customers,
            schema: schemas::geo_constants(),
            state: StreamState::new(),
        }
    }
}

#[async_trait]
impl SourceStream for GeoConstants {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn json_schema(&self) -> Value {
        self.schema.json_schema()
    }

    fn sync_modes(&self) -> Vec<SyncMode> {
        vec![SyncMode::FullRefresh, SyncMode::Incremental]
    }

    fn slices(&self) -> Vec<StreamSlice> {
        slices_for(&self.customers)
    }

    async fn read_records(&self, slice: &StreamSlice) -> Result<Vec<Record>> {
        let query = build_query(&self.schema, Self::NAME)?;
        read_report(
            &self.client,
            &self.schema,
            &query,
            Self::NAME,
            &slice.customer_id,
            true,
        )
        .await
    }

    fn state(&self) -> Option<Value> {
        Some(self.state.snapshot())
    }

    fn set_state(&mut self, value: Value) {
        self.state.merge(value);
    }
}

/// Internal account-enumeration stream. Not exposed to the operator;
/// errors always surface.
pub struct ServiceAccounts {
    client: Arc<GoogleAdsClient>,
    customers: Vec<Customer>,
    schema: ReportSchema,
}

impl ServiceAccounts {
    pub const NAME: &'static str = "service_accounts";

    pub fn new(client: Arc<GoogleAdsClient>, customers: Vec<Customer>) -> Self {
        Self {
            client,
            customers,
            schema: schemas::service_accounts(),
        }
    }

    pub fn slices(&self) -> Vec<StreamSlice> {
        slices_for(&self.customers)
    }

    /// Reads the `customer` resource for one slice, as normalized record
    /// data maps.
    pub async fn read_records(&self, slice: &StreamSlice) -> Result<Vec<Map<String, Value>>> {
        let query = build_query(&self.schema, Self::NAME)?;
        let records = read_report(
            &self.client,
            &self.schema,
            &query,
            Self::NAME,
            &slice.customer_id,
            false,
        )
        .await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match record.data {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }
}

/// Derives a report schema for custom-query columns from the field
/// metadata service.
pub fn schema_from_metadata(
    fields: &[String],
    metadata: &HashMap<String, FieldMetadata>,
) -> ReportSchema {
    let mut properties = Vec::new();
    for field in fields {
        let schema = match metadata.get(field) {
            Some(meta) => {
                let scalar = match meta.data_type.as_str() {
                    "INT32" | "INT64" => FieldSchema::new(JsonType::Integer),
                    "DOUBLE" | "FLOAT" => FieldSchema::new(JsonType::Number),
                    "BOOLEAN" => FieldSchema::new(JsonType::Boolean),
                    "MESSAGE" => FieldSchema::new(JsonType::String).message(),
                    // ENUM, DATE, STRING, RESOURCE_NAME and the rest
                    // serialize as strings.
                    _ => FieldSchema::new(JsonType::String),
                };
                if meta.is_repeated {
                    let mut array = FieldSchema::array();
                    array.protobuf_message = scalar.protobuf_message;
                    array
                } else {
                    scalar
                }
            }
            // Unknown to the metadata service: keep the field, treat the
            // value as an opaque string.
            None => FieldSchema::new(JsonType::String),
        };
        properties.push((field.as_str(), schema));
    }
    ReportSchema::new(properties)
}

/// User-authored query stream. The query text is sent as written; only
/// the column list is parsed out, to derive the output schema.
pub struct CustomQuery {
    client: Arc<GoogleAdsClient>,
    customers: Vec<Customer>,
    config: CustomQueryConfig,
    schema: ReportSchema,
    state: StreamState,
}

impl CustomQuery {
    /// Builds the stream, deriving its schema from field metadata.
    pub async fn new(
        client: Arc<GoogleAdsClient>,
        customers: Vec<Customer>,
        config: CustomQueryConfig,
    ) -> Result<Self> {
        let fields = fields_from_query(&config.query)?;
        let metadata = client.get_fields_metadata(&fields).await?;
        let schema = schema_from_metadata(&fields, &metadata);
        Ok(Self {
            client,
            customers,
            config,
            schema,
            state: StreamState::new(),
        })
    }
}

#[async_trait]
impl SourceStream for CustomQuery {
    fn name(&self) -> &str {
        &self.config.table_name
    }

    fn json_schema(&self) -> Value {
        self.schema.json_schema()
    }

    fn sync_modes(&self) -> Vec<SyncMode> {
        vec![SyncMode::FullRefresh, SyncMode::Incremental]
    }

    fn slices(&self) -> Vec<StreamSlice> {
        slices_for(&self.customers)
    }

    async fn read_records(&self, slice: &StreamSlice) -> Result<Vec<Record>> {
        read_report(
            &self.client,
            &self.schema,
            &self.config.query,
            self.name(),
            &slice.customer_id,
            true,
        )
        .await
    }

    fn state(&self) -> Option<Value> {
        Some(self.state.snapshot())
    }

    fn set_state(&mut self, value: Value) {
        self.state.merge(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::google_ads::client::GoogleAdsClient;
    use crate::connectors::google_ads::config::GoogleAdsCredentials;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn credentials() -> GoogleAdsCredentials {
        GoogleAdsCredentials {
            developer_token: "dev-token".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            refresh_token: "refresh-token".to_string(),
        }
    }

    async fn connect(server: &mut Server) -> Arc<GoogleAdsClient> {
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "access-token"}"#)
            .create_async()
            .await;
        Arc::new(
            GoogleAdsClient::connect_with_urls(
                &credentials(),
                None,
                server.url(),
                format!("{}/token", server.url()),
            )
            .await
            .unwrap(),
        )
    }

    fn customer_not_enabled_body() -> &'static str {
        r#"{
            "error": {
                "code": 403,
                "message": "denied",
                "details": [{
                    "errors": [{
                        "errorCode": {"authorizationError": "CUSTOMER_NOT_ENABLED"},
                        "message": "The customer can't be used because it isn't enabled."
                    }]
                }]
            }
        }"#
    }

    #[tokio::test]
    async fn test_geo_constants_reads_and_normalizes() {
        let mut server = Server::new_async().await;
        let client = connect(&mut server).await;
        let _search = server
            .mock("POST", "/v11/customers/123/googleAds:search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results": [{
                    "geo_target_constant": {
                        "canonical_name": "United States",
                        "country_code": "US",
                        "id": 2840,
                        "name": "United States",
                        "parent_geo_target": "",
                        "resource_name": "geoTargetConstants/2840",
                        "status": "ENABLED",
                        "target_type": "Country"
                    }
                }]}"#,
            )
            .create_async()
            .await;

        let stream = GeoConstants::new(client, vec![Customer::new("123")]);
        let slices = stream.slices();
        assert_eq!(slices, vec![StreamSlice::new("123")]);

        let records = stream.read_records(&slices[0]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stream, "geo_constants");
        assert_eq!(records[0].data["geo_target_constant.id"], json!(2840));
        assert_eq!(records[0].data["geo_target_constant.status"], json!("ENABLED"));
    }

    #[tokio::test]
    async fn test_customer_not_enabled_is_skipped() {
        let mut server = Server::new_async().await;
        let client = connect(&mut server).await;
        let _search = server
            .mock("POST", "/v11/customers/123/googleAds:search")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(customer_not_enabled_body())
            .create_async()
            .await;

        let stream = GeoConstants::new(client, vec![Customer::new("123")]);
        let records = stream
            .read_records(&StreamSlice::new("123"))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_other_api_errors_propagate() {
        let mut server = Server::new_async().await;
        let client = connect(&mut server).await;
        let _search = server
            .mock("POST", "/v11/customers/123/googleAds:search")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "error": {
                        "code": 400,
                        "message": "bad query",
                        "details": [{
                            "errors": [{
                                "errorCode": {"queryError": "UNRECOGNIZED_FIELD"},
                                "message": "Unrecognized field in the query."
                            }]
                        }]
                    }
                }"#,
            )
            .create_async()
            .await;

        let stream = GeoConstants::new(client, vec![Customer::new("123")]);
        let err = stream
            .read_records(&StreamSlice::new("123"))
            .await
            .unwrap_err();
        let exception = err.downcast_ref::<GoogleAdsException>().unwrap();
        assert!(!exception.is_customer_not_enabled());
    }

    #[tokio::test]
    async fn test_service_accounts_never_catches() {
        let mut server = Server::new_async().await;
        let client = connect(&mut server).await;
        let _search = server
            .mock("POST", "/v11/customers/123/googleAds:search")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(customer_not_enabled_body())
            .create_async()
            .await;

        let stream = ServiceAccounts::new(client, vec![Customer::new("123")]);
        let err = stream
            .read_records(&StreamSlice::new("123"))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<GoogleAdsException>().is_some());
    }

    #[tokio::test]
    async fn test_custom_query_derives_schema_and_reads() {
        let mut server = Server::new_async().await;
        let client = connect(&mut server).await;
        let _fields = server
            .mock("POST", "/v11/googleAdsFields:search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results": [
                    {"name": "campaign.id", "dataType": "INT64"},
                    {"name": "campaign.status", "dataType": "ENUM",
                     "enumValues": ["ENABLED", "PAUSED"]},
                    {"name": "ad_group_ad.ad.legacy_app_install_ad",
                     "dataType": "MESSAGE"}
                ]}"#,
            )
            .create_async()
            .await;
        let _search = server
            .mock("POST", "/v11/customers/123/googleAds:search")
            .match_body(Matcher::PartialJsonString(
                r#"{"query": "SELECT campaign.id, campaign.status, ad_group_ad.ad.legacy_app_install_ad FROM ad_group_ad"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results": [{
                    "campaign": {"id": 8765465473658, "status": "ENABLED"},
                    "ad_group_ad": {"ad": {"legacy_app_install_ad": {"app_id": "x"}}}
                }]}"#,
            )
            .create_async()
            .await;

        let config = CustomQueryConfig {
            query: "SELECT campaign.id, campaign.status, ad_group_ad.ad.legacy_app_install_ad FROM ad_group_ad".to_string(),
            table_name: "my_ads".to_string(),
        };
        let stream = CustomQuery::new(client, vec![Customer::new("123")], config)
            .await
            .unwrap();
        assert_eq!(stream.name(), "my_ads");

        let records = stream
            .read_records(&StreamSlice::new("123"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data["campaign.id"], json!(8765465473658u64));
        assert_eq!(records[0].data["campaign.status"], json!("ENABLED"));
        // MESSAGE-typed field forced to string.
        assert!(records[0].data["ad_group_ad.ad.legacy_app_install_ad"].is_string());
    }

    #[test]
    fn test_schema_from_metadata_mapping() {
        let fields = vec![
            "campaign.id".to_string(),
            "metrics.ctr".to_string(),
            "campaign.status".to_string(),
            "campaign.labels".to_string(),
            "something.unknown".to_string(),
        ];
        let mut metadata = HashMap::new();
        metadata.insert(
            "campaign.id".to_string(),
            FieldMetadata {
                name: "campaign.id".to_string(),
                data_type: "INT64".to_string(),
                is_repeated: false,
                enum_values: vec![],
            },
        );
        metadata.insert(
            "metrics.ctr".to_string(),
            FieldMetadata {
                name: "metrics.ctr".to_string(),
                data_type: "DOUBLE".to_string(),
                is_repeated: false,
                enum_values: vec![],
            },
        );
        metadata.insert(
            "campaign.status".to_string(),
            FieldMetadata {
                name: "campaign.status".to_string(),
                data_type: "ENUM".to_string(),
                is_repeated: false,
                enum_values: vec!["ENABLED".to_string()],
            },
        );
        metadata.insert(
            "campaign.labels".to_string(),
            FieldMetadata {
                name: "campaign.labels".to_string(),
                data_type: "RESOURCE_NAME".to_string(),
                is_repeated: true,
                enum_values: vec![],
            },
        );

        let schema = schema_from_metadata(&fields, &metadata);
        assert_eq!(schema.get("campaign.id").unwrap().types, [JsonType::Integer]);
        assert_eq!(schema.get("metrics.ctr").unwrap().types, [JsonType::Number]);
        assert_eq!(
            schema.get("campaign.status").unwrap().types,
            [JsonType::String]
        );
        assert!(schema.get("campaign.labels").unwrap().is_array());
        assert_eq!(
            schema.get("something.unknown").unwrap().types,
            [JsonType::String]
        );
    }

    #[tokio::test]
    async fn test_incremental_state_merge() {
        // set_state accumulates per-customer entries across calls.
        let mut server = Server::new_async().await;
        let client = connect(&mut server).await;
        let mut stream = GeoConstants::new(client, vec![Customer::new("1")]);
        stream.set_state(json!({ "1": { "cursor": "a" } }));
        stream.set_state(json!({ "2": { "cursor": "b" } }));
        let snapshot = stream.state().unwrap();
        assert_eq!(snapshot["1"]["cursor"], "a");
        assert_eq!(snapshot["2"]["cursor"], "b");
    }
}
