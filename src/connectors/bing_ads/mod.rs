pub mod client;
pub mod config;
pub mod streams;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::protocol::ConnectorSpecification;
use crate::source::{Source, SourceStream};

use self::client::{BingAdsClient, BASE_URL, TOKEN_URL};
use self::config::BingAdsSourceConfig;
use self::streams::{Accounts, Campaigns};

/// Bing Ads source — pulls account and campaign entities by account id.
pub struct SourceBingAds {
    base_url: String,
    token_url: String,
}

impl Default for SourceBingAds {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceBingAds {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Source with custom API endpoints (for testing with a mock server).
    pub fn with_base_urls(base_url: String, token_url: String) -> Self {
        Self {
            base_url,
            token_url,
        }
    }

    async fn build_client(&self, config: &BingAdsSourceConfig) -> Result<Arc<BingAdsClient>> {
        let client = BingAdsClient::connect_with_urls(
            &config.credentials,
            self.base_url.clone(),
            self.token_url.clone(),
        )
        .await?;
        Ok(Arc::new(client))
    }
}

#[async_trait]
impl Source for SourceBingAds {
    fn name(&self) -> &str {
        "source-bing-ads"
    }

    fn spec(&self) -> ConnectorSpecification {
        ConnectorSpecification {
            documentation_url: "https://learn.microsoft.com/en-us/advertising/guides/"
                .to_string(),
            connection_specification: json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "title": "Bing Ads Source Spec",
                "type": "object",
                "required": ["credentials", "account_id"],
                "properties": {
                    "credentials": {
                        "type": "object",
                        "required": ["developer_token", "client_id", "client_secret", "refresh_token"],
                        "properties": {
                            "developer_token": { "type": "string", "airbyte_secret": true },
                            "client_id": { "type": "string" },
                            "client_secret": { "type": "string", "airbyte_secret": true },
                            "refresh_token": { "type": "string", "airbyte_secret": true }
                        }
                    },
                    "account_id": {
                        "type": "string",
                        "description": "Comma-separated account ids to extract from."
                    }
                }
            }),
        }
    }

    async fn check_connection(&self, config: &Value) -> Result<(bool, Option<String>)> {
        info!("Checking the config");
        let config = BingAdsSourceConfig::parse(config)?;
        let result = async {
            let client = self.build_client(&config).await?;
            for account_id in config.account_ids() {
                client.get_account(&account_id).await?;
            }
            Ok::<_, anyhow::Error>(())
        }
        .await;
        match result {
            Ok(()) => Ok((true, None)),
            Err(e) => Ok((
                false,
                Some(format!(
                    "Unable to connect to Bing Ads API with the provided configuration - {}",
                    e
                )),
            )),
        }
    }

    async fn streams(&self, config: &Value) -> Result<Vec<Box<dyn SourceStream>>> {
        let config = BingAdsSourceConfig::parse(config)?;
        let client = self.build_client(&config).await?;
        let account_ids = config.account_ids();
        info!(accounts = account_ids.len(), "Building streams");
        Ok(vec![
            Box::new(Accounts::new(Arc::clone(&client), account_ids.clone())),
            Box::new(Campaigns::new(client, account_ids)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn config_value() -> Value {
        json!({
            "credentials": {
                "developer_token": "dev-token",
                "client_id": "client-id",
                "client_secret": "client-secret",
                "refresh_token": "refresh-token"
            },
            "account_id": "111"
        })
    }

    async fn mock_token(server: &mut Server) {
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "access-token"}"#)
            .create_async()
            .await;
    }

    fn source(server: &Server) -> SourceBingAds {
        SourceBingAds::with_base_urls(server.url(), format!("{}/token", server.url()))
    }

    #[tokio::test]
    async fn test_check_connection_succeeds() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        server
            .mock("GET", "/CampaignManagement/v13/Accounts/111")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Id": 111, "Name": "Test Account"}"#)
            .create_async()
            .await;

        let (ok, message) = source(&server)
            .check_connection(&config_value())
            .await
            .unwrap();
        assert!(ok);
        assert!(message.is_none());
    }

    #[tokio::test]
    async fn test_check_connection_reports_failure() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        server
            .mock("GET", "/CampaignManagement/v13/Accounts/111")
            .with_status(401)
            .with_body(r#"{"Code": 105, "Message": "Authentication token expired"}"#)
            .create_async()
            .await;

        let (ok, message) = source(&server)
            .check_connection(&config_value())
            .await
            .unwrap();
        assert!(!ok);
        assert!(message.unwrap().contains("Unable to connect to Bing Ads API"));
    }

    #[tokio::test]
    async fn test_streams_enumeration() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;

        let streams = source(&server).streams(&config_value()).await.unwrap();
        assert_eq!(streams.len(), 2);
        let names: Vec<&str> = streams.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["accounts", "campaigns"]);
    }
}
