//! Bing Ads source configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// OAuth credentials plus the developer token required by the API.
#[derive(Clone, Debug, Deserialize)]
pub struct BingAdsCredentials {
    pub developer_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Operator-supplied configuration for the Bing Ads source.
#[derive(Clone, Debug, Deserialize)]
pub struct BingAdsSourceConfig {
    pub credentials: BingAdsCredentials,
    /// Comma-separated account ids to extract from.
    pub account_id: String,
}

impl BingAdsSourceConfig {
    pub fn parse(config: &Value) -> Result<Self> {
        serde_json::from_value(config.clone()).context("Invalid Bing Ads source configuration")
    }

    pub fn account_ids(&self) -> Vec<String> {
        self.account_id
            .split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_config() {
        let raw = json!({
            "credentials": {
                "developer_token": "dev-token",
                "client_id": "client-id",
                "client_secret": "client-secret",
                "refresh_token": "refresh-token"
            },
            "account_id": "111, 222"
        });
        let config = BingAdsSourceConfig::parse(&raw).unwrap();
        assert_eq!(config.account_ids(), vec!["111", "222"]);
    }

    #[test]
    fn test_missing_account_id_rejected() {
        let raw = json!({
            "credentials": {
                "developer_token": "d",
                "client_id": "c",
                "client_secret": "s",
                "refresh_token": "r"
            }
        });
        assert!(BingAdsSourceConfig::parse(&raw).is_err());
    }
}
