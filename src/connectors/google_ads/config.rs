//! Google Ads source configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// OAuth credentials plus the developer token required by the API.
#[derive(Clone, Debug, Deserialize)]
pub struct GoogleAdsCredentials {
    pub developer_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// One user-authored query definition.
#[derive(Clone, Debug, Deserialize)]
pub struct CustomQueryConfig {
    /// GAQL query text, executed as-is at read time.
    pub query: String,
    /// Stream name the query's records are emitted under.
    pub table_name: String,
}

/// Operator-supplied configuration for the Google Ads source.
#[derive(Clone, Debug, Deserialize)]
pub struct GoogleAdsSourceConfig {
    pub credentials: GoogleAdsCredentials,
    /// Comma-separated customer ids to extract from.
    pub customer_id: String,
    /// Manager account to authenticate under, when the customers are
    /// reached through one.
    #[serde(default)]
    pub login_customer_id: Option<String>,
    #[serde(default)]
    pub custom_queries: Vec<CustomQueryConfig>,
}

impl GoogleAdsSourceConfig {
    pub fn parse(config: &Value) -> Result<Self> {
        serde_json::from_value(config.clone()).context("Invalid Google Ads source configuration")
    }

    /// Customer ids from the comma-separated `customer_id` field.
    pub fn customer_ids(&self) -> Vec<String> {
        self.customer_id
            .split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }

    /// `login_customer_id` with blank values treated as absent.
    pub fn login_customer_id(&self) -> Option<&str> {
        self.login_customer_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}
