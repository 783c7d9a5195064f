//! HTTP client for the Google Ads reporting API.
//!
//! Speaks the REST surface of the versioned API: `googleAds:search` for
//! report rows (paged) and `googleAdsFields:search` for field metadata.
//! Authenticates by exchanging the configured OAuth refresh token for an
//! access token at construction time.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use super::config::GoogleAdsCredentials;

pub const API_VERSION: &str = "v11";
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

pub const BASE_URL: &str = "https://googleads.googleapis.com";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// One structured error returned by the API.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAdsError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error_code: ErrorCode,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCode {
    #[serde(default)]
    pub authorization_error: Option<String>,
    #[serde(default)]
    pub request_error: Option<String>,
    #[serde(default)]
    pub query_error: Option<String>,
    #[serde(default)]
    pub authentication_error: Option<String>,
}

/// Structured failure raised by the API, carrying the full error list.
///
/// Surfaced through `anyhow::Error` and recovered with `downcast_ref`
/// where the failure policy needs to inspect individual error codes.
#[derive(Clone, Debug)]
pub struct GoogleAdsException {
    pub errors: Vec<GoogleAdsError>,
}

impl GoogleAdsException {
    /// Joined message text of every error in the failure.
    pub fn error_messages(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// True when every error in the failure is the per-customer
    /// authorization error CUSTOMER_NOT_ENABLED.
    pub fn is_customer_not_enabled(&self) -> bool {
        !self.errors.is_empty()
            && self.errors.iter().all(|e| {
                e.error_code.authorization_error.as_deref() == Some("CUSTOMER_NOT_ENABLED")
            })
    }
}

impl fmt::Display for GoogleAdsException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Google Ads API failure: {}", self.error_messages())
    }
}

impl std::error::Error for GoogleAdsException {}

/// Metadata for one reportable field, from `googleAdsFields:search`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_repeated: bool,
    #[serde(default)]
    pub enum_values: Vec<String>,
}

/// One page of report rows.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    page_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize, Default)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Client for one run: holds the exchanged access token, the developer
/// token, and the optional login customer id header.
#[derive(Debug)]
pub struct GoogleAdsClient {
    http: Client,
    access_token: String,
    developer_token: String,
    login_customer_id: Option<String>,
    base_url: String,
}

impl GoogleAdsClient {
    /// Exchanges the refresh token and returns a ready client.
    pub async fn connect(
        credentials: &GoogleAdsCredentials,
        login_customer_id: Option<String>,
    ) -> Result<Self> {
        Self::connect_with_urls(
            credentials,
            login_customer_id,
            BASE_URL.to_string(),
            TOKEN_URL.to_string(),
        )
        .await
    }

    /// Same as [`connect`](Self::connect) with custom endpoints (for
    /// testing against a mock server).
    pub async fn connect_with_urls(
        credentials: &GoogleAdsCredentials,
        login_customer_id: Option<String>,
        base_url: String,
        token_url: String,
    ) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        let access_token =
            exchange_refresh_token(&http, &token_url, credentials).await?;

        Ok(Self {
            http,
            access_token,
            developer_token: credentials.developer_token.clone(),
            login_customer_id,
            base_url,
        })
    }

    /// Returns a page iterator for one query against one customer. No
    /// request is issued until the first page is pulled.
    pub fn search<'a>(&'a self, query: &str, customer_id: &str) -> SearchPager<'a> {
        SearchPager {
            client: self,
            query: query.to_string(),
            customer_id: customer_id.to_string(),
            next_page_token: None,
            exhausted: false,
        }
    }

    /// Fetches type metadata for custom-query columns.
    pub async fn get_fields_metadata(
        &self,
        fields: &[String],
    ) -> Result<HashMap<String, FieldMetadata>> {
        let quoted: Vec<String> = fields.iter().map(|f| format!("'{}'", f)).collect();
        let query = format!(
            "SELECT name, data_type, enum_values, is_repeated WHERE name IN ({})",
            quoted.join(", ")
        );
        let url = format!("{}/{}/googleAdsFields:search", self.base_url, API_VERSION);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("developer-token", &self.developer_token)
            .json(&SearchRequest {
                query: &query,
                page_size: fields.len().max(1) as u64,
                page_token: None,
            })
            .send()
            .await
            .context("Failed to send field metadata request")?;

        let body = check_response(response).await?;

        #[derive(Deserialize)]
        struct FieldsResponse {
            #[serde(default)]
            results: Vec<FieldMetadata>,
        }
        let parsed: FieldsResponse =
            serde_json::from_value(body).context("Failed to parse field metadata response")?;
        Ok(parsed
            .results
            .into_iter()
            .map(|meta| (meta.name.clone(), meta))
            .collect())
    }

    async fn search_page(
        &self,
        query: &str,
        customer_id: &str,
        page_token: Option<String>,
    ) -> Result<SearchResponse> {
        let url = format!(
            "{}/{}/customers/{}/googleAds:search",
            self.base_url, API_VERSION, customer_id
        );
        let mut request = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("developer-token", &self.developer_token);
        if let Some(login_id) = &self.login_customer_id {
            request = request.header("login-customer-id", login_id);
        }
        let response = request
            .json(&SearchRequest {
                query,
                page_size: DEFAULT_PAGE_SIZE,
                page_token,
            })
            .send()
            .await
            .context("Failed to send search request")?;

        let body = check_response(response).await?;
        serde_json::from_value(body).context("Failed to parse search response")
    }
}

/// Page iterator over one query execution.
pub struct SearchPager<'a> {
    client: &'a GoogleAdsClient,
    query: String,
    customer_id: String,
    next_page_token: Option<String>,
    exhausted: bool,
}

impl<'a> SearchPager<'a> {
    /// Pulls the next page, or `None` when the result set is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<SearchResponse>> {
        if self.exhausted {
            return Ok(None);
        }
        let page = self
            .client
            .search_page(&self.query, &self.customer_id, self.next_page_token.take())
            .await?;
        match &page.next_page_token {
            Some(token) if !token.is_empty() => self.next_page_token = Some(token.clone()),
            _ => self.exhausted = true,
        }
        Ok(Some(page))
    }
}

/// Exchanges an OAuth refresh token for an access token.
///
/// A rejected grant is raised as a [`GoogleAdsException`] so that
/// credential errors surface as a connection-check failure message, like
/// any other structured vendor error.
async fn exchange_refresh_token(
    http: &Client,
    token_url: &str,
    credentials: &GoogleAdsCredentials,
) -> Result<String> {
    let params = [
        ("grant_type", "refresh_token"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("refresh_token", credentials.refresh_token.as_str()),
    ];
    let response = http
        .post(token_url)
        .form(&params)
        .send()
        .await
        .context("Failed to send token request")?;

    if !response.status().is_success() {
        let error: TokenErrorResponse = response.json().await.unwrap_or_default();
        return Err(anyhow::Error::new(GoogleAdsException {
            errors: vec![GoogleAdsError {
                message: format!(
                    "Token refresh rejected: {} {}",
                    error.error, error.error_description
                )
                .trim()
                .to_string(),
                error_code: ErrorCode {
                    authentication_error: Some("OAUTH_TOKEN_INVALID".to_string()),
                    ..ErrorCode::default()
                },
            }],
        }));
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;
    Ok(token.access_token)
}

/// Maps non-success responses to errors, extracting the structured
/// GoogleAdsFailure error list when the body carries one.
async fn check_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(body);
    }

    let errors = extract_failure_errors(&body);
    if !errors.is_empty() {
        return Err(anyhow::Error::new(GoogleAdsException { errors }));
    }
    Err(anyhow!("Google Ads API error: {} {}", status, body))
}

/// Pulls the GoogleAdsFailure error list out of a REST error body:
/// `{"error": {"details": [{"errors": [...]}, ...], ...}}`.
fn extract_failure_errors(body: &Value) -> Vec<GoogleAdsError> {
    let mut errors = Vec::new();
    let details = body
        .pointer("/error/details")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for detail in details {
        if let Some(list) = detail.get("errors").and_then(Value::as_array) {
            for raw in list {
                if let Ok(error) = serde_json::from_value::<GoogleAdsError>(raw.clone()) {
                    errors.push(error);
                }
            }
        }
    }
    errors
}
