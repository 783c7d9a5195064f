//! HTTP client for the Bing Ads campaign management API.
//!
//! Fetches account and campaign entities by account id. Authenticates by
//! exchanging the configured OAuth refresh token for an access token at
//! construction time; every request also carries the developer token.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::config::BingAdsCredentials;

pub const API_VERSION: &str = "v13";

pub const BASE_URL: &str = "https://campaign.api.bingads.microsoft.com";
pub const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const TOKEN_SCOPE: &str = "https://ads.microsoft.com/msads.manage offline_access";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// One advertiser account, by id.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// One campaign under an account.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Campaign {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub budget_type: Option<String>,
    #[serde(default)]
    pub daily_budget: Option<f64>,
}

/// Client for one run.
#[derive(Debug)]
pub struct BingAdsClient {
    http: Client,
    access_token: String,
    developer_token: String,
    base_url: String,
}

impl BingAdsClient {
    /// Exchanges the refresh token and returns a ready client.
    pub async fn connect(credentials: &BingAdsCredentials) -> Result<Self> {
        Self::connect_with_urls(credentials, BASE_URL.to_string(), TOKEN_URL.to_string()).await
    }

    /// Same as [`connect`](Self::connect) with custom endpoints (for
    /// testing with a mock server).
    pub async fn connect_with_urls(
        credentials: &BingAdsCredentials,
        base_url: String,
        token_url: String,
    ) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
            ("scope", TOKEN_SCOPE),
        ];
        let response = http
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .context("Failed to send token request")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Bing Ads token refresh rejected: {} {}", status, body));
        }
        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        Ok(Self {
            http,
            access_token: token.access_token,
            developer_token: credentials.developer_token.clone(),
            base_url,
        })
    }

    /// Fetches one account by id.
    pub async fn get_account(&self, account_id: &str) -> Result<Account> {
        let url = format!(
            "{}/CampaignManagement/{}/Accounts/{}",
            self.base_url, API_VERSION, account_id
        );
        let body = self.get(&url).await?;
        serde_json::from_value(body).context("Failed to parse account response")
    }

    /// Fetches every campaign under one account.
    pub async fn get_campaigns(&self, account_id: &str) -> Result<Vec<Campaign>> {
        let url = format!(
            "{}/CampaignManagement/{}/Accounts/{}/Campaigns",
            self.base_url, API_VERSION, account_id
        );
        let body = self.get(&url).await?;

        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct CampaignsResponse {
            #[serde(default)]
            campaigns: Vec<Campaign>,
        }
        let parsed: CampaignsResponse =
            serde_json::from_value(body).context("Failed to parse campaigns response")?;
        Ok(parsed.campaigns)
    }

    async fn get(&self, url: &str) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .header("DeveloperToken", &self.developer_token)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Bing Ads API error: {} {}", status, body));
        }
        response.json().await.context("Failed to parse response body")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn credentials() -> BingAdsCredentials {
        BingAdsCredentials {
            developer_token: "dev-token".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            refresh_token: "refresh-token".to_string(),
        }
    }

    async fn connect(server: &mut Server) -> BingAdsClient {
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "access-token"}"#)
            .create_async()
            .await;
        BingAdsClient::connect_with_urls(
            &credentials(),
            server.url(),
            format!("{}/token", server.url()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_account() {
        let mut server = Server::new_async().await;
        let client = connect(&mut server).await;
        let _mock = server
            .mock("GET", "/CampaignManagement/v13/Accounts/111")
            .match_header("DeveloperToken", "dev-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"Id": 111, "Name": "Test Account", "Number": "X000111",
                    "CurrencyCode": "USD", "TimeZone": "EasternTimeUSCanada"}"#,
            )
            .create_async()
            .await;

        let account = client.get_account("111").await.unwrap();
        assert_eq!(account.id, 111);
        assert_eq!(account.name, "Test Account");
        assert_eq!(account.currency_code.as_deref(), Some("USD"));
    }

    #[tokio::test]
    async fn test_get_campaigns() {
        let mut server = Server::new_async().await;
        let client = connect(&mut server).await;
        let _mock = server
            .mock("GET", "/CampaignManagement/v13/Accounts/111/Campaigns")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"Campaigns": [
                    {"Id": 1, "Name": "Campaign A", "Status": "Active",
                     "BudgetType": "DailyBudgetStandard", "DailyBudget": 25.0},
                    {"Id": 2, "Name": "Campaign B", "Status": "Paused"}
                ]}"#,
            )
            .create_async()
            .await;

        let campaigns = client.get_campaigns("111").await.unwrap();
        assert_eq!(campaigns.len(), 2);
        assert_eq!(campaigns[0].name, "Campaign A");
        assert_eq!(campaigns[0].daily_budget, Some(25.0));
        assert_eq!(campaigns[1].status.as_deref(), Some("Paused"));
    }

    #[tokio::test]
    async fn test_api_error_propagates() {
        let mut server = Server::new_async().await;
        let client = connect(&mut server).await;
        let _mock = server
            .mock("GET", "/CampaignManagement/v13/Accounts/111")
            .with_status(401)
            .with_body(r#"{"Code": 105, "Message": "Authentication token expired"}"#)
            .create_async()
            .await;

        let err = client.get_account("111").await.unwrap_err();
        assert!(err.to_string().contains("Bing Ads API error"));
    }

    #[tokio::test]
    async fn test_rejected_refresh_token() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let err = BingAdsClient::connect_with_urls(
            &credentials(),
            server.url(),
            format!("{}/token", server.url()),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("token refresh rejected"));
    }
}
