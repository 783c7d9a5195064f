//! Bing Ads streams.
//!
//! Thin wrappers over the client: one slice per configured account id,
//! each slice fetched in a single request and flattened into records.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::protocol::Record;
use crate::source::{SourceStream, StreamSlice};

use super::client::BingAdsClient;

fn slices_for(account_ids: &[String]) -> Vec<StreamSlice> {
    account_ids
        .iter()
        .map(|id| StreamSlice::new(id.clone()))
        .collect()
}

/// Advertiser accounts, fetched by id.
pub struct Accounts {
    client: Arc<BingAdsClient>,
    account_ids: Vec<String>,
}

impl Accounts {
    pub const NAME: &'static str = "accounts";

    pub fn new(client: Arc<BingAdsClient>, account_ids: Vec<String>) -> Self {
        Self {
            client,
            account_ids,
        }
    }
}

#[async_trait]
impl SourceStream for Accounts {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn json_schema(&self) -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "id": { "type": ["null", "integer"] },
                "name": { "type": ["null", "string"] },
                "number": { "type": ["null", "string"] },
                "currency_code": { "type": ["null", "string"] },
                "time_zone": { "type": ["null", "string"] }
            }
        })
    }

    fn slices(&self) -> Vec<StreamSlice> {
        slices_for(&self.account_ids)
    }

    async fn read_records(&self, slice: &StreamSlice) -> Result<Vec<Record>> {
        let account = self.client.get_account(&slice.customer_id).await?;
        Ok(vec![Record::new(
            Self::NAME,
            json!({
                "id": account.id,
                "name": account.name,
                "number": account.number,
                "currency_code": account.currency_code,
                "time_zone": account.time_zone,
            }),
        )])
    }
}

/// Campaigns under each configured account.
pub struct Campaigns {
    client: Arc<BingAdsClient>,
    account_ids: Vec<String>,
}

impl Campaigns {
    pub const NAME: &'static str = "campaigns";

    pub fn new(client: Arc<BingAdsClient>, account_ids: Vec<String>) -> Self {
        Self {
            client,
            account_ids,
        }
    }
}

#[async_trait]
impl SourceStream for Campaigns {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn json_schema(&self) -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "account_id": { "type": ["null", "string"] },
                "id": { "type": ["null", "integer"] },
                "name": { "type": ["null", "string"] },
                "status": { "type": ["null", "string"] },
                "budget_type": { "type": ["null", "string"] },
                "daily_budget": { "type": ["null", "number"] }
            }
        })
    }

    fn slices(&self) -> Vec<StreamSlice> {
        slices_for(&self.account_ids)
    }

    async fn read_records(&self, slice: &StreamSlice) -> Result<Vec<Record>> {
        let campaigns = self.client.get_campaigns(&slice.customer_id).await?;
        Ok(campaigns
            .into_iter()
            .map(|campaign| {
                Record::new(
                    Self::NAME,
                    json!({
                        "account_id": slice.customer_id,
                        "id": campaign.id,
                        "name": campaign.name,
                        "status": campaign.status,
                        "budget_type": campaign.budget_type,
                        "daily_budget": campaign.daily_budget,
                    }),
                )
            })
            .collect())
    }
}
