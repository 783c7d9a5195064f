//! Customer accounts.

use serde_json::{Map, Value};

/// One queryable account. Manager accounts aggregate child accounts and
/// cannot themselves be queried for metrics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Customer {
    pub id: String,
    pub is_manager: bool,
}

impl Customer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_manager: false,
        }
    }

    /// Builds the customer list from normalized `service_accounts` records.
    pub fn from_accounts(accounts: &[Map<String, Value>]) -> Vec<Customer> {
        accounts
            .iter()
            .filter_map(|record| {
                let id = match record.get("customer.id")? {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                let is_manager = record
                    .get("customer.manager")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Some(Customer { id, is_manager })
            })
            .collect()
    }
}

/// Splits customers into (non-manager, manager) sets. Metric-bearing
/// streams take only the first; dimension-only streams take all.
pub fn partition_customers(customers: &[Customer]) -> (Vec<Customer>, Vec<Customer>) {
    customers
        .iter()
        .cloned()
        .partition(|customer| !customer.is_manager)
}
