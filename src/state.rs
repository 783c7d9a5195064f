//! Incremental stream state.
//!
//! Holds one watermark value per customer id. Updates merge rather than
//! replace, so partial updates arriving for different customers accumulate
//! independently across a run.

use serde_json::{Map, Value};

/// Per-customer watermark map for an incremental stream.
#[derive(Clone, Debug, Default)]
pub struct StreamState {
    cursors: Map<String, Value>,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the watermark for one customer, if any has been recorded.
    pub fn current(&self, customer_id: &str) -> Option<&Value> {
        self.cursors.get(customer_id)
    }

    /// Shallow-merges `update` into the held state. Keys present in
    /// `update` overwrite their previous value; all other keys are kept.
    pub fn merge(&mut self, update: Value) {
        if let Value::Object(entries) = update {
            for (customer_id, cursor) in entries {
                self.cursors.insert(customer_id, cursor);
            }
        }
    }

    /// Snapshot of the full state for the host framework to persist.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.cursors.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}
