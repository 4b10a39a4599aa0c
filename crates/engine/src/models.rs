//! Request and result shapes of a batch execution.
//!
//! Both serialise with camelCase keys so they can travel over the HTTP
//! surface unchanged.

use chrono::{DateTime, Utc};
use nodes::Item;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A batch submitted for execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Input items, in order.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Emit an error item for a failed input instead of aborting the batch.
    #[serde(default)]
    pub continue_on_fail: bool,
    /// Node-level parameters every item inherits.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// The result of running a full batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub execution_id: Uuid,
    /// Output items in input order, each paired with its source item.
    pub items: Vec<Item>,
    /// Number of inputs that produced an error item.
    pub failed_items: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
