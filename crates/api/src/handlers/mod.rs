//! Route handlers and the state they share.

pub mod executions;
pub mod webhooks;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use nodes::pagecrawl::PageCrawlTrigger;
use nodes::{HttpClient, Item};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Authenticated client used by executed nodes.
    pub http: Arc<dyn HttpClient>,
    /// Workflow the executions and triggers belong to.
    pub workflow_id: Uuid,
    /// Triggers keyed by their webhook path segment.
    pub triggers: Arc<HashMap<String, Arc<PageCrawlTrigger>>>,
    /// Where items emitted by triggers are forwarded.
    pub deliveries: Option<mpsc::Sender<Vec<Item>>>,
}

impl AppState {
    pub fn new(http: Arc<dyn HttpClient>, workflow_id: Uuid) -> Self {
        Self {
            http,
            workflow_id,
            triggers: Arc::new(HashMap::new()),
            deliveries: None,
        }
    }

    pub fn with_trigger(mut self, path: impl Into<String>, trigger: Arc<PageCrawlTrigger>) -> Self {
        Arc::make_mut(&mut self.triggers).insert(path.into(), trigger);
        self
    }

    pub fn with_deliveries(mut self, sender: mpsc::Sender<Vec<Item>>) -> Self {
        self.deliveries = Some(sender);
        self
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
