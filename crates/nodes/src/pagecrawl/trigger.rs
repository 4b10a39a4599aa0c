//! The PageCrawl trigger: webhook registration lifecycle and inbound
//! delivery handling.
//!
//! The registered webhook id is cached in the node's static data under
//! [`WEBHOOK_ID_KEY`] so a restarted host can find and clean up what it
//! registered earlier.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::params::{is_falsy, scalar_string, ListEnvelope, ResourceLocator};
use super::types::{is_payload_field, DEFAULT_PAYLOAD_FIELDS, SIMPLIFIED_PAYLOAD_FIELDS};
use crate::{ApiRequest, HttpClient, Item, NodeError, StaticDataStore};

/// Static data key holding the registered webhook id.
pub const WEBHOOK_ID_KEY: &str = "webhookId";

/// `event_type` sent on registration, identifying deliveries as automation hooks.
const EVENT_TYPE: &str = "n8n";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Kind of delivery, inferred from its `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryEvent {
    Change,
    Error,
}

impl DeliveryEvent {
    pub fn of(delivery: &Value) -> Self {
        match delivery.get("status").and_then(Value::as_str) {
            Some("error") => Self::Error,
            _ => Self::Change,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerConfig {
    /// Workspace the webhook is scoped to; empty for the account default.
    pub workspace: ResourceLocator,
    /// Single page to watch; empty for every page in scope.
    pub page: ResourceLocator,
    /// Emit the flattened delivery shape instead of the raw body.
    pub simplify_output: bool,
    /// Fields requested when `simplify_output` is off.
    pub payload_fields: Vec<String>,
    /// Ask the service for a test delivery right after registering.
    pub send_test_on_listen: bool,
    /// Deliveries of other kinds are dropped on arrival. The service is not
    /// told about this list, so it does not reduce what gets sent.
    pub events: Vec<DeliveryEvent>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            workspace: ResourceLocator::default(),
            page: ResourceLocator::default(),
            simplify_output: true,
            payload_fields: DEFAULT_PAYLOAD_FIELDS.iter().map(|f| f.to_string()).collect(),
            send_test_on_listen: true,
            events: vec![DeliveryEvent::Change, DeliveryEvent::Error],
        }
    }
}

impl TriggerConfig {
    pub fn validate(&self) -> Result<(), NodeError> {
        if !self.workspace.is_empty() {
            self.workspace.validate("workspace")?;
        }
        if !self.page.is_empty() {
            self.page.validate("page")?;
        }
        if let Some(unknown) = self.payload_fields.iter().find(|f| !is_payload_field(f)) {
            return Err(NodeError::invalid_parameter(
                "payloadFields",
                format!("unknown payload field '{unknown}'"),
            ));
        }
        Ok(())
    }

    /// Payload fields to request from the service.
    pub fn requested_fields(&self) -> Vec<String> {
        if self.simplify_output {
            SIMPLIFIED_PAYLOAD_FIELDS.iter().map(|f| f.to_string()).collect()
        } else {
            self.payload_fields.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Simplified delivery
// ---------------------------------------------------------------------------

/// Flattened delivery: snake_case keys renamed, `page.*` hoisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedDelivery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_difference: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_name: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_link: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Value>,
}

impl From<&Value> for SimplifiedDelivery {
    fn from(delivery: &Value) -> Self {
        let take = |key: &str| delivery.get(key).filter(|v| !v.is_null()).cloned();
        let page = |key: &str| {
            delivery
                .get("page")
                .and_then(|p| p.get(key))
                .filter(|v| !v.is_null())
                .cloned()
        };
        Self {
            id: take("id"),
            title: take("title"),
            status: take("status"),
            changed_at: take("changed_at"),
            difference: take("difference"),
            human_difference: take("human_difference"),
            page_url: page("url"),
            page_name: page("name"),
            page_link: page("link"),
            contents: take("contents"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

pub struct PageCrawlTrigger {
    config: TriggerConfig,
    webhook_url: String,
    http: Arc<dyn HttpClient>,
    store: Arc<dyn StaticDataStore>,
}

impl std::fmt::Debug for PageCrawlTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCrawlTrigger")
            .field("config", &self.config)
            .field("webhook_url", &self.webhook_url)
            .finish_non_exhaustive()
    }
}

impl PageCrawlTrigger {
    pub fn new(
        config: TriggerConfig,
        webhook_url: impl Into<String>,
        http: Arc<dyn HttpClient>,
        store: Arc<dyn StaticDataStore>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        Ok(Self {
            config,
            webhook_url: webhook_url.into(),
            http,
            store,
        })
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// The cached webhook id, if any.
    pub async fn cached_id(&self) -> Result<Option<String>, NodeError> {
        Ok(self
            .store
            .get(WEBHOOK_ID_KEY)
            .await?
            .filter(|id| !is_falsy(id))
            .map(|id| scalar_string(&id)))
    }

    /// Whether the cached webhook is still registered for our callback URL.
    ///
    /// Every failure reads as "does not exist" so the caller re-registers.
    #[instrument(skip(self), fields(webhook_url = %self.webhook_url))]
    pub async fn check_exists(&self) -> bool {
        let id = match self.cached_id().await {
            Ok(Some(id)) => id,
            Ok(None) => return false,
            Err(err) => {
                warn!(error = %err, "could not read cached webhook id");
                return false;
            }
        };

        let hooks = match self.http.request(ApiRequest::get("/api/hooks")).await {
            Ok(response) => ListEnvelope::parse(response.into_json(), &["hooks"])
                .map(ListEnvelope::into_items)
                .unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "webhook lookup failed");
                return false;
            }
        };

        let exists = hooks.iter().any(|hook| {
            hook.get("id").map(scalar_string).as_deref() == Some(id.as_str())
                && hook.get("target_url").and_then(Value::as_str) == Some(self.webhook_url.as_str())
        });
        debug!(webhook_id = %id, exists, "checked webhook registration");
        exists
    }

    /// Body sent to `POST /api/hooks`.
    pub fn registration_body(&self) -> Value {
        let mut body = json!({
            "target_url": self.webhook_url,
            "event_type": EVENT_TYPE,
        });
        if !self.config.workspace.is_empty() {
            body["workspace_id"] = json!(self.config.workspace.value.trim());
        }
        if !self.config.page.is_empty() {
            body["change_id"] = json!(self.config.page.value.trim());
        }
        let fields = self.config.requested_fields();
        if !fields.is_empty() {
            body["payload_fields"] = json!(fields);
        }
        body
    }

    /// Register the webhook and cache its id. Returns the id.
    #[instrument(skip(self), fields(webhook_url = %self.webhook_url))]
    pub async fn create(&self) -> Result<String, NodeError> {
        let request = ApiRequest::post("/api/hooks").with_body(self.registration_body());
        let response = self
            .http
            .request(request)
            .await
            .map_err(|err| create_failed(&err.user_message()))?
            .into_json();

        let id = response
            .get("id")
            .filter(|id| !is_falsy(id))
            .cloned()
            .ok_or_else(|| create_failed("Failed to create webhook"))?;
        self.store.set(WEBHOOK_ID_KEY, id.clone()).await?;

        let id = scalar_string(&id);
        info!(webhook_id = %id, "webhook registered");

        if self.config.send_test_on_listen {
            let test = ApiRequest::put(format!("/api/hooks/{id}/test"));
            if let Err(err) = self.http.request(test).await {
                warn!(webhook_id = %id, error = %err, "test delivery failed");
            }
        }
        Ok(id)
    }

    /// Deregister the cached webhook. A webhook that is already gone counts
    /// as deleted; the cached id is cleared whatever the outcome.
    #[instrument(skip(self))]
    pub async fn delete(&self) -> Result<(), NodeError> {
        let Some(id) = self.cached_id().await? else {
            return Ok(());
        };

        let outcome = self
            .http
            .request(ApiRequest::delete(format!("/api/hooks/{id}")))
            .await;
        let cleared = self.store.remove(WEBHOOK_ID_KEY).await;

        match outcome {
            Ok(_) => info!(webhook_id = %id, "webhook deleted"),
            Err(err) if err.is_not_found() => {
                info!(webhook_id = %id, "webhook already gone")
            }
            Err(err) => {
                return Err(NodeError::Webhook(format!(
                    "Failed to delete PageCrawl webhook: {}",
                    err.user_message()
                )))
            }
        }
        cleared
    }

    /// Turn one inbound delivery into output items: none when its event kind
    /// is not in the allowlist, otherwise exactly one.
    pub fn handle_delivery(&self, delivery: Value) -> Result<Vec<Item>, NodeError> {
        let event = DeliveryEvent::of(&delivery);
        if !self.config.events.contains(&event) {
            debug!(?event, "delivery filtered out");
            return Ok(Vec::new());
        }

        let json = if self.config.simplify_output {
            serde_json::to_value(SimplifiedDelivery::from(&delivery))
                .map_err(|err| NodeError::UnexpectedResponse(err.to_string()))?
        } else {
            delivery
        };
        Ok(vec![Item::new(json)])
    }
}

fn create_failed(reason: &str) -> NodeError {
    NodeError::Webhook(format!("Failed to create PageCrawl webhook: {reason}"))
}
