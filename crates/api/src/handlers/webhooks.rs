use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::AppState;
use crate::ApiError;

/// Hand an inbound delivery to the trigger registered on `path`.
pub async fn handle_webhook(
    Path(path): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let trigger = state
        .triggers
        .get(&path)
        .ok_or_else(|| ApiError::UnknownWebhook(path.clone()))?;

    let items = trigger.handle_delivery(payload)?;
    let received = items.len();
    info!(%path, received, "webhook delivery");

    if items.is_empty() {
        debug!(%path, "nothing to forward");
    } else if let Some(sender) = &state.deliveries {
        sender
            .send(items)
            .await
            .map_err(|_| ApiError::ChannelClosed)?;
    }

    Ok(Json(json!({ "received": received })))
}
