//! API error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use engine::EngineError;
use nodes::NodeError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no trigger is listening on webhook path '{0}'")]
    UnknownWebhook(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("delivery consumer has shut down")]
    ChannelClosed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UnknownWebhook(_) => StatusCode::NOT_FOUND,
            Self::Engine(err) => node_status(err.node_error()),
            Self::Node(err) => node_status(err),
            Self::ChannelClosed => StatusCode::SERVICE_UNAVAILABLE,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Remote failures are the upstream's fault; everything else is the caller's.
fn node_status(err: &NodeError) -> StatusCode {
    match err {
        NodeError::Http(_) | NodeError::UnexpectedResponse(_) => StatusCode::BAD_GATEWAY,
        NodeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = match &self {
            Self::Engine(err) => json!({
                "error": err.node_error().user_message(),
                "statusCode": err.node_error().status_code(),
                "itemIndex": err.item_index(),
            }),
            Self::Node(err) => json!({
                "error": err.user_message(),
                "statusCode": err.status_code(),
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
