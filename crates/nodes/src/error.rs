//! Node-level error type.

use thiserror::Error;

use crate::http::HttpError;

/// Errors returned by a node while processing a single input item.
///
/// The engine decides what to do with them: abort the batch, or turn the
/// failure into an error item when the execution continues on failure.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// A JSON-typed parameter held text that is not valid JSON.
    #[error("Invalid JSON in {field} field (item {item_index})")]
    InvalidJson { field: String, item_index: usize },

    /// A parameter is missing or has a value outside its allowed set.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The (resource, operation) pair has no handler.
    #[error("the operation \"{operation}\" is not supported for resource \"{resource}\"")]
    UnknownOperation { resource: String, operation: String },

    /// The remote API answered with a shape the node cannot interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The stored credentials were rejected by the remote API.
    #[error("credential test failed: {0}")]
    Credentials(String),

    /// Transport failure or non-2xx answer from the remote API.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Webhook registration lifecycle failure.
    #[error("{0}")]
    Webhook(String),

    /// The static data store could not be read or written.
    #[error("static data store error: {0}")]
    Storage(String),
}

impl NodeError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Message shown to the user in error items.
    ///
    /// For remote failures this prefers what the server said over the
    /// transport's own description.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    /// HTTP status of the remote failure, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http(err) => err.status_code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_json_names_field_and_item() {
        let err = NodeError::InvalidJson { field: "actions".into(), item_index: 3 };
        assert_eq!(err.to_string(), "Invalid JSON in actions field (item 3)");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn http_errors_expose_server_message_and_status() {
        let err: NodeError =
            HttpError::status(422, Some(json!({ "message": "url is required" }))).into();
        assert_eq!(err.user_message(), "url is required");
        assert_eq!(err.status_code(), Some(422));
    }
}
