//! The PageCrawl API credential: one bearer token plus an optional origin.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::http::ReqwestClient;
use crate::{ApiRequest, HttpClient, HttpError, NodeError};

pub const DEFAULT_BASE_URL: &str = "https://pagecrawl.io";

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_token: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url())
            .finish()
    }
}

impl Credentials {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Origin without trailing slash; the production origin when unset.
    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Build the authenticated client these credentials describe.
    pub fn client(&self) -> Result<ReqwestClient, HttpError> {
        ReqwestClient::new(self.base_url(), self.api_token.clone())
    }
}

/// Validate credentials with `GET /api/user`; the body must carry an `id`.
pub async fn test_credentials(http: &dyn HttpClient) -> Result<Value, NodeError> {
    let user = http.request(ApiRequest::get("/api/user")).await?.into_json();
    match user.get("id") {
        Some(id) if !id.is_null() => {
            info!(user_id = %id, "credentials accepted");
            Ok(user)
        }
        _ => Err(NodeError::Credentials(
            "the user endpoint did not return an account id".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHttpClient;
    use serde_json::json;

    #[test]
    fn base_url_defaults_and_trims() {
        assert_eq!(Credentials::new("t").base_url(), "https://pagecrawl.io");
        assert_eq!(
            Credentials::new("t").with_base_url("http://localhost:8000/").base_url(),
            "http://localhost:8000"
        );
        assert_eq!(Credentials::new("t").with_base_url("  ").base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", Credentials::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn credential_test_requires_an_id() {
        let ok = MockHttpClient::new().respond_json(json!({ "id": 9, "name": "Ada" }));
        let user = test_credentials(&ok).await.unwrap();
        assert_eq!(user["name"], "Ada");
        assert_eq!(ok.request(0).path, "/api/user");

        let anonymous = MockHttpClient::new().respond_json(json!({ "name": "Ada" }));
        assert!(matches!(
            test_credentials(&anonymous).await,
            Err(NodeError::Credentials(_))
        ));

        let rejected = MockHttpClient::new().fail(HttpError::status(401, None));
        assert_eq!(
            test_credentials(&rejected).await.unwrap_err().status_code(),
            Some(401)
        );
    }
}
