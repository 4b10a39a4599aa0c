//! The authenticated HTTP capability handed to nodes.
//!
//! Nodes never build a client themselves: they describe the call as an
//! [`ApiRequest`] and hand it to whatever [`HttpClient`] the host injected.
//! [`ReqwestClient`] is the production implementation; tests use
//! [`crate::mock::MockHttpClient`].

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const FALLBACK_ERROR_MESSAGE: &str = "An error occurred";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// How the response body should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Text,
    Binary,
}

/// A single outbound call, relative to the credential's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path including the `/api` prefix, e.g. `/api/pages/42`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub format: ResponseFormat,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            format: ResponseFormat::Json,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    /// First query value for `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl ApiResponse {
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
            Self::Binary(_) => Value::Null,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Json(Value::String(text)) | Self::Text(text) => text,
            Self::Json(value) => value.to_string(),
            Self::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Binary(bytes) => bytes,
            Self::Text(text) => Bytes::from(text),
            Self::Json(value) => Bytes::from(value.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failure of an outbound call.
///
/// `status_code` is set for non-2xx answers; `body` holds the parsed JSON
/// error body when the server sent one.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpError {
    pub status_code: Option<u16>,
    pub body: Option<Value>,
    pub message: String,
}

impl HttpError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            body: None,
            message: message.into(),
        }
    }

    pub fn status(status_code: u16, body: Option<Value>) -> Self {
        Self {
            status_code: Some(status_code),
            body,
            message: format!("Request failed with status code {status_code}"),
        }
    }

    fn body_field(&self, key: &str) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Server `message`, then server `error`, then the transport message.
    pub fn user_message(&self) -> String {
        self.body_field("message")
            .or_else(|| self.body_field("error"))
            .or_else(|| Some(self.message.as_str()).filter(|m| !m.is_empty()))
            .unwrap_or(FALLBACK_ERROR_MESSAGE)
            .to_string()
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// An HTTP client that already knows the base URL and how to authenticate.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform one call. Non-2xx answers are returned as [`HttpError`] with
    /// `status_code` set.
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, HttpError>;
}

/// Bearer-token client backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ReqwestClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pagecrawl-automation/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(map_reqwest_error)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .bearer_auth(&self.token);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let explicit_accept = request
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("accept"));
        if !explicit_accept && request.format == ResponseFormat::Json {
            builder = builder.header(ACCEPT, "application/json");
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<Value>(&text).ok();
            return Err(HttpError::status(status.as_u16(), body));
        }

        match request.format {
            ResponseFormat::Json => {
                let bytes = response.bytes().await.map_err(map_reqwest_error)?;
                if bytes.is_empty() {
                    return Ok(ApiResponse::Json(Value::Null));
                }
                // A success status is authoritative; a non-JSON body is kept as text.
                Ok(serde_json::from_slice(&bytes).map(ApiResponse::Json).unwrap_or_else(|_| {
                    ApiResponse::Text(String::from_utf8_lossy(&bytes).into_owned())
                }))
            }
            ResponseFormat::Text => response
                .text()
                .await
                .map(ApiResponse::Text)
                .map_err(map_reqwest_error),
            ResponseFormat::Binary => response
                .bytes()
                .await
                .map(ApiResponse::Binary)
                .map_err(map_reqwest_error),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        return HttpError::transport("HTTP request timed out");
    }
    HttpError::transport(err.to_string())
}
