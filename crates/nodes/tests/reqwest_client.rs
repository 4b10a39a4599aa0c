//! `ReqwestClient` against a local mock server.

use httpmock::prelude::*;
use nodes::http::ReqwestClient;
use nodes::pagecrawl::{test_credentials, Credentials, PageCrawlNode};
use nodes::NodeError;
use nodes::{ApiRequest, ApiResponse, ExecutableNode, ExecutionContext, HttpClient, Item, ResponseFormat};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn sends_bearer_token_query_and_json_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/pages/42")
                .header("authorization", "Bearer secret-token")
                .query_param("simple", "1")
                .json_body(json!({ "name": "Renamed" }));
            then.status(200).json_body(json!({ "id": 42, "name": "Renamed" }));
        })
        .await;

    let client = ReqwestClient::new(format!("{}/", server.base_url()), "secret-token").unwrap();
    let response = client
        .request(
            ApiRequest::put("/api/pages/42")
                .with_query("simple", 1)
                .with_body(json!({ "name": "Renamed" })),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response, ApiResponse::Json(json!({ "id": 42, "name": "Renamed" })));
}

#[tokio::test]
async fn error_status_keeps_server_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/pages/missing");
            then.status(404).json_body(json!({ "message": "Page not found" }));
        })
        .await;

    let client = ReqwestClient::new(server.base_url(), "t").unwrap();
    let err = client
        .request(ApiRequest::get("/api/pages/missing"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.status_code, Some(404));
    assert_eq!(err.user_message(), "Page not found");
}

#[tokio::test]
async fn empty_json_body_reads_as_null_and_binary_is_raw() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/pages/7");
            then.status(204);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/pages/7/checks/latest/screenshot");
            then.status(200)
                .header("content-type", "image/png")
                .body(b"\x89PNG\r\n".as_slice());
        })
        .await;

    let client = ReqwestClient::new(server.base_url(), "t").unwrap();
    let deleted = client.request(ApiRequest::delete("/api/pages/7")).await.unwrap();
    assert_eq!(deleted, ApiResponse::Json(serde_json::Value::Null));

    let image = client
        .request(
            ApiRequest::get("/api/pages/7/checks/latest/screenshot")
                .with_format(ResponseFormat::Binary),
        )
        .await
        .unwrap();
    assert_eq!(image.into_bytes().as_ref(), b"\x89PNG\r\n");
}

#[tokio::test]
async fn credential_test_hits_user_endpoint() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/user")
                .header("authorization", "Bearer good");
            then.status(200).json_body(json!({ "id": 1, "email": "ops@example.com" }));
        })
        .await;

    let client = Credentials::new("good")
        .with_base_url(server.base_url())
        .client()
        .unwrap();
    let user = test_credentials(&client).await.unwrap();

    mock.assert_async().await;
    assert_eq!(user["email"], "ops@example.com");
}

#[tokio::test]
async fn node_runs_end_to_end_over_http() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/pages/abc");
            then.status(200).json_body(json!({ "id": 3, "slug": "abc" }));
        })
        .await;

    let client = Arc::new(ReqwestClient::new(server.base_url(), "t").unwrap());
    let ctx = ExecutionContext::new(Uuid::nil(), client);
    let item = Item::new(json!({
        "resource": "page",
        "operation": "get",
        "pageId": { "mode": "slug", "value": "abc" },
        "options": {}
    }));

    let out = PageCrawlNode::new().execute(0, &item, &ctx).await.unwrap();

    mock.assert_async().await;
    assert_eq!(out, vec![Item::new(json!({ "id": 3, "slug": "abc" }))]);
}

#[tokio::test]
async fn plain_text_success_still_acknowledges_delete() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/pages/9");
            then.status(200).body("OK");
        })
        .await;

    let client = Arc::new(ReqwestClient::new(server.base_url(), "t").unwrap());
    let raw = client.request(ApiRequest::delete("/api/pages/9")).await.unwrap();
    assert_eq!(raw, ApiResponse::Text("OK".into()));

    let ctx = ExecutionContext::new(Uuid::nil(), client);
    let item = Item::new(json!({ "operation": "delete", "pageId": "9" }));
    let out = PageCrawlNode::new().execute(0, &item, &ctx).await.unwrap();

    mock.assert_hits_async(2).await;
    assert_eq!(out, vec![Item::new(json!({ "success": true, "deleted": "9" }))]);
}

#[tokio::test]
async fn plain_text_error_body_keeps_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/pages/9/check");
            then.status(503).body("Service Unavailable");
        })
        .await;

    let client = Arc::new(ReqwestClient::new(server.base_url(), "t").unwrap());
    let ctx = ExecutionContext::new(Uuid::nil(), client);
    let item = Item::new(json!({ "operation": "runCheckNow", "pageId": "9" }));
    let err = PageCrawlNode::new().execute(0, &item, &ctx).await.unwrap_err();

    assert!(matches!(err, NodeError::Http(ref http) if http.status_code == Some(503)));
}
