//! Request normalisation: one item's parameter bag in, one well-formed
//! [`ApiRequest`] out, plus a note on how the answer must be presented.
//!
//! Everything here is pure. The only failures are user-input errors
//! (malformed JSON text, missing or out-of-range parameters); nothing in
//! this module touches the network.

use std::str::FromStr;

use serde_json::{json, Map, Value};

use super::params::{flatten_collection, is_falsy, Params};
use super::types::{is_known_frequency, is_payload_field};
use crate::{ApiRequest, NodeError, ResponseFormat};

/// Page size used when a list is not fetched in full and no limit was set.
pub const DEFAULT_LIST_LIMIT: u64 = 50;

/// Sentinel check id meaning "most recent check".
pub const LATEST_CHECK: &str = "latest";

/// Reference fields where `0` or empty means "unset".
pub const REFERENCE_FIELDS: [&str; 4] = ["folder_id", "template_id", "auth_id", "workspace_id"];

/// Repeatable groups and the singular key their form wrapper uses.
const COLLECTION_FIELDS: [(&str, &str); 3] =
    [("elements", "element"), ("actions", "action"), ("rules", "rule")];

/// Fields that may arrive as JSON text.
const JSON_FIELDS: [&str; 4] = ["elements", "actions", "rules", "headers"];

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOperation {
    GetAll,
    Get,
    Create,
    CreateSimple,
    Update,
    Delete,
    RunCheckNow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOperation {
    GetHistory,
    GetDiffImage,
    GetDiffHtml,
    GetDiffMarkdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotOperation {
    GetLatest,
    GetLatestDiff,
    GetCheckScreenshot,
    GetCheckDiff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOperation {
    GetAll,
    Create,
    Update,
    Delete,
    Test,
}

/// A resolved (resource, operation) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Page(PageOperation),
    Check(CheckOperation),
    Screenshot(ScreenshotOperation),
    Webhook(WebhookOperation),
}

impl Operation {
    pub fn parse(resource: &str, operation: &str) -> Result<Self, NodeError> {
        let op = match (resource, operation) {
            ("page", "getAll") => Self::Page(PageOperation::GetAll),
            ("page", "get") => Self::Page(PageOperation::Get),
            ("page", "create") => Self::Page(PageOperation::Create),
            ("page", "createSimple") => Self::Page(PageOperation::CreateSimple),
            ("page", "update") => Self::Page(PageOperation::Update),
            ("page", "delete") => Self::Page(PageOperation::Delete),
            ("page", "runCheckNow") => Self::Page(PageOperation::RunCheckNow),
            ("check", "getHistory") => Self::Check(CheckOperation::GetHistory),
            ("check", "getDiffImage") => Self::Check(CheckOperation::GetDiffImage),
            ("check", "getDiffHtml") => Self::Check(CheckOperation::GetDiffHtml),
            ("check", "getDiffMarkdown") => Self::Check(CheckOperation::GetDiffMarkdown),
            ("screenshot", "getLatest") => Self::Screenshot(ScreenshotOperation::GetLatest),
            ("screenshot", "getLatestDiff") => Self::Screenshot(ScreenshotOperation::GetLatestDiff),
            ("screenshot", "getCheckScreenshot") => {
                Self::Screenshot(ScreenshotOperation::GetCheckScreenshot)
            }
            ("screenshot", "getCheckDiff") => Self::Screenshot(ScreenshotOperation::GetCheckDiff),
            ("webhook", "getAll") => Self::Webhook(WebhookOperation::GetAll),
            ("webhook", "create") => Self::Webhook(WebhookOperation::Create),
            ("webhook", "update") => Self::Webhook(WebhookOperation::Update),
            ("webhook", "delete") => Self::Webhook(WebhookOperation::Delete),
            ("webhook", "test") => Self::Webhook(WebhookOperation::Test),
            _ => {
                return Err(NodeError::UnknownOperation {
                    resource: resource.to_string(),
                    operation: operation.to_string(),
                })
            }
        };
        Ok(op)
    }
}

impl FromStr for Operation {
    type Err = NodeError;

    /// Parses `resource:operation`, e.g. `page:getAll`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, operation) = s.split_once(':').unwrap_or(("page", s));
        Self::parse(resource, operation)
    }
}

// ---------------------------------------------------------------------------
// Planned request
// ---------------------------------------------------------------------------

/// How a successful answer becomes output items.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputShape {
    /// The answer as-is; arrays fan out into one item per element.
    Passthrough,
    /// A list answer (bare or enveloped), truncated to `limit` when set.
    List { limit: Option<usize> },
    /// The server body only signals success; emit this fixed body instead.
    Acknowledge(Value),
    /// Text answer wrapped as `{<key>: text, pageId, checkId}`.
    Wrap {
        key: &'static str,
        page_id: String,
        check_id: String,
    },
    /// Binary answer emitted as a named attachment.
    Attachment {
        file_name: String,
        mime_type: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRequest {
    pub request: ApiRequest,
    pub output: OutputShape,
}

impl PlannedRequest {
    fn new(request: ApiRequest, output: OutputShape) -> Self {
        Self { request, output }
    }

    fn passthrough(request: ApiRequest) -> Self {
        Self::new(request, OutputShape::Passthrough)
    }
}

/// Plan the request for one item.
pub fn plan_request(
    operation: Operation,
    params: Params<'_>,
    item_index: usize,
) -> Result<PlannedRequest, NodeError> {
    match operation {
        Operation::Page(op) => plan_page(op, params, item_index),
        Operation::Check(op) => plan_check(op, params),
        Operation::Screenshot(op) => plan_screenshot(op, params),
        Operation::Webhook(op) => plan_webhook(op, params),
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

fn plan_page(
    op: PageOperation,
    params: Params<'_>,
    item_index: usize,
) -> Result<PlannedRequest, NodeError> {
    match op {
        PageOperation::GetAll => {
            let options = params.object("options");
            let mut request = ApiRequest::get("/api/pages");
            if options.flag("simple") {
                request = request.with_query("simple", 1);
            }
            if let Some(take) = positive(options.u64("take")?) {
                request = request.with_query("take", take);
            }
            if let Some(folder) = options.str("folder") {
                request = request.with_query("folder", folder);
            }
            let limit = list_limit(params)?;
            if let Some(limit) = limit {
                request = request.with_query("limit", limit);
            }
            Ok(PlannedRequest::new(request, OutputShape::List { limit }))
        }

        PageOperation::Get => {
            let page_id = params.locator_value("pageId")?;
            let options = params.object("options");
            let mut request =
                ApiRequest::get(format!("/api/pages/{}", segment("pageId", &page_id)?));
            if options.flag("simple") {
                request = request.with_query("simple", 1);
            }
            if let Some(take) = positive(options.u64("take")?) {
                request = request.with_query("take", take);
            }
            Ok(PlannedRequest::passthrough(request))
        }

        PageOperation::Delete => {
            let page_id = params.locator_value("pageId")?;
            let request =
                ApiRequest::delete(format!("/api/pages/{}", segment("pageId", &page_id)?));
            Ok(PlannedRequest::new(
                request,
                OutputShape::Acknowledge(json!({ "success": true, "deleted": page_id })),
            ))
        }

        PageOperation::RunCheckNow => {
            let page_id = params.locator_value("pageId")?;
            let mut request = ApiRequest::put(format!(
                "/api/pages/{}/check",
                segment("pageId", &page_id)?
            ));
            if params.object("runCheckOptions").flag("skip_first_notification") {
                request = request.with_query("skip_first_notification", 1);
            }
            Ok(PlannedRequest::new(
                request,
                OutputShape::Acknowledge(json!({
                    "success": true,
                    "message": "Check triggered",
                    "pageId": page_id,
                })),
            ))
        }

        PageOperation::CreateSimple => {
            let extra = params.object("additionalFields");
            let mut body = Map::new();
            body.insert("url".into(), json!(params.required_str("url")?));
            if let Some(name) = params.str("name") {
                body.insert("name".into(), json!(name));
            }
            body.insert("elements".into(), json!([simple_element(params)]));
            if let Some(frequency) = frequency(extra, "frequency")? {
                body.insert("frequency".into(), json!(frequency));
            }
            if let Some(ignore) = extra.bool("ignore_duplicates") {
                body.insert("ignore_duplicates".into(), json!(ignore));
            }
            let request = ApiRequest::post("/api/track-simple").with_body(Value::Object(body));
            Ok(PlannedRequest::passthrough(request))
        }

        PageOperation::Create => {
            let mut body = Map::new();
            body.insert("url".into(), json!(params.required_str("url")?));
            body.insert("name".into(), json!(params.required_str("name")?));
            let frequency = frequency(params, "frequency")?
                .ok_or_else(|| NodeError::invalid_parameter("frequency", "a value is required"))?;
            body.insert("frequency".into(), json!(frequency));
            body.insert(
                "elements".into(),
                params.raw("elements").cloned().unwrap_or(Value::Null),
            );
            body.extend(params.object_map("additionalFields"));

            normalize_page_body(&mut body, item_index)?;
            check_body_frequency(&body)?;
            match body.get("elements") {
                Some(Value::Array(elements)) if !elements.is_empty() => {}
                _ => {
                    return Err(NodeError::invalid_parameter(
                        "elements",
                        "at least one element is required",
                    ))
                }
            }

            let request = ApiRequest::post("/api/pages").with_body(Value::Object(body));
            Ok(PlannedRequest::passthrough(request))
        }

        PageOperation::Update => {
            let page_id = params.locator_value("pageId")?;
            let mut body = params.object_map("updateFields");
            body.extend(params.object_map("additionalFields"));

            normalize_page_body(&mut body, item_index)?;
            check_body_frequency(&body)?;

            let request = ApiRequest::put(format!("/api/pages/{}", segment("pageId", &page_id)?))
                .with_body(Value::Object(body));
            Ok(PlannedRequest::passthrough(request))
        }
    }
}

/// The single element `createSimple` tracks.
///
/// Without an explicit tracking type, a selector means text tracking and no
/// selector means the full page.
fn simple_element(params: Params<'_>) -> Value {
    let extra = params.object("additionalFields");
    let selector = extra.str("selector").or_else(|| params.str("selector"));
    let tracking_type = extra
        .str("trackingType")
        .or_else(|| params.str("trackingType"))
        .unwrap_or_else(|| {
            let default = if selector.is_some() { "text" } else { "fullpage" };
            default.to_string()
        });

    let mut element = Map::new();
    element.insert("type".into(), json!(tracking_type));
    if let Some(selector) = selector {
        element.insert("selector".into(), json!(selector));
    }
    Value::Object(element)
}

/// Apply the page body pipeline in place.
///
/// Steps, in order: split comma-separated `tags`; unwrap reference-field
/// locators and drop unset ones; flatten repeatable groups; parse JSON text
/// fields; enable rules when any are present. Running it on an already
/// normalised body changes nothing.
pub fn normalize_page_body(
    body: &mut Map<String, Value>,
    item_index: usize,
) -> Result<(), NodeError> {
    if let Some(Value::String(tags)) = body.get("tags") {
        let tags = split_tags(tags);
        body.insert("tags".into(), tags);
    }

    for field in REFERENCE_FIELDS {
        let unwrapped = match body.get(field) {
            Some(Value::Object(locator)) => {
                Some(locator.get("value").cloned().unwrap_or(Value::Null))
            }
            _ => None,
        };
        if let Some(value) = unwrapped {
            body.insert(field.into(), value);
        }
        if body.get(field).is_some_and(is_falsy) {
            body.remove(field);
        }
    }

    for (field, item_key) in COLLECTION_FIELDS {
        let flattened = match body.get(field) {
            Some(group @ (Value::Object(_) | Value::Array(_))) => {
                Some(flatten_collection(group.clone(), item_key))
            }
            _ => None,
        };
        if let Some(list) = flattened {
            body.insert(field.into(), list);
        }
    }

    for field in JSON_FIELDS {
        let text = match body.get(field) {
            Some(Value::String(text)) => text.clone(),
            _ => continue,
        };
        if text.trim().is_empty() {
            body.remove(field);
            continue;
        }
        let parsed = serde_json::from_str::<Value>(&text).map_err(|_| NodeError::InvalidJson {
            field: field.to_string(),
            item_index,
        })?;
        body.insert(field.into(), parsed);
    }

    if matches!(body.get("rules"), Some(Value::Array(rules)) if !rules.is_empty()) {
        body.insert("rules_enabled".into(), Value::Bool(true));
    }

    Ok(())
}

/// `"a, b ,,c"` → `["a","b","c"]`.
pub fn split_tags(tags: &str) -> Value {
    Value::Array(
        tags.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(|tag| Value::String(tag.to_string()))
            .collect(),
    )
}

fn frequency(params: Params<'_>, name: &str) -> Result<Option<u64>, NodeError> {
    match params.u64(name)? {
        Some(minutes) if !is_known_frequency(minutes) => Err(NodeError::invalid_parameter(
            name,
            format!("{minutes} is not a supported check frequency in minutes"),
        )),
        other => Ok(other),
    }
}

fn check_body_frequency(body: &Map<String, Value>) -> Result<(), NodeError> {
    frequency(Params::new(body), "frequency").map(|_| ())
}

fn positive(value: Option<u64>) -> Option<u64> {
    value.filter(|v| *v > 0)
}

fn list_limit(params: Params<'_>) -> Result<Option<usize>, NodeError> {
    if params.bool("returnAll").unwrap_or(true) {
        return Ok(None);
    }
    match params.u64("limit")?.unwrap_or(DEFAULT_LIST_LIMIT) {
        0 => Err(NodeError::invalid_parameter("limit", "must be at least 1")),
        limit => Ok(Some(limit as usize)),
    }
}

// ---------------------------------------------------------------------------
// Checks and screenshots
// ---------------------------------------------------------------------------

/// A user-supplied identifier as exactly one URL path segment.
fn segment(name: &str, value: &str) -> Result<String, NodeError> {
    if value == "." || value == ".." {
        return Err(NodeError::invalid_parameter(name, "not a valid identifier"));
    }
    Ok(urlencoding::encode(value).into_owned())
}

fn check_id(params: Params<'_>) -> String {
    params.str("checkId").unwrap_or_else(|| LATEST_CHECK.to_string())
}

fn plan_check(op: CheckOperation, params: Params<'_>) -> Result<PlannedRequest, NodeError> {
    let page_id = params.locator_value("pageId")?;
    let check_id = check_id(params);
    let page_segment = segment("pageId", &page_id)?;
    let base = format!(
        "/api/pages/{page_segment}/checks/{}",
        segment("checkId", &check_id)?
    );

    let planned = match op {
        CheckOperation::GetHistory => {
            let options = params.object("options");
            let mut request = ApiRequest::get(format!("/api/pages/{page_segment}/history"));
            // Simplified history unless the caller opts into the full payload.
            if !options.flag("advanced") {
                request = request.with_query("simple", 1);
            }
            if let Some(take) = positive(options.u64("take")?) {
                request = request.with_query("take", take);
            }
            PlannedRequest::passthrough(request)
        }
        CheckOperation::GetDiffImage => PlannedRequest::new(
            ApiRequest::get(format!("{base}/diff.png")).with_format(ResponseFormat::Binary),
            OutputShape::Attachment {
                file_name: format!("diff-{page_id}-{check_id}.png"),
                mime_type: "image/png",
            },
        ),
        CheckOperation::GetDiffHtml => PlannedRequest::new(
            ApiRequest::get(format!("{base}/diff.html"))
                .with_header("Accept", "text/html")
                .with_format(ResponseFormat::Text),
            OutputShape::Wrap {
                key: "html",
                page_id,
                check_id,
            },
        ),
        CheckOperation::GetDiffMarkdown => PlannedRequest::new(
            ApiRequest::get(format!("{base}/diff.markdown"))
                .with_header("Accept", "text/markdown")
                .with_format(ResponseFormat::Text),
            OutputShape::Wrap {
                key: "markdown",
                page_id,
                check_id,
            },
        ),
    };
    Ok(planned)
}

fn plan_screenshot(
    op: ScreenshotOperation,
    params: Params<'_>,
) -> Result<PlannedRequest, NodeError> {
    let page_id = params.locator_value("pageId")?;
    let (check_id, is_diff) = match op {
        ScreenshotOperation::GetLatest => (LATEST_CHECK.to_string(), false),
        ScreenshotOperation::GetLatestDiff => (LATEST_CHECK.to_string(), true),
        ScreenshotOperation::GetCheckScreenshot => (check_id(params), false),
        ScreenshotOperation::GetCheckDiff => (check_id(params), true),
    };

    let kind = if is_diff { "diff" } else { "screenshot" };
    let path = format!(
        "/api/pages/{}/checks/{}/{kind}",
        segment("pageId", &page_id)?,
        segment("checkId", &check_id)?
    );
    let mut request = ApiRequest::get(path).with_format(ResponseFormat::Binary);
    if !is_diff && params.flag("previous") {
        request = request.with_query("previous", 1);
    }

    let file_name = if is_diff {
        format!("diff-{page_id}-{check_id}.png")
    } else {
        format!("screenshot-{page_id}.png")
    };
    Ok(PlannedRequest::new(
        request,
        OutputShape::Attachment {
            file_name,
            mime_type: "image/png",
        },
    ))
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

fn plan_webhook(op: WebhookOperation, params: Params<'_>) -> Result<PlannedRequest, NodeError> {
    match op {
        WebhookOperation::GetAll => {
            let limit = list_limit(params)?;
            Ok(PlannedRequest::new(
                ApiRequest::get("/api/hooks"),
                OutputShape::List { limit },
            ))
        }

        WebhookOperation::Create => {
            let extra = params.object("additionalFields");
            let mut body = Map::new();
            body.insert("target_url".into(), json!(params.required_str("target_url")?));
            if let Some(change_id) = extra.str("change_id") {
                body.insert("change_id".into(), json!(change_id));
            }
            if let Some(fields) = payload_fields(extra)? {
                body.insert("payload_fields".into(), json!(fields));
            }
            Ok(PlannedRequest::passthrough(
                ApiRequest::post("/api/hooks").with_body(Value::Object(body)),
            ))
        }

        WebhookOperation::Update => {
            let webhook_id = segment("webhookId", &params.required_str("webhookId")?)?;
            let fields = params.object("updateFields");
            let mut body = Map::new();
            if let Some(active) = fields.bool("is_active") {
                body.insert("is_active".into(), json!(active));
            }
            if let Some(change_id) = fields.str("change_id") {
                body.insert("change_id".into(), json!(change_id));
            }
            if let Some(selected) = payload_fields(fields)? {
                body.insert("payload_fields".into(), json!(selected));
            }
            if let Some(target_url) = fields.str("target_url") {
                body.insert("target_url".into(), json!(target_url));
            }
            Ok(PlannedRequest::passthrough(
                ApiRequest::put(format!("/api/hooks/{webhook_id}")).with_body(Value::Object(body)),
            ))
        }

        WebhookOperation::Delete => {
            let webhook_id = params.required_str("webhookId")?;
            Ok(PlannedRequest::new(
                ApiRequest::delete(format!("/api/hooks/{}", segment("webhookId", &webhook_id)?)),
                OutputShape::Acknowledge(json!({ "success": true, "deleted": webhook_id })),
            ))
        }

        WebhookOperation::Test => {
            let webhook_id = segment("webhookId", &params.required_str("webhookId")?)?;
            Ok(PlannedRequest::passthrough(ApiRequest::put(format!(
                "/api/hooks/{webhook_id}/test"
            ))))
        }
    }
}

/// `payload_fields` as a list or comma-separated text; `None` when empty.
fn payload_fields(params: Params<'_>) -> Result<Option<Vec<String>>, NodeError> {
    let selected: Vec<String> = match params.raw("payload_fields") {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(text)) => text
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    if let Some(unknown) = selected.iter().find(|f| !is_payload_field(f)) {
        return Err(NodeError::invalid_parameter(
            "payload_fields",
            format!("unknown payload field '{unknown}'"),
        ));
    }
    Ok(Some(selected).filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpMethod;

    fn plan(resource: &str, operation: &str, bag: Value) -> Result<PlannedRequest, NodeError> {
        let op = Operation::parse(resource, operation)?;
        plan_request(op, Params::from_value(&bag)?, 0)
    }

    fn body_of(planned: &PlannedRequest) -> &Map<String, Value> {
        planned
            .request
            .body
            .as_ref()
            .and_then(Value::as_object)
            .expect("request has an object body")
    }

    #[test]
    fn tags_are_split_and_trimmed() {
        let mut body = Map::new();
        body.insert("tags".into(), json!("a, b ,,c"));
        normalize_page_body(&mut body, 0).unwrap();
        assert_eq!(body["tags"], json!(["a", "b", "c"]));
    }

    #[test]
    fn unset_reference_fields_are_omitted() {
        let mut body = json!({
            "folder_id": { "mode": "list", "value": 0 },
            "template_id": { "mode": "list", "value": "" },
            "auth_id": 0,
            "workspace_id": { "mode": "id", "value": "7" }
        })
        .as_object()
        .cloned()
        .unwrap();
        normalize_page_body(&mut body, 0).unwrap();
        assert!(!body.contains_key("folder_id"));
        assert!(!body.contains_key("template_id"));
        assert!(!body.contains_key("auth_id"));
        assert_eq!(body["workspace_id"], json!("7"));
    }

    #[test]
    fn collections_and_json_text_are_normalised() {
        let mut body = json!({
            "actions": { "action": [{ "type": "click", "selector": "#go" }] },
            "rules": "[{\"type\":\"contains\",\"value\":\"sale\"}]",
            "headers": "{\"X-Test\":\"1\"}",
            "elements": "   "
        })
        .as_object()
        .cloned()
        .unwrap();
        normalize_page_body(&mut body, 0).unwrap();
        assert_eq!(body["actions"], json!([{ "type": "click", "selector": "#go" }]));
        assert_eq!(body["rules"], json!([{ "type": "contains", "value": "sale" }]));
        assert_eq!(body["headers"], json!({ "X-Test": "1" }));
        assert_eq!(body["rules_enabled"], json!(true));
        assert!(!body.contains_key("elements"));
    }

    #[test]
    fn pipeline_is_idempotent() {
        let mut body = json!({
            "tags": "x,y",
            "folder_id": { "mode": "list", "value": 3 },
            "rules": { "rule": { "type": "eq" } },
            "actions": "[{\"type\":\"wait\"}]"
        })
        .as_object()
        .cloned()
        .unwrap();
        normalize_page_body(&mut body, 0).unwrap();
        let once = body.clone();
        normalize_page_body(&mut body, 0).unwrap();
        assert_eq!(body, once);
        assert_eq!(body["folder_id"], json!(3));
        assert_eq!(body["rules_enabled"], json!(true));
    }

    #[test]
    fn malformed_json_reports_field_and_item() {
        let mut body = Map::new();
        body.insert("actions".into(), json!("[{not json"));
        let err = normalize_page_body(&mut body, 4).unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON in actions field (item 4)");
    }

    #[test]
    fn get_page_by_slug_has_no_query() {
        let planned = plan("page", "get", json!({ "pageId": { "mode": "slug", "value": "abc" } }))
            .unwrap();
        assert_eq!(planned.request.method, HttpMethod::Get);
        assert_eq!(planned.request.path, "/api/pages/abc");
        assert!(planned.request.query.is_empty());
        assert_eq!(planned.output, OutputShape::Passthrough);
    }

    #[test]
    fn get_all_builds_query_and_limit() {
        let planned = plan(
            "page",
            "getAll",
            json!({
                "returnAll": false,
                "limit": 2,
                "options": { "simple": true, "take": 5, "folder": "news" }
            }),
        )
        .unwrap();
        let keys: Vec<_> = planned.request.query.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["simple", "take", "folder", "limit"]);
        assert_eq!(planned.output, OutputShape::List { limit: Some(2) });

        let all = plan("page", "getAll", json!({})).unwrap();
        assert!(all.request.query.is_empty());
        assert_eq!(all.output, OutputShape::List { limit: None });

        let default_limit = plan("page", "getAll", json!({ "returnAll": false })).unwrap();
        assert_eq!(default_limit.request.query_value("limit"), Some("50"));

        assert!(plan("page", "getAll", json!({ "returnAll": false, "limit": 0 })).is_err());
    }

    #[test]
    fn create_sends_normalised_body() {
        let planned = plan(
            "page",
            "create",
            json!({
                "url": "https://example.com",
                "name": "Example",
                "frequency": 60,
                "elements": { "element": [{ "type": "fullpage" }] },
                "additionalFields": {
                    "tags": "news, tech",
                    "folder_id": { "mode": "list", "value": 0 },
                    "actions": "[{\"type\":\"click\"}]"
                }
            }),
        )
        .unwrap();
        assert_eq!(planned.request.method, HttpMethod::Post);
        assert_eq!(planned.request.path, "/api/pages");
        let body = body_of(&planned);
        assert_eq!(body["elements"], json!([{ "type": "fullpage" }]));
        assert_eq!(body["tags"], json!(["news", "tech"]));
        assert_eq!(body["actions"], json!([{ "type": "click" }]));
        assert_eq!(body["frequency"], json!(60));
        assert!(!body.contains_key("folder_id"));
    }

    #[test]
    fn create_rejects_unknown_frequency_and_missing_elements() {
        let bad_frequency = plan(
            "page",
            "create",
            json!({ "url": "https://a", "name": "a", "frequency": 7, "elements": [{ "type": "text" }] }),
        );
        assert!(matches!(
            bad_frequency,
            Err(NodeError::InvalidParameter { ref name, .. }) if name == "frequency"
        ));

        let no_elements = plan(
            "page",
            "create",
            json!({ "url": "https://a", "name": "a", "frequency": 60 }),
        );
        assert!(matches!(
            no_elements,
            Err(NodeError::InvalidParameter { ref name, .. }) if name == "elements"
        ));
    }

    #[test]
    fn update_merges_fields_and_normalises() {
        let planned = plan(
            "page",
            "update",
            json!({
                "pageId": { "mode": "id", "value": "42" },
                "updateFields": { "name": "Renamed", "tags": "a,b" },
                "additionalFields": { "rules": { "rule": [] } }
            }),
        )
        .unwrap();
        assert_eq!(planned.request.method, HttpMethod::Put);
        assert_eq!(planned.request.path, "/api/pages/42");
        let body = body_of(&planned);
        assert_eq!(body["name"], json!("Renamed"));
        assert_eq!(body["tags"], json!(["a", "b"]));
        assert_eq!(body["rules"], json!([]));
        assert!(!body.contains_key("rules_enabled"));
    }

    #[test]
    fn create_simple_defaults_tracking_type() {
        let fullpage = plan("page", "createSimple", json!({ "url": "https://a" })).unwrap();
        assert_eq!(fullpage.request.path, "/api/track-simple");
        assert_eq!(body_of(&fullpage)["elements"], json!([{ "type": "fullpage" }]));

        let text = plan(
            "page",
            "createSimple",
            json!({
                "url": "https://a",
                "name": "A",
                "additionalFields": { "selector": ".price", "frequency": 1440 }
            }),
        )
        .unwrap();
        let body = body_of(&text);
        assert_eq!(body["elements"], json!([{ "type": "text", "selector": ".price" }]));
        assert_eq!(body["frequency"], json!(1440));
        assert_eq!(body["name"], json!("A"));
    }

    #[test]
    fn run_check_now_and_delete_are_acknowledged() {
        let run = plan(
            "page",
            "runCheckNow",
            json!({
                "pageId": { "mode": "id", "value": "9" },
                "runCheckOptions": { "skip_first_notification": true }
            }),
        )
        .unwrap();
        assert_eq!(run.request.method, HttpMethod::Put);
        assert_eq!(run.request.path, "/api/pages/9/check");
        assert_eq!(run.request.query_value("skip_first_notification"), Some("1"));
        assert_eq!(
            run.output,
            OutputShape::Acknowledge(json!({
                "success": true,
                "message": "Check triggered",
                "pageId": "9"
            }))
        );

        let delete = plan("page", "delete", json!({ "pageId": "9" })).unwrap();
        assert_eq!(delete.request.method, HttpMethod::Delete);
        assert_eq!(
            delete.output,
            OutputShape::Acknowledge(json!({ "success": true, "deleted": "9" }))
        );
    }

    #[test]
    fn invalid_locator_is_rejected() {
        let err = plan("page", "get", json!({ "pageId": { "mode": "id", "value": "abc" } }))
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidParameter { ref name, .. } if name == "pageId"));
    }

    #[test]
    fn bare_slug_is_a_valid_page_reference() {
        let get = plan("page", "get", json!({ "pageId": "my-page" })).unwrap();
        assert_eq!(get.request.path, "/api/pages/my-page");

        let history = plan("check", "getHistory", json!({ "pageId": "my-page" })).unwrap();
        assert_eq!(history.request.path, "/api/pages/my-page/history");

        let shot = plan("screenshot", "getLatest", json!({ "pageId": "my-page" })).unwrap();
        assert_eq!(shot.request.path, "/api/pages/my-page/checks/latest/screenshot");
    }

    #[test]
    fn identifiers_stay_within_one_path_segment() {
        let listed = plan("page", "get", json!({ "pageId": { "mode": "list", "value": "a/b" } }))
            .unwrap();
        assert_eq!(listed.request.path, "/api/pages/a%2Fb");

        let diff = plan(
            "check",
            "getDiffHtml",
            json!({ "pageId": "7", "checkId": "1/../2" }),
        )
        .unwrap();
        assert_eq!(diff.request.path, "/api/pages/7/checks/1%2F..%2F2/diff.html");
        assert_eq!(
            diff.output,
            OutputShape::Wrap {
                key: "html",
                page_id: "7".into(),
                check_id: "1/../2".into(),
            }
        );

        let dots = plan("check", "getDiffMarkdown", json!({ "pageId": "7", "checkId": ".." }));
        assert!(matches!(
            dots,
            Err(NodeError::InvalidParameter { ref name, .. }) if name == "checkId"
        ));

        let hook = plan("webhook", "test", json!({ "webhookId": "x y" })).unwrap();
        assert_eq!(hook.request.path, "/api/hooks/x%20y/test");
    }

    #[test]
    fn create_and_update_normalise_shared_fields_alike() {
        let shared = json!({
            "tags": " alpha, beta ,,gamma",
            "actions": { "action": [{ "type": "click", "selector": "#accept" }] },
            "rules": "[{\"element\":0,\"type\":\"changed\"}]",
            "headers": "{\"X-Token\":\"abc\"}"
        });
        let create = plan(
            "page",
            "create",
            json!({
                "url": "https://example.com",
                "name": "Example",
                "frequency": 60,
                "elements": [{ "type": "fullpage" }],
                "additionalFields": shared.clone()
            }),
        )
        .unwrap();
        let update = plan(
            "page",
            "update",
            json!({ "pageId": "example", "updateFields": {}, "additionalFields": shared }),
        )
        .unwrap();

        let (created, updated) = (body_of(&create), body_of(&update));
        for field in ["tags", "actions", "rules", "headers", "rules_enabled"] {
            assert_eq!(created.get(field), updated.get(field), "{field} differs");
        }
        assert_eq!(created["tags"], json!(["alpha", "beta", "gamma"]));
        assert_eq!(created["headers"], json!({ "X-Token": "abc" }));
        assert_eq!(updated["rules_enabled"], json!(true));
    }

    #[test]
    fn history_is_simple_unless_advanced() {
        let simple = plan("check", "getHistory", json!({ "pageId": "3" })).unwrap();
        assert_eq!(simple.request.path, "/api/pages/3/history");
        assert_eq!(simple.request.query_value("simple"), Some("1"));

        let advanced = plan(
            "check",
            "getHistory",
            json!({ "pageId": "3", "options": { "advanced": true, "take": 10 } }),
        )
        .unwrap();
        assert_eq!(advanced.request.query_value("simple"), None);
        assert_eq!(advanced.request.query_value("take"), Some("10"));
    }

    #[test]
    fn diff_operations_pick_format_and_output() {
        let image = plan("check", "getDiffImage", json!({ "pageId": "3", "checkId": "77" })).unwrap();
        assert_eq!(image.request.path, "/api/pages/3/checks/77/diff.png");
        assert_eq!(image.request.format, ResponseFormat::Binary);
        assert_eq!(
            image.output,
            OutputShape::Attachment {
                file_name: "diff-3-77.png".into(),
                mime_type: "image/png"
            }
        );

        let html = plan("check", "getDiffHtml", json!({ "pageId": "3" })).unwrap();
        assert_eq!(html.request.path, "/api/pages/3/checks/latest/diff.html");
        assert_eq!(html.request.format, ResponseFormat::Text);
        assert!(matches!(html.output, OutputShape::Wrap { key: "html", .. }));

        let markdown = plan("check", "getDiffMarkdown", json!({ "pageId": "3" })).unwrap();
        assert!(matches!(markdown.output, OutputShape::Wrap { key: "markdown", .. }));
    }

    #[test]
    fn screenshots_use_previous_only_for_captures() {
        let latest = plan("screenshot", "getLatest", json!({ "pageId": "5", "previous": true }))
            .unwrap();
        assert_eq!(latest.request.path, "/api/pages/5/checks/latest/screenshot");
        assert_eq!(latest.request.query_value("previous"), Some("1"));
        assert!(matches!(
            latest.output,
            OutputShape::Attachment { ref file_name, .. } if file_name == "screenshot-5.png"
        ));

        let diff = plan(
            "screenshot",
            "getCheckDiff",
            json!({ "pageId": "5", "checkId": "8", "previous": true }),
        )
        .unwrap();
        assert_eq!(diff.request.path, "/api/pages/5/checks/8/diff");
        assert_eq!(diff.request.query_value("previous"), None);
    }

    #[test]
    fn webhook_create_sends_only_set_fields() {
        let bare = plan("webhook", "create", json!({ "target_url": "https://hook" })).unwrap();
        assert_eq!(bare.request.path, "/api/hooks");
        assert_eq!(bare.request.body, Some(json!({ "target_url": "https://hook" })));

        let full = plan(
            "webhook",
            "create",
            json!({
                "target_url": "https://hook",
                "additionalFields": { "change_id": "12", "payload_fields": ["id", "title"] }
            }),
        )
        .unwrap();
        assert_eq!(
            full.request.body,
            Some(json!({
                "target_url": "https://hook",
                "change_id": "12",
                "payload_fields": ["id", "title"]
            }))
        );

        let unknown = plan(
            "webhook",
            "create",
            json!({ "target_url": "https://hook", "additionalFields": { "payload_fields": "id,bogus" } }),
        );
        assert!(unknown.is_err());
    }

    #[test]
    fn webhook_lifecycle_paths() {
        let update = plan(
            "webhook",
            "update",
            json!({ "webhookId": "4", "updateFields": { "is_active": false } }),
        )
        .unwrap();
        assert_eq!(update.request.path, "/api/hooks/4");
        assert_eq!(update.request.body, Some(json!({ "is_active": false })));

        let test = plan("webhook", "test", json!({ "webhookId": "4" })).unwrap();
        assert_eq!(test.request.method, HttpMethod::Put);
        assert_eq!(test.request.path, "/api/hooks/4/test");

        let delete = plan("webhook", "delete", json!({ "webhookId": "4" })).unwrap();
        assert_eq!(
            delete.output,
            OutputShape::Acknowledge(json!({ "success": true, "deleted": "4" }))
        );
    }

    #[test]
    fn unknown_operation_is_an_error() {
        assert!(matches!(
            Operation::parse("page", "explode"),
            Err(NodeError::UnknownOperation { .. })
        ));
        assert_eq!(
            "check:getHistory".parse::<Operation>().unwrap(),
            Operation::Check(CheckOperation::GetHistory)
        );
    }
}
