//! `PageCrawlNode`: the action node that routes each item to one API call.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::normalize::{plan_request, Operation, OutputShape};
use super::params::{ListEnvelope, Params};
use crate::{ApiResponse, BinaryData, ExecutableNode, ExecutionContext, Item, NodeError};

const DEFAULT_RESOURCE: &str = "page";

/// The PageCrawl action node.
///
/// Node-level `parameters` are the defaults; each item's JSON object is laid
/// over them, so an item may carry its own `resource`, `operation` and
/// operation parameters.
#[derive(Debug, Clone, Default)]
pub struct PageCrawlNode {
    parameters: Map<String, Value>,
}

impl PageCrawlNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(parameters: Map<String, Value>) -> Self {
        Self { parameters }
    }

    /// The parameter bag in effect for `item`.
    pub fn resolve(&self, item: &Item) -> Map<String, Value> {
        let mut bag = self.parameters.clone();
        if let Value::Object(overrides) = &item.json {
            bag.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        bag
    }

    fn resource_and_operation(bag: &Map<String, Value>) -> (String, String) {
        let params = Params::new(bag);
        (
            params.str("resource").unwrap_or_else(|| DEFAULT_RESOURCE.to_string()),
            params.str("operation").unwrap_or_default(),
        )
    }
}

#[async_trait]
impl ExecutableNode for PageCrawlNode {
    async fn execute(
        &self,
        index: usize,
        item: &Item,
        ctx: &ExecutionContext,
    ) -> Result<Vec<Item>, NodeError> {
        let bag = self.resolve(item);
        let (resource, operation) = Self::resource_and_operation(&bag);
        let op = Operation::parse(&resource, &operation)?;
        info!(item = index, %resource, %operation, "dispatching");
        let planned = plan_request(op, Params::new(&bag), index)?;
        debug!(
            method = %planned.request.method,
            path = %planned.request.path,
            query = ?planned.request.query,
            "normalized request"
        );
        let response = ctx.http.request(planned.request).await?;
        shape_output(planned.output, response)
    }

    fn error_item(&self, item: &Item, error: &NodeError) -> Value {
        let (resource, operation) = Self::resource_and_operation(&self.resolve(item));
        json!({
            "error": error.user_message(),
            "statusCode": error.status_code(),
            "resource": resource,
            "operation": operation,
        })
    }
}

/// Turn a successful answer into output items.
pub fn shape_output(shape: OutputShape, response: ApiResponse) -> Result<Vec<Item>, NodeError> {
    let items = match shape {
        OutputShape::Passthrough => fan_out(response.into_json()),

        OutputShape::List { limit } => {
            let body = response.into_json();
            if !is_list_response(&body) {
                return Ok(fan_out(body));
            }
            let mut values = ListEnvelope::parse(body, &[])
                .map(ListEnvelope::into_items)
                .unwrap_or_default();
            if let Some(limit) = limit {
                values.truncate(limit);
            }
            values.into_iter().map(Item::new).collect()
        }

        OutputShape::Acknowledge(body) => vec![Item::new(body)],

        OutputShape::Wrap {
            key,
            page_id,
            check_id,
        } => {
            let mut body = Map::new();
            body.insert(key.to_string(), Value::String(response.into_text()));
            body.insert("pageId".into(), Value::String(page_id));
            body.insert("checkId".into(), Value::String(check_id));
            vec![Item::new(Value::Object(body))]
        }

        OutputShape::Attachment {
            file_name,
            mime_type,
        } => {
            let data = match response {
                ApiResponse::Binary(bytes) => bytes,
                other => {
                    return Err(NodeError::UnexpectedResponse(format!(
                        "expected binary content for {file_name}, got {}",
                        kind_of(&other)
                    )))
                }
            };
            vec![Item::attachment(BinaryData::new(data, file_name, mime_type))]
        }
    };
    Ok(items)
}

fn is_list_response(body: &Value) -> bool {
    body.is_array() || body.get("data").is_some_and(Value::is_array)
}

/// Arrays become one item per element; `null` becomes one empty item.
fn fan_out(body: Value) -> Vec<Item> {
    match body {
        Value::Array(values) => values.into_iter().map(Item::new).collect(),
        Value::Null => vec![Item::new(Value::Object(Map::new()))],
        other => vec![Item::new(other)],
    }
}

fn kind_of(response: &ApiResponse) -> &'static str {
    match response {
        ApiResponse::Json(_) => "JSON",
        ApiResponse::Text(_) => "text",
        ApiResponse::Binary(_) => "binary",
    }
}
