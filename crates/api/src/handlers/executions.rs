use axum::{extract::State, Json};
use tracing::info;

use engine::{ExecutionRequest, ExecutionResult, ExecutorConfig, ItemExecutor};
use nodes::pagecrawl::PageCrawlNode;
use nodes::ExecutionContext;

use super::AppState;
use crate::ApiError;

/// Run the PageCrawl node over the submitted items and return the output.
pub async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecutionRequest>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let node = PageCrawlNode::with_parameters(request.parameters);
    let executor = ItemExecutor::new(ExecutorConfig {
        continue_on_fail: request.continue_on_fail,
    });
    let ctx = ExecutionContext::new(state.workflow_id, state.http.clone());

    info!(
        execution_id = %ctx.execution_id,
        items = request.items.len(),
        "execution requested"
    );
    let result = executor.run(&node, &request.items, &ctx).await?;
    Ok(Json(result))
}
