//! Batch execution engine.
//!
//! `ItemExecutor` drives one node over its input items:
//! 1. Calls the node once per item, strictly in input order.
//! 2. Stamps every produced item with the index of its source item.
//! 3. On failure either aborts the batch (returning no partial output) or,
//!    when continuing on failure, emits the node's error item in place of
//!    the failed input and moves on.

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use nodes::{ExecutableNode, ExecutionContext, Item};

use crate::{EngineError, ExecutionResult};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Turn per-item failures into error items instead of aborting.
    pub continue_on_fail: bool,
}

// ---------------------------------------------------------------------------
// ItemExecutor
// ---------------------------------------------------------------------------

/// Stateless orchestrator that runs a single batch.
#[derive(Debug, Clone, Default)]
pub struct ItemExecutor {
    config: ExecutorConfig,
}

impl ItemExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `node` over `items` and collect the output.
    ///
    /// # Errors
    /// Returns [`EngineError::ItemFailed`] for the first failing item when
    /// the executor does not continue on failure.
    #[instrument(
        skip_all,
        fields(
            workflow_id = %ctx.workflow_id,
            execution_id = %ctx.execution_id,
            items = items.len(),
        )
    )]
    pub async fn run(
        &self,
        node: &dyn ExecutableNode,
        items: &[Item],
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult, EngineError> {
        let started_at = Utc::now();
        let mut output = Vec::with_capacity(items.len());
        let mut failed_items = 0;

        for (index, item) in items.iter().enumerate() {
            match node.execute(index, item, ctx).await {
                Ok(produced) => {
                    info!(item = index, produced = produced.len(), "item succeeded");
                    output.extend(produced.into_iter().map(|out| out.paired(index)));
                }

                Err(err) if self.config.continue_on_fail => {
                    warn!(item = index, error = %err, "item failed, continuing");
                    failed_items += 1;
                    output.push(Item::new(node.error_item(item, &err)).paired(index));
                }

                Err(err) => {
                    error!(item = index, error = %err, "item failed, aborting execution");
                    return Err(EngineError::ItemFailed { index, source: err });
                }
            }
        }

        info!(
            produced = output.len(),
            failed_items,
            "execution {} finished",
            ctx.execution_id
        );

        Ok(ExecutionResult {
            execution_id: ctx.execution_id,
            items: output,
            failed_items,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
