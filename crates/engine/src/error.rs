//! Engine-level error types.

use nodes::NodeError;
use thiserror::Error;

/// Errors produced while executing a batch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An item failed and the execution does not continue on failure; the
    /// whole batch is aborted and no partial output is returned.
    #[error("item {index} failed: {source}")]
    ItemFailed {
        index: usize,
        #[source]
        source: NodeError,
    },
}

impl EngineError {
    /// The node error behind this failure.
    pub fn node_error(&self) -> &NodeError {
        match self {
            Self::ItemFailed { source, .. } => source,
        }
    }

    /// Index of the input item that aborted the batch.
    pub fn item_index(&self) -> usize {
        match self {
            Self::ItemFailed { index, .. } => *index,
        }
    }
}
