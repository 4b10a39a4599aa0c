//! The contracts between a node and the host that runs it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{HttpClient, Item, NodeError};

/// Shared context passed to every node during execution.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Clone)]
pub struct ExecutionContext {
    /// ID of the parent workflow.
    pub workflow_id: Uuid,
    /// ID of the current execution run.
    pub execution_id: Uuid,
    /// Authenticated HTTP capability for the node's remote API.
    pub http: Arc<dyn HttpClient>,
}

impl ExecutionContext {
    pub fn new(workflow_id: Uuid, http: Arc<dyn HttpClient>) -> Self {
        Self {
            workflow_id,
            execution_id: Uuid::new_v4(),
            http,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("workflow_id", &self.workflow_id)
            .field("execution_id", &self.execution_id)
            .finish_non_exhaustive()
    }
}

/// The core node trait.
///
/// The engine calls [`ExecutableNode::execute`] once per input item, in input
/// order, and stamps the returned items with the input index.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Process the input item at `index` and return zero or more output items.
    async fn execute(
        &self,
        index: usize,
        item: &Item,
        ctx: &ExecutionContext,
    ) -> Result<Vec<Item>, NodeError>;

    /// JSON payload of the error item emitted in place of a failed item when
    /// the execution continues on failure.
    fn error_item(&self, _item: &Item, error: &NodeError) -> Value {
        json!({ "error": error.user_message() })
    }
}

/// Per-node-instance persistent key/value storage.
///
/// Each store handed to a node is already scoped to that node within its
/// workflow; keys only need to be unique inside one node. The host serialises
/// calls, so implementations need no cross-call locking beyond memory safety.
#[async_trait]
pub trait StaticDataStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, NodeError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), NodeError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), NodeError>;
}
