//! Test doubles: `MockNode` for `ExecutableNode` and `MockHttpClient` for
//! the HTTP capability.
//!
//! Useful in unit and integration tests where a real node or a live remote
//! API is either unavailable or irrelevant.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    ApiRequest, ApiResponse, ExecutableNode, ExecutionContext, HttpClient, HttpError, Item,
    NodeError,
};

// ---------------------------------------------------------------------------
// MockNode
// ---------------------------------------------------------------------------

/// Behaviour injected into `MockNode` at construction time.
pub enum MockBehaviour {
    /// Return a specific JSON value merged over the node name.
    ReturnValue(Value),
    /// Fail every item with the given error.
    Fail(NodeError),
    /// Fail only the item at this index, succeed with the value elsewhere.
    FailAt(usize, Value),
}

/// A mock node that records every item it receives and returns a
/// programmer-specified result.
pub struct MockNode {
    /// Label used in test assertions.
    pub name: String,
    /// What the node will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// All inputs seen by this node (in call order).
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockNode {
    fn with(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with(name, MockBehaviour::ReturnValue(value))
    }

    /// Create a mock that always fails with `error`.
    pub fn failing(name: impl Into<String>, error: NodeError) -> Self {
        Self::with(name, MockBehaviour::Fail(error))
    }

    /// Create a mock that fails on the item at `index` only.
    pub fn failing_at(name: impl Into<String>, index: usize, value: Value) -> Self {
        Self::with(name, MockBehaviour::FailAt(index, value))
    }

    /// Number of items this node has been executed on.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn merged(&self, value: &Value, input: &Value) -> Value {
        let mut out = json!({ "node": self.name, "input": input });
        if let (Some(out_obj), Some(v_obj)) = (out.as_object_mut(), value.as_object()) {
            for (k, val) in v_obj {
                out_obj.insert(k.clone(), val.clone());
            }
        }
        out
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(
        &self,
        index: usize,
        item: &Item,
        _ctx: &ExecutionContext,
    ) -> Result<Vec<Item>, NodeError> {
        self.calls.lock().unwrap().push(item.json.clone());

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(vec![Item::new(self.merged(v, &item.json))]),
            MockBehaviour::Fail(err) => Err(err.clone()),
            MockBehaviour::FailAt(at, _) if *at == index => Err(NodeError::invalid_parameter(
                "mock",
                format!("{} refused item {index}", self.name),
            )),
            MockBehaviour::FailAt(_, v) => Ok(vec![Item::new(self.merged(v, &item.json))]),
        }
    }
}

// ---------------------------------------------------------------------------
// MockHttpClient
// ---------------------------------------------------------------------------

/// An HTTP capability that replays scripted answers in order and records
/// every request it receives.
///
/// Once the script is exhausted every further call answers `null` JSON.
#[derive(Default)]
pub struct MockHttpClient {
    script: Mutex<VecDeque<Result<ApiResponse, HttpError>>>,
    /// All requests seen by this client (in call order).
    pub calls: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON answer.
    pub fn respond_json(self, value: Value) -> Self {
        self.respond(ApiResponse::Json(value))
    }

    /// Queue an arbitrary answer.
    pub fn respond(self, response: ApiResponse) -> Self {
        self.script.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: HttpError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The `n`-th recorded request. Panics if there is none.
    pub fn request(&self, n: usize) -> ApiRequest {
        self.calls.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        self.calls.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ApiResponse::Json(Value::Null)))
    }
}
