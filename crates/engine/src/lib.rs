//! `engine` crate — runs one node over an ordered batch of items.

pub mod error;
pub mod executor;
pub mod models;

pub use error::EngineError;
pub use executor::{ExecutorConfig, ItemExecutor};
pub use models::{ExecutionRequest, ExecutionResult};
