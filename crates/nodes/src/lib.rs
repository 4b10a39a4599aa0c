//! `nodes` crate — the `ExecutableNode` trait, the host capabilities a node
//! is handed at run time, and the PageCrawl node implementation.
//!
//! Every node must implement [`ExecutableNode`]. The engine crate drives
//! execution item by item through this trait object.

pub mod error;
pub mod http;
pub mod item;
pub mod mock;
pub mod pagecrawl;
pub mod static_data;
pub mod traits;

pub use error::NodeError;
pub use http::{ApiRequest, ApiResponse, HttpClient, HttpError, HttpMethod, ResponseFormat};
pub use item::{BinaryData, Item};
pub use static_data::MemoryStaticData;
pub use traits::{ExecutableNode, ExecutionContext, StaticDataStore};
