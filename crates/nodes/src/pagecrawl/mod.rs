//! PageCrawl.io website-change monitoring: the action node, its lookups and
//! the webhook trigger.

pub mod credentials;
pub mod lookup;
pub mod node;
pub mod normalize;
pub mod params;
pub mod trigger;
pub mod types;

pub use credentials::{test_credentials, Credentials, DEFAULT_BASE_URL};
pub use lookup::{frequencies, search, search_pages, ListSearchResult, LookupKind};
pub use node::{shape_output, PageCrawlNode};
pub use normalize::{normalize_page_body, plan_request, Operation, OutputShape, PlannedRequest};
pub use params::{ListEnvelope, LocatorMode, Params, ResourceLocator};
pub use trigger::{DeliveryEvent, PageCrawlTrigger, SimplifiedDelivery, TriggerConfig, WEBHOOK_ID_KEY};
pub use types::{Frequency, FREQUENCIES};
