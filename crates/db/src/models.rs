//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// node_static_data
// ---------------------------------------------------------------------------

/// One key of a node's static data, scoped by workflow and node name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaticDataRow {
    pub workflow_id: Uuid,
    pub node_name: String,
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
