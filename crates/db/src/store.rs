//! Postgres-backed [`StaticDataStore`].

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use nodes::{NodeError, StaticDataStore};

use crate::repository::static_data;
use crate::DbPool;

/// Static data of one node in one workflow, persisted across restarts.
#[derive(Debug, Clone)]
pub struct PgStaticDataStore {
    pool: DbPool,
    workflow_id: Uuid,
    node_name: String,
}

impl PgStaticDataStore {
    pub fn new(pool: DbPool, workflow_id: Uuid, node_name: impl Into<String>) -> Self {
        Self {
            pool,
            workflow_id,
            node_name: node_name.into(),
        }
    }

    pub fn workflow_id(&self) -> Uuid {
        self.workflow_id
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }
}

#[async_trait]
impl StaticDataStore for PgStaticDataStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, NodeError> {
        let row = static_data::get_entry(&self.pool, self.workflow_id, &self.node_name, key).await?;
        Ok(row.map(|r| r.value))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), NodeError> {
        static_data::upsert_entry(&self.pool, self.workflow_id, &self.node_name, key, value)
            .await?;
        debug!(node = %self.node_name, key, "static data stored");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), NodeError> {
        let removed =
            static_data::delete_entry(&self.pool, self.workflow_id, &self.node_name, key).await?;
        debug!(node = %self.node_name, key, removed, "static data removed");
        Ok(())
    }
}
