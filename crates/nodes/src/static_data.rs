//! In-process [`StaticDataStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{NodeError, StaticDataStore};

/// Static data held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStaticData {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStaticData {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>, NodeError> {
        self.entries
            .lock()
            .map_err(|_| NodeError::Storage("static data lock poisoned".into()))
    }
}

#[async_trait]
impl StaticDataStore for MemoryStaticData {
    async fn get(&self, key: &str) -> Result<Option<Value>, NodeError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), NodeError> {
        self.lock()?.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), NodeError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
