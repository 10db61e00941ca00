use std::collections::HashMap;

use tokio::sync::RwLock;

use cache_driver::{CacheError, Driver, Record};

/// Cache driver that keeps records in process memory.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryDriver {
    /// Create an empty `MemoryDriver`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Record>, CacheError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, record: Record) -> Result<(), CacheError> {
        self.records
            .write()
            .await
            .insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.records.write().await.remove(key);
        Ok(())
    }
}
