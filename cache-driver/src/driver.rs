use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// One cached value, as a backend stores it.
///
/// The fields match the columns of the remote cache table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Cache key, unique per backend.
    pub key: String,

    /// The cached value.
    pub data: serde_json::Value,

    /// When the value was captured.
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// A record captured now.
    pub fn new(key: impl Into<String>, data: serde_json::Value) -> Self {
        Self::captured_at(key, data, Utc::now())
    }

    /// A record captured at a specific time.
    pub fn captured_at(
        key: impl Into<String>,
        data: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            data,
            timestamp,
        }
    }

    /// How long ago, relative to `now`, the record was captured.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

/// A cache backend: an upsert capable key/value store.
#[async_trait::async_trait]
pub trait Driver: fmt::Debug {
    /// The name of the driver.
    fn name(&self) -> &'static str;

    /// Read the record stored under `key`. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Record>, CacheError>;

    /// Store a record, replacing any record with the same key.
    async fn put(&self, record: Record) -> Result<(), CacheError>;

    /// Remove the record stored under `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[async_trait::async_trait]
impl<D> Driver for Arc<D>
where
    D: Driver + Send + Sync + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn get(&self, key: &str) -> Result<Option<Record>, CacheError> {
        (**self).get(key).await
    }

    async fn put(&self, record: Record) -> Result<(), CacheError> {
        (**self).put(record).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        (**self).delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_obj_safe!(Driver);

    #[test]
    fn record_round_trips_through_json() {
        let record = Record::new("octo/cat", serde_json::json!([{"sha": "abc"}]));
        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: Record = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn age_is_relative_to_now() {
        let captured = Utc::now() - chrono::Duration::minutes(90);
        let record = Record::captured_at("octo/cat", serde_json::Value::Null, captured);
        assert!(record.age(Utc::now()) >= chrono::Duration::minutes(90));
    }
}
