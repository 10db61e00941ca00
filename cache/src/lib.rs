//! # Commit cache
//!
//! Configuration and unification for the cache backends, plus the freshness
//! policy which decides whether a stored entry may still be used.
//!
//! Reads never fail: a backend error is logged and reported as a miss, so
//! callers fall back to fetching fresh data.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "local")]
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[cfg(feature = "local")]
pub(crate) mod local;
pub(crate) mod memory;
#[cfg(feature = "remote")]
pub(crate) mod remote;

#[cfg(feature = "local")]
#[doc(inline)]
pub use local::LocalDriver;

#[doc(inline)]
pub use memory::MemoryDriver;

#[cfg(feature = "remote")]
#[doc(inline)]
pub use remote::{RemoteConfig, RemoteDriver};

#[doc(inline)]
pub use cache_driver::{CacheError, CacheErrorKind, Driver, Record};

/// Which backend stores the cache.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// In process memory, lost on exit.
    #[default]
    Memory,

    /// One JSON file per key in a directory.
    #[cfg(feature = "local")]
    Local {
        /// Directory holding the cache files
        path: Utf8PathBuf,
    },

    /// A remote table behind a PostgREST API.
    #[cfg(feature = "remote")]
    Remote(RemoteConfig),
}

/// Cache configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: Backend,

    /// Entries older than this many seconds are ignored. Unset keeps entries
    /// until they are overwritten.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl CacheConfig {
    /// Build the configured cache.
    #[tracing::instrument]
    pub fn build(self) -> Cache {
        let cache: Cache = match self.backend {
            Backend::Memory => MemoryDriver::new().into(),
            #[cfg(feature = "local")]
            Backend::Local { path } => LocalDriver::new(path).into(),
            #[cfg(feature = "remote")]
            Backend::Remote(config) => RemoteDriver::new(config).into(),
        };

        match self.ttl_seconds {
            Some(seconds) => cache.with_freshness(Freshness::Ttl(Duration::from_secs(seconds))),
            None => cache,
        }
    }
}

/// How long a stored entry stays usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Freshness {
    /// Entries stay usable until they are overwritten.
    #[default]
    Forever,

    /// Entries older than the duration are treated as absent.
    Ttl(Duration),
}

impl Freshness {
    /// Whether an entry of the given age is still usable.
    pub fn is_fresh(&self, age: chrono::Duration) -> bool {
        match self {
            Freshness::Forever => true,
            Freshness::Ttl(ttl) => match chrono::Duration::from_std(*ttl) {
                Ok(ttl) => age <= ttl,
                Err(_) => true,
            },
        }
    }
}

/// A value read back from the cache, with the time it was captured.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    /// The cached value
    pub value: T,

    /// When the value was stored
    pub captured: DateTime<Utc>,
}

pub(crate) type ArcDriver = Arc<dyn Driver + Send + Sync>;

/// A typed cache over any [Driver].
#[derive(Debug, Clone)]
pub struct Cache {
    driver: ArcDriver,
    freshness: Freshness,
}

impl<D> From<D> for Cache
where
    D: Driver + Send + Sync + 'static,
{
    fn from(value: D) -> Self {
        Cache::new(value)
    }
}

impl Cache {
    /// Cache values in `driver`, keeping them until overwritten.
    pub fn new<D: Driver + Send + Sync + 'static>(driver: D) -> Self {
        Self {
            driver: Arc::new(driver),
            freshness: Freshness::Forever,
        }
    }

    /// Replace the freshness policy.
    pub fn with_freshness(mut self, freshness: Freshness) -> Self {
        self.freshness = freshness;
        self
    }

    /// The freshness policy in use.
    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    /// The backend name.
    pub fn name(&self) -> &str {
        self.driver.name()
    }

    /// Read a fresh entry for `key`.
    ///
    /// A missing, stale or unreadable entry is `None`. Backend failures are
    /// logged and also reported as `None`.
    #[tracing::instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn get<T>(&self, key: &str) -> Option<Entry<T>>
    where
        T: DeserializeOwned,
    {
        match self.try_get(key).await {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(
                    %error,
                    retryable = error.kind().is_retryable(),
                    "cache unavailable, treating as a miss"
                );
                tracing::debug!(spans = %error.span_trace(), "cache failure context");
                None
            }
        }
    }

    /// Read a fresh entry for `key`, reporting backend failures.
    pub async fn try_get<T>(&self, key: &str) -> Result<Option<Entry<T>>, CacheError>
    where
        T: DeserializeOwned,
    {
        let Some(record) = self.driver.get(key).await? else {
            tracing::debug!("cache miss");
            return Ok(None);
        };

        if !self.freshness.is_fresh(record.age(Utc::now())) {
            tracing::debug!(captured = %record.timestamp, "cache entry is stale");
            return Ok(None);
        }

        let value = serde_json::from_value(record.data).map_err(|err| {
            CacheError::builder(self.driver.name(), CacheErrorKind::Serialization, err)
                .key(key)
                .context("decode cached value")
                .build()
        })?;

        tracing::debug!(captured = %record.timestamp, "cache hit");
        Ok(Some(Entry {
            value,
            captured: record.timestamp,
        }))
    }

    /// Store `value` under `key`, replacing whatever was there. Returns the capture time.
    #[tracing::instrument(skip(self, value), fields(driver = self.driver.name()))]
    pub async fn put<T>(&self, key: &str, value: &T) -> Result<DateTime<Utc>, CacheError>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(value).map_err(|err| {
            CacheError::builder(self.driver.name(), CacheErrorKind::Serialization, err)
                .key(key)
                .context("encode value")
                .build()
        })?;

        let record = Record::new(key, data);
        let captured = record.timestamp;
        self.driver.put(record).await?;
        Ok(captured)
    }

    /// Remove any entry for `key`.
    #[tracing::instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.driver.delete(key).await
    }
}
