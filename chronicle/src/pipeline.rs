//! Load a repository's commits: cache first, then Github.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cache::Cache;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::commit::Commit;
use crate::error::Error;
use crate::fetch::Fetcher;
use crate::reference::RepoRef;

/// Where an aggregate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Read back from the cache.
    Cache,
    /// Fetched from Github just now.
    Fetched,
}

/// Every commit of one repository.
#[derive(Debug, Clone)]
pub struct Aggregate {
    /// The repository
    pub repo: RepoRef,

    /// One record per commit per branch.
    pub commits: Vec<Commit>,

    /// When the commits were fetched.
    pub captured: DateTime<Utc>,

    /// Whether this came from the cache.
    pub origin: Origin,
}

/// Loads aggregates through a cache.
///
/// Clones share the request counter: when calls overlap, only the most
/// recently started one may write the cache or return data. Older calls end
/// with [Error::Superseded].
#[derive(Debug, Clone)]
pub struct Chronicle {
    cache: Cache,
    fetcher: Fetcher,
    latest: Arc<AtomicU64>,
}

impl Chronicle {
    /// Load through `cache`, fetching misses with `fetcher`.
    pub fn new(cache: Cache, fetcher: Fetcher) -> Self {
        Self {
            cache,
            fetcher,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The cache in use.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Commits for `reference`, from the cache when it has them.
    pub async fn load(&self, reference: &str) -> Result<Aggregate, Error> {
        self.run(reference, true).await
    }

    /// Commits for `reference`, always fetched, replacing any cached copy.
    pub async fn refresh(&self, reference: &str) -> Result<Aggregate, Error> {
        self.run(reference, false).await
    }

    #[tracing::instrument(skip(self))]
    async fn run(&self, reference: &str, use_cache: bool) -> Result<Aggregate, Error> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let repo = RepoRef::parse(reference)?;
        let key = repo.cache_key();

        if use_cache {
            if let Some(entry) = self.cache.get::<Vec<Commit>>(&key).await {
                self.check(ticket)?;
                tracing::info!(%repo, commits = entry.value.len(), "loaded from cache");
                return Ok(Aggregate {
                    repo,
                    commits: entry.value,
                    captured: entry.captured,
                    origin: Origin::Cache,
                });
            }
        }

        let commits = self.fetcher.fetch(&repo).await?;
        self.check(ticket)?;

        let captured = match self.cache.put(&key, &commits).await {
            Ok(captured) => captured,
            Err(error) => {
                tracing::warn!(%error, "could not cache commits");
                Utc::now()
            }
        };
        self.check(ticket)?;

        Ok(Aggregate {
            repo,
            commits,
            captured,
            origin: Origin::Fetched,
        })
    }

    fn check(&self, ticket: u64) -> Result<(), Error> {
        let latest = self.latest.load(Ordering::SeqCst);
        if latest == ticket {
            Ok(())
        } else {
            tracing::debug!(ticket, latest, "dropping superseded result");
            Err(Error::Superseded)
        }
    }
}
