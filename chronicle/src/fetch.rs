//! Collect every commit on every branch of a repository.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::commit::Commit;
use crate::error::{Error, FetchError};
use crate::reference::RepoRef;
use crate::source::CommitSource;

fn default_files() -> bool {
    true
}

fn default_concurrency() -> usize {
    10
}

fn default_timeout_seconds() -> u64 {
    300
}

/// Fetch tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchOptions {
    /// Fetch each commit's changed files. One extra request per commit.
    #[serde(default = "default_files")]
    pub files: bool,

    /// Most detail requests in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Deadline for the whole fetch.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            files: default_files(),
            concurrency: default_concurrency(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl FetchOptions {
    /// Deadline for the whole fetch.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Walks branches and their histories through a [CommitSource].
///
/// Branches and pages are fetched one after another. Only detail requests run
/// concurrently, bounded by [FetchOptions::concurrency] across all fetches
/// sharing this fetcher.
#[derive(Debug, Clone)]
pub struct Fetcher {
    source: Arc<dyn CommitSource>,
    options: FetchOptions,
    permits: Arc<Semaphore>,
}

impl Fetcher {
    /// Fetch from `source`.
    pub fn new(source: Arc<dyn CommitSource>, options: FetchOptions) -> Self {
        let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
        Self {
            source,
            options,
            permits,
        }
    }

    /// The options in use.
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Every commit on every branch, each tagged with its branch.
    ///
    /// Any failure discards everything fetched so far.
    #[tracing::instrument(skip(self), fields(source = self.source.name()))]
    pub async fn fetch(&self, repo: &RepoRef) -> Result<Vec<Commit>, Error> {
        let timeout = self.options.timeout();
        match tokio::time::timeout(timeout, self.fetch_all(repo)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?timeout, "fetch timed out");
                Err(Error::FetchFailed {
                    branch: None,
                    page: None,
                    source: FetchError::Timeout(timeout),
                })
            }
        }
    }

    async fn fetch_all(&self, repo: &RepoRef) -> Result<Vec<Commit>, Error> {
        let branches = self.branches(repo).await?;
        tracing::debug!(branches = branches.len(), "listed branches");

        let mut commits = Vec::new();
        for branch in &branches {
            commits.extend(self.branch(repo, branch).await?);
        }

        tracing::info!(
            branches = branches.len(),
            commits = commits.len(),
            "fetched repository"
        );
        Ok(commits)
    }

    async fn branches(&self, repo: &RepoRef) -> Result<Vec<String>, Error> {
        let mut pages = self.source.branches(repo);
        let mut names = Vec::new();
        let mut page = 0;

        while let Some(result) = pages.next().await {
            page += 1;
            names.extend(result.map_err(|error| Error::fetch(None, page, error))?);
        }

        Ok(names)
    }

    #[tracing::instrument(level = "debug", skip(self, repo))]
    async fn branch(&self, repo: &RepoRef, branch: &str) -> Result<Vec<Commit>, Error> {
        let mut pages = self.source.commits(repo, branch);
        let mut seen = HashSet::new();
        let mut commits = Vec::new();
        let mut page = 0;

        while let Some(result) = pages.next().await {
            page += 1;
            let items = result.map_err(|error| Error::fetch(Some(branch), page, error))?;

            // Pages can overlap when the branch moves mid-fetch.
            let fresh: Vec<Commit> = items
                .into_iter()
                .filter(|commit| seen.insert(commit.sha.clone()))
                .collect();
            if fresh.is_empty() {
                tracing::debug!(page, "page has no new commits");
                break;
            }

            let fresh = if self.options.files {
                self.enrich(repo, branch, page, fresh).await?
            } else {
                fresh
            };

            commits.extend(fresh.into_iter().map(|commit| commit.on_branch(branch)));
            tracing::debug!(page, total = commits.len(), "fetched page");
        }

        Ok(commits)
    }

    async fn enrich(
        &self,
        repo: &RepoRef,
        branch: &str,
        page: usize,
        commits: Vec<Commit>,
    ) -> Result<Vec<Commit>, Error> {
        let details = commits.into_iter().map(|mut commit| async move {
            let Ok(_permit) = self.permits.acquire().await else {
                return Err(Error::FetchFailed {
                    branch: Some(branch.to_owned()),
                    page: Some(page),
                    source: FetchError::Cancelled,
                });
            };

            commit.files = self
                .source
                .files(repo, &commit.sha)
                .await
                .map_err(|error| Error::fetch(Some(branch), page, error))?;
            Ok(commit)
        });

        futures::future::try_join_all(details).await
    }
}
