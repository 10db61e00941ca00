//! Commit sources: the REST and GraphQL routes to the same commit records.

use std::fmt;

use futures::{StreamExt as _, TryStreamExt as _};
use octocat::{GithubClient, Pages};

use crate::commit::{ChangedFile, Commit};
use crate::reference::RepoRef;

/// Something which can list branches and their commits.
///
/// Implementations adapt their wire format to [Commit]; nothing downstream
/// sees which API was used.
#[async_trait::async_trait]
pub trait CommitSource: fmt::Debug + Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Branch names, one page per item.
    fn branches(&self, repo: &RepoRef) -> Pages<String>;

    /// Commits reachable from `branch`, newest first, one page per item.
    fn commits(&self, repo: &RepoRef, branch: &str) -> Pages<Commit>;

    /// Files changed by the commit `sha`.
    async fn files(&self, repo: &RepoRef, sha: &str) -> Result<Vec<ChangedFile>, octocat::Error>;
}

async fn rest_files(
    client: &GithubClient,
    repo: &RepoRef,
    sha: &str,
) -> Result<Vec<ChangedFile>, octocat::Error> {
    let commit = client.commit(repo.owner(), repo.repo(), sha).await?;
    Ok(commit
        .files
        .unwrap_or_default()
        .into_iter()
        .map(ChangedFile::from)
        .collect())
}

/// Commits from the REST API.
#[derive(Debug, Clone)]
pub struct RestSource {
    client: GithubClient,
}

impl RestSource {
    /// Read through `client`.
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl CommitSource for RestSource {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn branches(&self, repo: &RepoRef) -> Pages<String> {
        self.client
            .branches(repo.owner(), repo.repo())
            .map_ok(|page| page.into_iter().map(|branch| branch.name).collect())
            .boxed()
    }

    fn commits(&self, repo: &RepoRef, branch: &str) -> Pages<Commit> {
        self.client
            .commits(repo.owner(), repo.repo(), branch)
            .map_ok(|page| page.into_iter().map(Commit::from_rest).collect())
            .boxed()
    }

    async fn files(&self, repo: &RepoRef, sha: &str) -> Result<Vec<ChangedFile>, octocat::Error> {
        rest_files(&self.client, repo, sha).await
    }
}

/// Commits from the GraphQL API.
///
/// History does not carry changed files, so those still come from the REST
/// detail endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlSource {
    client: GithubClient,
}

impl GraphQlSource {
    /// Read through `client`, which must be authenticated.
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl CommitSource for GraphQlSource {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn branches(&self, repo: &RepoRef) -> Pages<String> {
        self.client.graphql_branches(repo.owner(), repo.repo())
    }

    fn commits(&self, repo: &RepoRef, branch: &str) -> Pages<Commit> {
        self.client
            .graphql_history(repo.owner(), repo.repo(), branch)
            .map_ok(|page| page.into_iter().filter_map(Commit::from_graphql).collect())
            .boxed()
    }

    async fn files(&self, repo: &RepoRef, sha: &str) -> Result<Vec<ChangedFile>, octocat::Error> {
        rest_files(&self.client, repo, sha).await
    }
}
