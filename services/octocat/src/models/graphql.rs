//! Shapes of the GraphQL queries and responses used for commit history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GraphQL request body.
#[derive(Debug, Serialize)]
pub struct Query<'q, V> {
    /// Query document
    pub query: &'q str,
    /// Variables referenced by the document
    pub variables: V,
}

/// The GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// Present unless the query failed outright.
    pub data: Option<T>,

    /// Errors, possibly alongside partial data.
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// One entry from the `errors` list.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    /// Github's machine readable error type, e.g. `RATE_LIMITED` or `NOT_FOUND`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Human readable message
    pub message: String,
}

/// Relay pagination state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// More items follow this page.
    pub has_next_page: bool,
    /// Cursor to pass as `after` for the next page.
    pub end_cursor: Option<String>,
}

/// A Relay connection with `nodes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// Pagination state
    pub page_info: PageInfo,
    /// Items on this page
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

/// `data` for the branches query.
#[derive(Debug, Deserialize)]
pub struct RefsData {
    /// Null when the repository is not visible.
    pub repository: Option<RefsRepository>,
}

/// Repository refs
#[derive(Debug, Deserialize)]
pub struct RefsRepository {
    /// Branch refs
    pub refs: Connection<RefNode>,
}

/// A git ref.
#[derive(Debug, Clone, Deserialize)]
pub struct RefNode {
    /// Short name, without `refs/heads/`.
    pub name: String,
}

/// `data` for the history query.
#[derive(Debug, Deserialize)]
pub struct HistoryData {
    /// Null when the repository is not visible.
    pub repository: Option<HistoryRepository>,
}

/// Repository ref lookup
#[derive(Debug, Deserialize)]
pub struct HistoryRepository {
    /// Null when the branch does not exist.
    #[serde(rename = "ref")]
    pub reference: Option<HistoryRef>,
}

/// The ref whose history is walked.
#[derive(Debug, Deserialize)]
pub struct HistoryRef {
    /// The object the ref points at.
    pub target: Option<HistoryTarget>,
}

/// The target object. `history` is absent unless it is a commit.
#[derive(Debug, Deserialize)]
pub struct HistoryTarget {
    /// Commit ancestry, newest first.
    #[serde(default)]
    pub history: Option<Connection<HistoryCommit>>,
}

/// A commit as returned by the history query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCommit {
    /// Commit SHA
    pub oid: String,
    /// Full commit message
    pub message: String,
    /// Committed timestamp
    #[serde(default)]
    pub committed_date: Option<DateTime<Utc>>,
    /// Git author
    #[serde(default)]
    pub author: Option<GitActor>,
}

/// A git author or committer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitActor {
    /// Name from the commit
    #[serde(default)]
    pub name: Option<String>,
    /// Email from the commit
    #[serde(default)]
    pub email: Option<String>,
    /// Authored timestamp
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// The Github account matched to the email, if any.
    #[serde(default)]
    pub user: Option<GitUser>,
}

/// A Github account as seen from GraphQL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitUser {
    /// Account login
    pub login: String,
    /// Avatar image
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Profile page
    #[serde(default)]
    pub url: Option<String>,
}
