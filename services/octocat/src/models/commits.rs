//! Commit data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Account;

/// A commit object.
///
/// The list endpoint leaves `files` out; the single commit endpoint fills it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// The SHA of the commit.
    pub sha: String,

    /// The commit details.
    pub commit: CommitDetails,

    /// The Github account matched to the commit author, if any.
    #[serde(default)]
    pub author: Option<Account>,

    /// Files changed by the commit.
    #[serde(default)]
    pub files: Option<Vec<CommitFile>>,
}

/// The author and message for a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetails {
    /// The author of the commit.
    pub author: AuthorCommitDetails,
    /// The commit message.
    pub message: String,
}

/// The author and date for a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorCommitDetails {
    /// Author name
    pub name: String,
    /// Author email
    #[serde(default)]
    pub email: Option<String>,
    /// The date of the commit.
    pub date: DateTime<Utc>,
}

/// A file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFile {
    /// Path of the file after the change.
    pub filename: String,

    /// `added`, `modified`, `removed`, `renamed`...
    #[serde(default)]
    pub status: Option<String>,

    /// Lines added.
    #[serde(default)]
    pub additions: u64,

    /// Lines removed.
    #[serde(default)]
    pub deletions: u64,
}
