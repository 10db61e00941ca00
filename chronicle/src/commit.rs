//! The canonical commit record, and the adapters from each Github API.

use chrono::{DateTime, NaiveDate, Utc};
use octocat::models::graphql::HistoryCommit;
use serde::{Deserialize, Serialize};

/// A file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Path after the change
    pub filename: String,

    /// `added`, `modified`, `removed`...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Lines added
    #[serde(default)]
    pub additions: u64,

    /// Lines removed
    #[serde(default)]
    pub deletions: u64,
}

impl From<octocat::models::CommitFile> for ChangedFile {
    fn from(file: octocat::models::CommitFile) -> Self {
        Self {
            filename: file.filename,
            status: file.status,
            additions: file.additions,
            deletions: file.deletions,
        }
    }
}

/// One commit, as collected from one branch.
///
/// The same commit reachable from two branches is two records, each tagged
/// with its own branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Commit SHA
    pub sha: String,

    /// Full commit message
    pub message: String,

    /// Author name from the commit metadata
    pub author_name: String,

    /// Author email from the commit metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,

    /// When the commit was authored. All ordering and bucketing uses this.
    pub author_date: DateTime<Utc>,

    /// Github account linked to the commit, absent for unlinked authors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_login: Option<String>,

    /// Avatar image of the linked account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,

    /// Profile page of the linked account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,

    /// Files changed, empty when details were not fetched.
    #[serde(default)]
    pub files: Vec<ChangedFile>,

    /// Branch the record was collected under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl Commit {
    /// Adapt a commit from the REST API.
    pub fn from_rest(commit: octocat::models::Commit) -> Self {
        let details = commit.commit;
        let account = commit.author;

        Self {
            sha: commit.sha,
            message: details.message,
            author_name: details.author.name,
            author_email: details.author.email,
            author_date: details.author.date,
            author_login: account.as_ref().map(|account| account.login.clone()),
            author_avatar: account.as_ref().and_then(|account| account.avatar_url.clone()),
            author_url: account.and_then(|account| account.html_url),
            files: commit
                .files
                .unwrap_or_default()
                .into_iter()
                .map(ChangedFile::from)
                .collect(),
            branch: None,
        }
    }

    /// Adapt a commit from the GraphQL history query.
    ///
    /// The author date falls back to the commit date. A commit with neither
    /// is skipped.
    pub fn from_graphql(commit: HistoryCommit) -> Option<Self> {
        let author = commit.author.unwrap_or_default();
        let user = author.user;

        let Some(author_date) = author.date.or(commit.committed_date) else {
            tracing::warn!(sha = %commit.oid, "skipping commit without a date");
            return None;
        };

        Some(Self {
            sha: commit.oid,
            message: commit.message,
            author_name: author.name.unwrap_or_default(),
            author_email: author.email,
            author_date,
            author_login: user.as_ref().map(|user| user.login.clone()),
            author_avatar: user.as_ref().and_then(|user| user.avatar_url.clone()),
            author_url: user.and_then(|user| user.url),
            files: Vec::new(),
            branch: None,
        })
    }

    /// Tag the record with the branch it was collected under.
    pub fn on_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Name shown for the author: the commit name, or the login when the name is blank.
    pub fn author(&self) -> &str {
        match (self.author_name.trim(), self.author_login.as_deref()) {
            ("", Some(login)) => login,
            (name, _) => name,
        }
    }

    /// UTC calendar day the commit was authored.
    pub fn day(&self) -> NaiveDate {
        self.author_date.date_naive()
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// Names of the changed files, in order.
    pub fn filenames(&self) -> impl Iterator<Item = &str> + '_ {
        self.files.iter().map(|file| file.filename.as_str())
    }
}
