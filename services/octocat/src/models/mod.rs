//! Github API object models.

use serde::{Deserialize, Serialize};

pub mod branches;
pub mod commits;
pub mod graphql;

pub use branches::Branch;
pub use commits::{Commit, CommitFile};

/// A Github account, as linked from a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account login.
    pub login: String,

    /// Account ID.
    #[serde(default)]
    pub id: Option<i64>,

    /// Avatar image.
    #[serde(default)]
    pub avatar_url: Option<String>,

    /// Profile page.
    #[serde(default)]
    pub html_url: Option<String>,
}
