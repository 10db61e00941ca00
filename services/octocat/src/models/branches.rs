//! Branch data models.

use serde::{Deserialize, Serialize};

/// A branch, as listed by `GET /repos/{owner}/{repo}/branches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name, without the `refs/heads/` prefix.
    pub name: String,

    /// The commit at the tip of the branch.
    pub commit: BranchHead,

    /// Whether branch protection is enabled.
    #[serde(default)]
    pub protected: bool,
}

/// The commit a branch points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    /// The SHA of the commit.
    pub sha: String,
}
