//! Filtering and ordering of a working set. Nothing here mutates the aggregate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::commit::Commit;

/// What free text search looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// The commit message
    #[default]
    Message,
    /// Changed file names
    Files,
}

/// Order of the visible commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Most recent first
    #[default]
    NewestFirst,
    /// Oldest first
    OldestFirst,
}

impl SortOrder {
    /// Sort by author date. Ties keep their existing order.
    pub fn sort(self, commits: &mut [&Commit]) {
        match self {
            SortOrder::NewestFirst => commits.sort_by(|a, b| b.author_date.cmp(&a.author_date)),
            SortOrder::OldestFirst => commits.sort_by(|a, b| a.author_date.cmp(&b.author_date)),
        }
    }
}

/// Criteria a commit must meet to be shown. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitFilter {
    /// Exact login or author name.
    pub author: Option<String>,

    /// Exact branch name.
    pub branch: Option<String>,

    /// Case-insensitive substring.
    pub search: Option<String>,

    /// Where [CommitFilter::search] looks.
    pub mode: SearchMode,

    /// First day included, in UTC.
    pub since: Option<NaiveDate>,

    /// Last day included, in UTC.
    pub until: Option<NaiveDate>,
}

impl CommitFilter {
    /// Match everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only commits by this login or author name.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Only commits collected under this branch.
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Only commits whose message (or files) contain `text`.
    pub fn search(mut self, text: impl Into<String>, mode: SearchMode) -> Self {
        self.search = Some(text.into());
        self.mode = mode;
        self
    }

    /// Only commits authored on days from `since` to `until`, inclusive.
    pub fn between(mut self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    /// True when no criteria are set.
    pub fn is_empty(&self) -> bool {
        *self == CommitFilter { mode: self.mode, ..Default::default() }
    }

    /// Whether `commit` meets every set criterion.
    pub fn matches(&self, commit: &Commit) -> bool {
        if let Some(author) = &self.author {
            let by_login = commit.author_login.as_deref() == Some(author.as_str());
            if !by_login && commit.author_name != *author {
                return false;
            }
        }

        if let Some(branch) = &self.branch {
            if commit.branch.as_deref() != Some(branch.as_str()) {
                return false;
            }
        }

        if let Some(text) = self.search.as_deref().filter(|text| !text.is_empty()) {
            let needle = text.to_lowercase();
            let found = match self.mode {
                SearchMode::Message => commit.message.to_lowercase().contains(&needle),
                SearchMode::Files => commit
                    .filenames()
                    .any(|name| name.to_lowercase().contains(&needle)),
            };
            if !found {
                return false;
            }
        }

        let day = commit.day();
        self.since.map_or(true, |since| day >= since)
            && self.until.map_or(true, |until| day <= until)
    }

    /// The matching commits, in their existing order.
    pub fn apply<'c>(&'c self, commits: &'c [Commit]) -> impl Iterator<Item = &'c Commit> + 'c {
        commits.iter().filter(move |commit| self.matches(commit))
    }
}

/// The matching commits, sorted.
pub fn select<'c>(
    commits: &'c [Commit],
    filter: &CommitFilter,
    order: SortOrder,
) -> Vec<&'c Commit> {
    let mut visible: Vec<&Commit> = commits
        .iter()
        .filter(|commit| filter.matches(commit))
        .collect();
    order.sort(&mut visible);
    visible
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::commit::ChangedFile;

    pub(crate) fn commit(sha: &str, author: &str, date: &str) -> Commit {
        Commit {
            sha: sha.to_owned(),
            message: format!("Commit {sha}"),
            author_name: author.to_owned(),
            author_email: None,
            author_date: date.parse::<DateTime<Utc>>().unwrap(),
            author_login: Some(author.to_lowercase()),
            author_avatar: None,
            author_url: None,
            files: Vec::new(),
            branch: Some("main".to_owned()),
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    /// Ten commits; three by A across 2025-01-01 and 2025-01-02.
    fn ten() -> Vec<Commit> {
        vec![
            commit("1", "A", "2025-01-01T09:00:00Z"),
            commit("2", "A", "2025-01-01T23:59:59Z"),
            commit("3", "A", "2025-01-02T00:00:00Z"),
            commit("4", "B", "2025-01-01T10:00:00Z"),
            commit("5", "B", "2025-01-02T10:00:00Z"),
            commit("6", "C", "2025-01-01T11:00:00Z"),
            commit("7", "C", "2025-01-03T11:00:00Z"),
            commit("8", "D", "2024-12-31T23:00:00Z"),
            commit("9", "D", "2025-01-01T12:00:00Z"),
            commit("10", "E", "2025-01-04T12:00:00Z"),
        ]
    }

    #[test]
    fn author_and_single_day() {
        let commits = ten();
        let filter = CommitFilter::new()
            .author("A")
            .between(Some(day("2025-01-01")), Some(day("2025-01-01")));

        let shas: Vec<&str> = filter.apply(&commits).map(|c| c.sha.as_str()).collect();
        assert_eq!(shas, vec!["1", "2"]);
    }

    #[test]
    fn author_matches_login_or_name() {
        let commits = ten();
        assert_eq!(CommitFilter::new().author("a").apply(&commits).count(), 3);
        assert_eq!(CommitFilter::new().author("A").apply(&commits).count(), 3);
        assert_eq!(CommitFilter::new().author("Al").apply(&commits).count(), 0);
    }

    #[test]
    fn open_ended_ranges() {
        let commits = ten();
        let since = CommitFilter::new().between(Some(day("2025-01-03")), None);
        assert_eq!(since.apply(&commits).count(), 2);

        let until = CommitFilter::new().between(None, Some(day("2024-12-31")));
        assert_eq!(until.apply(&commits).count(), 1);
    }

    #[test]
    fn search_modes() {
        let mut commits = ten();
        commits[4].message = "Fix the FLUX capacitor".into();
        commits[6].files.push(ChangedFile {
            filename: "src/flux.rs".into(),
            status: None,
            additions: 0,
            deletions: 0,
        });

        let by_message = CommitFilter::new().search("flux", SearchMode::Message);
        let shas: Vec<&str> = by_message.apply(&commits).map(|c| c.sha.as_str()).collect();
        assert_eq!(shas, vec!["5"]);

        let by_files = CommitFilter::new().search("FLUX", SearchMode::Files);
        let shas: Vec<&str> = by_files.apply(&commits).map(|c| c.sha.as_str()).collect();
        assert_eq!(shas, vec!["7"]);

        let empty = CommitFilter::new().search("", SearchMode::Message);
        assert_eq!(empty.apply(&commits).count(), 10);
    }

    #[test]
    fn branch_is_exact() {
        let mut commits = ten();
        commits[0].branch = Some("main-2".into());
        assert_eq!(CommitFilter::new().branch("main").apply(&commits).count(), 9);
    }

    #[test]
    fn sorting_does_not_touch_source() {
        let commits = ten();
        let newest = select(&commits, &CommitFilter::new(), SortOrder::NewestFirst);
        assert_eq!(newest.first().unwrap().sha, "10");
        assert_eq!(newest.last().unwrap().sha, "8");

        let oldest = select(&commits, &CommitFilter::new(), SortOrder::OldestFirst);
        assert_eq!(oldest.first().unwrap().sha, "8");

        assert_eq!(commits[0].sha, "1");
        assert!(CommitFilter::new().is_empty());
        assert!(!CommitFilter::new().author("A").is_empty());
    }
}
