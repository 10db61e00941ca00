//! Views derived from any set of commits, filtered or not.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::commit::Commit;

/// Commits per UTC calendar day.
pub fn timeline<'c>(commits: impl IntoIterator<Item = &'c Commit>) -> BTreeMap<NaiveDate, usize> {
    let mut days = BTreeMap::new();
    for commit in commits {
        *days.entry(commit.day()).or_default() += 1;
    }
    days
}

/// Commits per author name, most active first.
pub fn authors<'c>(commits: impl IntoIterator<Item = &'c Commit>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for commit in commits {
        *counts.entry(commit.author()).or_default() += 1;
    }

    let mut authors: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_owned(), count))
        .collect();
    authors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    authors
}

/// Commits per day and author, for stacked series.
pub fn author_timeline<'c>(
    commits: impl IntoIterator<Item = &'c Commit>,
) -> BTreeMap<NaiveDate, BTreeMap<String, usize>> {
    let mut days: BTreeMap<NaiveDate, BTreeMap<String, usize>> = BTreeMap::new();
    for commit in commits {
        *days
            .entry(commit.day())
            .or_default()
            .entry(commit.author().to_owned())
            .or_default() += 1;
    }
    days
}

/// Someone who authored commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    /// Github login, when the commits are linked to an account.
    pub login: Option<String>,

    /// Author name from the most recent commit.
    pub name: String,

    /// Number of commits.
    pub commits: usize,

    /// Avatar image
    pub avatar_url: Option<String>,

    /// Profile page
    pub profile_url: Option<String>,
}

/// Contributors, grouped by login (or by name when unlinked), most active first.
pub fn contributors<'c>(commits: impl IntoIterator<Item = &'c Commit>) -> Vec<Contributor> {
    let mut grouped: HashMap<String, (Contributor, DateTime<Utc>)> = HashMap::new();

    for commit in commits {
        let key = match &commit.author_login {
            Some(login) => format!("@{login}"),
            None => commit.author().to_owned(),
        };

        let (contributor, latest) = grouped.entry(key).or_insert_with(|| {
            let login = commit.author_login.clone();
            let contributor = Contributor {
                avatar_url: commit.author_avatar.clone().or_else(|| {
                    login
                        .as_ref()
                        .map(|login| format!("https://github.com/{login}.png"))
                }),
                profile_url: commit
                    .author_url
                    .clone()
                    .or_else(|| login.as_ref().map(|login| format!("https://github.com/{login}"))),
                login,
                name: commit.author().to_owned(),
                commits: 0,
            };
            (contributor, commit.author_date)
        });

        contributor.commits += 1;
        if commit.author_date > *latest {
            *latest = commit.author_date;
            contributor.name = commit.author().to_owned();
        }
    }

    let mut contributors: Vec<Contributor> =
        grouped.into_values().map(|(contributor, _)| contributor).collect();
    contributors.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.name.cmp(&b.name)));
    contributors
}

/// Headline numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of commit records
    pub commits: usize,

    /// Distinct days with at least one commit
    pub active_days: usize,

    /// Distinct contributors
    pub contributors: usize,

    /// Earliest author date
    pub first: Option<DateTime<Utc>>,

    /// Latest author date
    pub last: Option<DateTime<Utc>>,
}

impl Summary {
    /// Summarize `commits`.
    pub fn of<'c>(commits: impl IntoIterator<Item = &'c Commit>) -> Self {
        let mut summary = Summary {
            commits: 0,
            active_days: 0,
            contributors: 0,
            first: None,
            last: None,
        };
        let mut days = HashSet::new();
        let mut people = HashSet::new();

        for commit in commits {
            summary.commits += 1;
            days.insert(commit.day());
            people.insert(commit.author_login.as_deref().unwrap_or(commit.author()));
            let date = commit.author_date;
            summary.first = Some(summary.first.map_or(date, |first| first.min(date)));
            summary.last = Some(summary.last.map_or(date, |last| last.max(date)));
        }

        summary.active_days = days.len();
        summary.contributors = people.len();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::commit;

    fn sample() -> Vec<Commit> {
        let mut unlinked = commit("4", "Bot", "2025-01-02T08:00:00Z");
        unlinked.author_login = None;

        vec![
            commit("1", "Ada", "2025-01-01T09:00:00Z"),
            commit("2", "Ada", "2025-01-01T17:00:00Z"),
            commit("3", "Grace", "2025-01-02T09:00:00Z"),
            unlinked,
        ]
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn commits_per_day() {
        let days = timeline(&sample());
        assert_eq!(days.len(), 2);
        assert_eq!(days[&day("2025-01-01")], 2);
        assert_eq!(days[&day("2025-01-02")], 2);
    }

    #[test]
    fn authors_most_active_first() {
        assert_eq!(
            authors(&sample()),
            vec![
                ("Ada".to_owned(), 2),
                ("Bot".to_owned(), 1),
                ("Grace".to_owned(), 1)
            ]
        );
    }

    #[test]
    fn day_by_author() {
        let matrix = author_timeline(&sample());
        assert_eq!(matrix[&day("2025-01-01")]["Ada"], 2);
        assert_eq!(matrix[&day("2025-01-02")]["Grace"], 1);
        assert!(!matrix[&day("2025-01-01")].contains_key("Grace"));
    }

    #[test]
    fn contributors_by_login() {
        let mut commits = sample();
        commits[1].author_name = "Ada Lovelace".into();

        let contributors = contributors(&commits);
        assert_eq!(contributors.len(), 3);

        let ada = &contributors[0];
        assert_eq!(ada.login.as_deref(), Some("ada"));
        assert_eq!(ada.name, "Ada Lovelace");
        assert_eq!(ada.commits, 2);
        assert_eq!(ada.profile_url.as_deref(), Some("https://github.com/ada"));

        let bot = contributors.iter().find(|c| c.name == "Bot").unwrap();
        assert!(bot.login.is_none());
        assert!(bot.avatar_url.is_none());
    }

    #[test]
    fn summary_counts() {
        let summary = Summary::of(&sample());
        assert_eq!(summary.commits, 4);
        assert_eq!(summary.active_days, 2);
        assert_eq!(summary.contributors, 3);
        assert_eq!(summary.first.unwrap().to_rfc3339(), "2025-01-01T09:00:00+00:00");

        let empty = Summary::of(&Vec::<Commit>::new());
        assert_eq!(empty.commits, 0);
        assert!(empty.last.is_none());
    }
}
