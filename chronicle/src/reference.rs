//! Repository references: `owner/repo`, or a link to the repository.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// Input which does not name a repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Not a repository reference: {input:?} (expected owner/repo or a github.com URL)")]
pub struct InvalidReference {
    input: String,
}

impl InvalidReference {
    /// The rejected input.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// A repository on Github, identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    owner: String,
    repo: String,
}

impl RepoRef {
    /// Build a reference from its parts, validating each segment.
    pub fn new(owner: &str, repo: &str) -> Result<Self, InvalidReference> {
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        if !valid_segment(owner) || !valid_segment(repo) {
            return Err(InvalidReference {
                input: format!("{owner}/{repo}"),
            });
        }

        Ok(Self {
            owner: owner.to_owned(),
            repo: repo.to_owned(),
        })
    }

    /// Parse free text.
    ///
    /// Links to `github.com` use their first two path segments, so
    /// `https://github.com/octo/cat/tree/main` is `octo/cat`. Anything else
    /// uses its last two `/`-separated segments.
    pub fn parse(input: &str) -> Result<Self, InvalidReference> {
        let invalid = || InvalidReference {
            input: input.to_owned(),
        };

        let text = input.trim();
        let (owner, repo) = match github_path(text) {
            Some(segments) => first_two(&segments),
            None => last_two(text),
        }
        .ok_or_else(invalid)?;

        Self::new(&owner, &repo).map_err(|_| invalid())
    }

    /// Account or organization which owns the repository.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Key for the cached aggregate.
    pub fn cache_key(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Web page for the repository.
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '?' | '#' | '/'))
}

fn github_path(text: &str) -> Option<Vec<String>> {
    let url = if GITHUB_HOSTS
        .iter()
        .any(|host| text.starts_with(&format!("{host}/")))
    {
        Url::parse(&format!("https://{text}")).ok()?
    } else {
        Url::parse(text).ok()?
    };

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?;
    if !GITHUB_HOSTS.contains(&host) {
        return None;
    }

    Some(
        url.path_segments()?
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect(),
    )
}

fn first_two(segments: &[String]) -> Option<(String, String)> {
    match segments {
        [owner, repo, ..] => Some((owner.clone(), repo.clone())),
        _ => None,
    }
}

fn last_two(text: &str) -> Option<(String, String)> {
    // Query and fragment never name the repository.
    let text = text.split(['?', '#']).next().unwrap_or_default();
    let mut segments = text.rsplit('/').filter(|segment| !segment.is_empty());
    let repo = segments.next()?;
    let owner = segments.next()?;
    Some((owner.to_owned(), repo.to_owned()))
}

impl FromStr for RepoRef {
    type Err = InvalidReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoRef::parse(s)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
