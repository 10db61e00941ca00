use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::reference::InvalidReference;

/// Errors surfaced by loading a repository's history.
#[derive(Debug, Error)]
pub enum Error {
    /// The input did not name a repository. Nothing was fetched.
    #[error(transparent)]
    InvalidReference(#[from] InvalidReference),

    /// Github's rate limit was hit. The fetch was abandoned and nothing was cached.
    #[error("Github rate limit exceeded{}", resets_at(.reset))]
    RateLimited {
        /// When the limit resets, if known.
        reset: Option<DateTime<Utc>>,
    },

    /// The token was rejected or lacks access to the repository.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Fetching failed part way. Partial results were discarded.
    #[error("Fetch failed{}: {source}", location(.branch, .page))]
    FetchFailed {
        /// Branch being fetched, absent while listing branches.
        branch: Option<String>,
        /// 1-based page number, if the failure belongs to a page.
        page: Option<usize>,
        /// The underlying failure
        #[source]
        source: FetchError,
    },

    /// A newer request started before this one finished.
    #[error("Superseded by a newer request")]
    Superseded,

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn resets_at(reset: &Option<DateTime<Utc>>) -> String {
    match reset {
        Some(reset) => format!(" (resets at {})", reset.format("%Y-%m-%d %H:%M:%S UTC")),
        None => String::new(),
    }
}

fn location(branch: &Option<String>, page: &Option<usize>) -> String {
    match (branch, page) {
        (Some(branch), Some(page)) => format!(" on branch {branch} page {page}"),
        (Some(branch), None) => format!(" on branch {branch}"),
        (None, Some(page)) => format!(" listing branches, page {page}"),
        (None, None) => String::new(),
    }
}

impl Error {
    /// Classify a Github failure seen while fetching `page` of `branch`.
    pub(crate) fn fetch(branch: Option<&str>, page: usize, error: octocat::Error) -> Self {
        match error {
            octocat::Error::RateLimited { reset } => Error::RateLimited { reset },
            octocat::Error::Unauthorized(message) => Error::Unauthorized(message),
            error => Error::FetchFailed {
                branch: branch.map(str::to_owned),
                page: Some(page),
                source: FetchError::Github(error),
            },
        }
    }

    /// True for [Error::Superseded], which callers should ignore.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Error::Superseded)
    }
}

/// The cause of [Error::FetchFailed].
#[derive(Debug, Error)]
pub enum FetchError {
    /// Github returned an error or could not be reached.
    #[error(transparent)]
    Github(octocat::Error),

    /// The whole fetch ran past its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Detail requests could no longer be scheduled.
    #[error("detail requests were cancelled")]
    Cancelled,
}

/// Errors reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Reading config from {path}")]
    Read {
        /// Config file path
        path: Utf8PathBuf,
        /// IO failure
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration.
    #[error("Parsing config from {path}")]
    Parse {
        /// Config file path
        path: Utf8PathBuf,
        /// TOML failure
        #[source]
        source: toml::de::Error,
    },
}
