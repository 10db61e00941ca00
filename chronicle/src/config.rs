use camino::Utf8Path;
use cache::CacheConfig;
use octocat::GithubConfig;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::fetch::FetchOptions;

/// Which Github API to read commits through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Api {
    /// REST, works anonymously within the public rate limit.
    #[default]
    Rest,
    /// GraphQL, requires a token.
    Graphql,
}

/// Top level configuration, usually read from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChronicleConfig {
    /// API used for commit history
    #[serde(default)]
    pub api: Api,

    /// Github client settings
    #[serde(default)]
    pub github: GithubConfig,

    /// Cache backend and freshness
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fetch tuning
    #[serde(default)]
    pub fetch: FetchOptions,
}

impl ChronicleConfig {
    /// Read configuration from a TOML file.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}
