use std::time::Duration;

use api_client::{Backoff, Secret};
use http::Uri;
use serde::Deserialize;

const GITHUB_BASE: &str = "https://api.github.com/";

fn default_base() -> Uri {
    Uri::from_static(GITHUB_BASE)
}

fn default_per_page() -> u8 {
    100
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_connect_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("commit-chronicle/", env!("CARGO_PKG_VERSION")).to_owned()
}

/// Configuration for the Github client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GithubConfig {
    /// Personal access token. Requests are anonymous without one.
    #[serde(default)]
    pub token: Option<Secret>,

    /// API root, for Github Enterprise installations.
    #[serde(default = "default_base", with = "api_client::uri::serde")]
    pub base: Uri,

    /// Items per page on list endpoints, at most 100.
    #[serde(default = "default_per_page")]
    pub per_page: u8,

    /// Limit for a single request, including reading the body.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Limit for establishing a connection.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// Sent as `User-Agent`, which Github requires.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Retry transient failures. Off unless configured.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base: default_base(),
            per_page: default_per_page(),
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            user_agent: default_user_agent(),
            retry: None,
        }
    }
}

impl GithubConfig {
    /// Fill in the token from `GITHUB_TOKEN` when none is configured.
    pub fn with_env_token(mut self) -> Self {
        if self.token.is_none() {
            self.token = Secret::from_env("GITHUB_TOKEN").ok();
        }
        self
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_exponent() -> u32 {
    2
}

fn default_max_delay_seconds() -> u64 {
    30
}

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// First delay
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Growth factor between attempts
    #[serde(default = "default_exponent")]
    pub exponent: u32,

    /// Give up once the delay would reach this
    #[serde(default = "default_max_delay_seconds")]
    pub max_delay_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            exponent: default_exponent(),
            max_delay_seconds: default_max_delay_seconds(),
        }
    }
}

impl RetryConfig {
    /// The backoff policy described by this configuration.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.initial_delay_ms),
            self.exponent,
            Duration::from_secs(self.max_delay_seconds),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_table() {
        let config: GithubConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.base, GITHUB_BASE);
        assert_eq!(config.per_page, 100);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert!(config.token.is_none());
        assert!(config.retry.is_none());
    }

    #[test]
    fn retry_section() {
        let config: GithubConfig = serde_json::from_value(serde_json::json!({
            "token": "ghp_abc",
            "retry": {"initial-delay-ms": 100}
        }))
        .unwrap();

        let retry = config.retry.unwrap();
        assert_eq!(retry.initial_delay_ms, 100);
        assert_eq!(retry.exponent, 2);
        assert_eq!(config.token.unwrap().revealed(), "ghp_abc");
    }
}
