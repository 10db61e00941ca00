//! Client for reading repository history from the Github API.
//!
//! Both the REST and the GraphQL APIs are supported. List endpoints come back
//! as [Paginated] streams which fetch one page per poll.

use api_client::response::Response;
use api_client::{ApiClient, BearerAuth, HttpResponseError, Paginated, RequestBuilder};

use chrono::{DateTime, Utc};
use http::header;
use http::{HeaderName, HeaderValue, StatusCode};
use hyperdriver::client::conn::transport::tcp::TcpTransportConfig;
use hyperdriver::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tower_http::set_header::SetRequestHeaderLayer;

mod config;
pub mod graphql;
pub mod models;
mod rest;

pub use crate::config::{GithubConfig, RetryConfig};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_API_VERSION_HEADER: &str = "x-github-api-version";
const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATELIMIT_RESET: &str = "x-ratelimit-reset";
const RETRY_AFTER: &str = "retry-after";

/// Errors that can occur when using the Github client.
#[derive(Debug, Error)]
pub enum Error {
    /// The rate limit is exhausted until `reset`.
    #[error("Github rate limit exceeded")]
    RateLimited {
        /// When the limit resets, if Github said.
        reset: Option<DateTime<Utc>>,
    },

    /// The token is missing, invalid or lacks access.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The repository, branch or commit does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conditional request came back without a body.
    #[error("Not modified: {0}")]
    NotModified(String),

    /// The GraphQL API reported an error.
    #[error("GraphQL: {0}")]
    GraphQl(String),

    /// Any other failure sending the request or reading the response.
    #[error("Request: {0}")]
    Request(#[source] api_client::Error),
}

impl Error {
    /// True when retrying after the rate limit resets could succeed.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}

fn reset_time(response: &HttpResponseError) -> Option<DateTime<Utc>> {
    if let Some(reset) = response.header(RATELIMIT_RESET) {
        let seconds = reset.trim().parse::<i64>().ok()?;
        return DateTime::from_timestamp(seconds, 0);
    }

    let wait = response.header(RETRY_AFTER)?.trim().parse::<i64>().ok()?;
    Some(Utc::now() + chrono::Duration::seconds(wait))
}

/// Github signals both the primary and the secondary rate limit with a 403.
fn is_rate_limit(response: &HttpResponseError) -> bool {
    response.header(RATELIMIT_REMAINING) == Some("0")
        || response.header(RETRY_AFTER).is_some()
        || response.message.to_ascii_lowercase().contains("rate limit")
}

fn classify(response: &HttpResponseError) -> Option<Error> {
    match response.status {
        StatusCode::TOO_MANY_REQUESTS => Some(Error::RateLimited {
            reset: reset_time(response),
        }),
        StatusCode::FORBIDDEN if is_rate_limit(response) => {
            Some(Error::RateLimited {
                reset: reset_time(response),
            })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(Error::Unauthorized(response.message.clone()))
        }
        StatusCode::NOT_FOUND => Some(Error::NotFound(response.message.clone())),
        _ => None,
    }
}

impl From<api_client::Error> for Error {
    fn from(error: api_client::Error) -> Self {
        let classified = match &error {
            api_client::Error::Response(response) => classify(response),
            _ => None,
        };
        classified.unwrap_or(Error::Request(error))
    }
}

impl From<HttpResponseError> for Error {
    fn from(error: HttpResponseError) -> Self {
        api_client::Error::from(error).into()
    }
}

/// A Github client that can be used to make requests against the Github API,
/// optionally authenticated with a personal access token.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: ApiClient<Option<BearerAuth>>,
    per_page: u8,
}

impl GithubClient {
    /// Create a new Github client from configuration.
    pub fn new(config: &GithubConfig) -> Self {
        let mut tcp = TcpTransportConfig::default();
        tcp.connect_timeout = Some(config.connect_timeout());

        let client = Client::builder()
            .layer(SetRequestHeaderLayer::if_not_present(
                header::ACCEPT,
                HeaderValue::from_static(GITHUB_ACCEPT),
            ))
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static(GITHUB_API_VERSION_HEADER),
                HeaderValue::from_static(GITHUB_API_VERSION),
            ))
            .with_tcp(tcp)
            .with_auto_http()
            .with_default_tls()
            .with_user_agent(config.user_agent.clone())
            .with_timeout(config.timeout())
            .build_service();

        Self::new_with_inner_service(config, client)
    }

    /// Create a new Github client which sends requests through `inner`.
    pub fn new_with_inner_service<S>(config: &GithubConfig, inner: S) -> Self
    where
        S: tower::Service<
                http::Request<hyperdriver::Body>,
                Response = http::Response<hyperdriver::Body>,
                Error = hyperdriver::client::Error,
            > + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        let auth = config
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .map(BearerAuth::new);
        let base = config.base.clone();

        let client = match &config.retry {
            Some(retry) => ApiClient::new_with_retry(base, auth, inner, retry.backoff()),
            None => ApiClient::new_with_inner_service(base, auth, inner),
        };

        Self {
            client,
            per_page: config.per_page.clamp(1, 100),
        }
    }

    /// Whether requests carry a token.
    pub fn is_authenticated(&self) -> bool {
        self.client.auth().is_some()
    }

    /// Items requested per page from list endpoints.
    pub fn per_page(&self) -> u8 {
        self.per_page
    }

    /// Build a GET request against a Github endpoint.
    pub fn get(&self, endpoint: &str) -> RequestBuilder<Option<BearerAuth>> {
        self.client.get(endpoint)
    }

    /// Build a POST request against a Github endpoint.
    pub fn post(&self, endpoint: &str) -> RequestBuilder<Option<BearerAuth>> {
        self.client.post(endpoint)
    }

    /// Send a request and decode its JSON body. `Ok(None)` means the server
    /// answered `304 Not Modified`.
    pub async fn send_json<T>(
        &self,
        request: RequestBuilder<Option<BearerAuth>>,
    ) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        let response: Response = request.send().await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            tracing::debug!(uri = %response.uri(), "not modified");
            return Ok(None);
        }

        let response = response.error_for_status().await?;
        Ok(Some(response.json().await?))
    }
}

/// Pages of items from a Github list endpoint.
pub type Pages<T> = Paginated<'static, T, Error>;
