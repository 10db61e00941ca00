//! A small HTTP API client built on hyperdriver and tower.
//!
//! [ApiClient] joins endpoints onto a base URL, applies an [Authentication]
//! mechanism to every request, and optionally retries with [Backoff].

use std::sync::Arc;

use http::Method;
use http::Uri;
use hyperdriver::service::SharedService;
use tower::ServiceExt;

mod authentication;
pub mod error;
pub mod mock;
mod paginate;
pub mod request;
pub mod response;
mod retry;
mod secret;
pub mod uri;

pub use self::authentication::{
    ApiKeyAuth, Authentication, AuthenticationLayer, AuthenticationService, BearerAuth,
};
pub use self::error::{Error, HttpResponseError};
pub use self::paginate::{paginate, Page, Paginated};
pub use self::request::RequestBuilder;
use self::response::Response;
pub use self::retry::Backoff;
pub use self::secret::Secret;
use self::uri::UriExtension as _;

const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// A client for accessing APIs over HTTP / HTTPS
///
/// Useful inner object to wrap for individual API clients.
#[derive(Debug, Clone)]
pub struct ApiClient<A> {
    base: Arc<Uri>,
    inner: hyperdriver::client::SharedClientService<hyperdriver::Body, hyperdriver::Body>,
    authentication: Arc<A>,
}

impl<A> ApiClient<A>
where
    A: Authentication + Send + Sync + 'static,
{
    /// Create a new API Client from a base URL and an authentication method
    pub fn new(base: Uri, authentication: A) -> Self {
        let mut builder = hyperdriver::Client::build_tcp_http();
        builder.transport().config_mut().connect_timeout = Some(CONNECT_TIMEOUT);
        let inner = builder.with_default_tls().build_service();

        Self::new_with_inner_service(base, authentication, inner)
    }

    /// Create a new API Client which sends requests through `inner`.
    pub fn new_with_inner_service<S>(base: Uri, authentication: A, inner: S) -> Self
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
        let authentication = Arc::new(authentication);

        let service = tower::ServiceBuilder::new()
            .layer(SharedService::layer())
            .layer(AuthenticationLayer::new(authentication.clone()))
            .service(inner);

        ApiClient {
            base: Arc::new(base),
            inner: service,
            authentication,
        }
    }

    /// Create a new API Client which retries failed requests through `inner`
    /// according to `backoff`.
    pub fn new_with_retry<S>(base: Uri, authentication: A, inner: S, backoff: Backoff) -> Self
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
        let authentication = Arc::new(authentication);

        let service = tower::ServiceBuilder::new()
            .layer(SharedService::layer())
            .layer(AuthenticationLayer::new(authentication.clone()))
            .layer(tower::retry::RetryLayer::new(backoff))
            .service(inner);

        ApiClient {
            base: Arc::new(base),
            inner: service,
            authentication,
        }
    }
}

impl<A> ApiClient<A> {
    /// The URL endpoints are joined onto.
    pub fn base(&self) -> &Uri {
        &self.base
    }

    /// The authentication applied to each request.
    pub fn auth(&self) -> &A {
        &self.authentication
    }
}

impl ApiClient<BearerAuth> {
    /// Create a client which sends `token` as a bearer token.
    pub fn new_bearer_auth<K: Into<Secret>>(base: Uri, token: K) -> Self {
        Self::new(base, BearerAuth::new(token.into()))
    }
}

impl<A> ApiClient<A>
where
    A: Authentication,
{
    /// Start a request with an explicit method.
    pub fn request(&self, method: Method, endpoint: &str) -> RequestBuilder<A> {
        let url = (*self.base).clone().join(endpoint);
        RequestBuilder::new(self.clone(), url, method)
    }

    /// Start a GET request against an endpoint relative to the base.
    pub fn get(&self, endpoint: &str) -> RequestBuilder<A> {
        self.request(Method::GET, endpoint)
    }

    /// Start a POST request against an endpoint relative to the base.
    pub fn post(&self, endpoint: &str) -> RequestBuilder<A> {
        self.request(Method::POST, endpoint)
    }

    /// Start a DELETE request against an endpoint relative to the base.
    pub fn delete(&self, endpoint: &str) -> RequestBuilder<A> {
        self.request(Method::DELETE, endpoint)
    }

    /// Send a fully built request.
    pub async fn execute(&self, req: http::Request<hyperdriver::Body>) -> Result<Response, Error> {
        let parts = request::request_parts(&req);

        let response = self
            .inner
            .clone()
            .oneshot(req)
            .await
            .map_err(Error::Request)?;
        Ok(Response::new(parts, response))
    }
}
