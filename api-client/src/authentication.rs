//! Authentication for API clients.
//!
//! The `Authentication` trait is used to authenticate with an API queried via the `ApiClient`.
//!
//! Implementations are provided for:
//! - `BearerAuth` for Bearer token authentication
//! - `ApiKeyAuth` for services which want a key header alongside the bearer token
//! - `Option<A>` for optional credentials
//! - `()` for no authentication

use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use tower::layer::Layer;

use crate::Secret;

/// Trait to represent authenticating with an API queried via the `ApiClient`.
pub trait Authentication: Clone {
    /// Called by the `ApiClient` to implement authorization.
    fn authenticate<B>(&self, req: http::Request<B>) -> http::Request<B>;
}

/// Authentication with a bearer token, often used with an API key.
///
/// The token is stored as a [Secret] to prevent it from being logged.
///
/// # Example
/// ```rust
/// use api_client::BearerAuth;
///
/// let auth = BearerAuth::new("my-secret");
/// let header = auth.header_value().unwrap();
///
/// assert_eq!(header.to_str().unwrap(), "Bearer my-secret");
/// ```
#[derive(Debug, Clone)]
pub struct BearerAuth(Secret);

impl BearerAuth {
    /// Create a new Bearer authentication with a given key.
    pub fn new<K: Into<Secret>>(key: K) -> Self {
        BearerAuth(key.into())
    }

    /// Get the header value for the Bearer token.
    pub fn header_value(&self) -> Option<HeaderValue> {
        self.0.bearer().ok()
    }
}

impl Authentication for BearerAuth {
    fn authenticate<B>(&self, mut req: http::Request<B>) -> http::Request<B> {
        if req.headers().contains_key(http::header::AUTHORIZATION) {
            tracing::warn!("{} header already set", http::header::AUTHORIZATION);
            return req;
        }

        match self.header_value() {
            Some(value) => {
                req.headers_mut()
                    .append(http::header::AUTHORIZATION, value);
            }
            None => tracing::error!("bearer token is not a valid header value, sending without it"),
        }
        req
    }
}

/// Authentication for PostgREST style services: the key goes in an `apikey`
/// header and is also sent as the bearer token.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    header: HeaderName,
    bearer: BearerAuth,
    key: Secret,
}

impl ApiKeyAuth {
    /// Authenticate with `key` in the `apikey` header.
    pub fn new<K: Into<Secret>>(key: K) -> Self {
        Self::with_header(HeaderName::from_static("apikey"), key)
    }

    /// Authenticate with `key` in a custom header.
    pub fn with_header<K: Into<Secret>>(header: HeaderName, key: K) -> Self {
        let key = key.into();
        Self {
            header,
            bearer: BearerAuth::new(key.clone()),
            key,
        }
    }
}

impl Authentication for ApiKeyAuth {
    fn authenticate<B>(&self, mut req: http::Request<B>) -> http::Request<B> {
        if let Ok(value) = self.key.to_header() {
            req.headers_mut().insert(self.header.clone(), value);
        }
        self.bearer.authenticate(req)
    }
}

impl<A> Authentication for Option<A>
where
    A: Authentication,
{
    fn authenticate<B>(&self, req: http::Request<B>) -> http::Request<B> {
        match self {
            Some(auth) => auth.authenticate(req),
            None => req,
        }
    }
}

impl Authentication for () {
    fn authenticate<B>(&self, req: http::Request<B>) -> http::Request<B> {
        req
    }
}

/// A layer which applies an authentication mechanism to every request.
#[derive(Debug)]
pub struct AuthenticationLayer<A> {
    auth: Arc<A>,
}

impl<A> Clone for AuthenticationLayer<A> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
        }
    }
}

impl<A> AuthenticationLayer<A> {
    pub(crate) fn new(auth: Arc<A>) -> Self {
        Self { auth }
    }
}

impl<A, S> Layer<S> for AuthenticationLayer<A> {
    type Service = AuthenticationService<A, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticationService {
            inner,
            auth: self.auth.clone(),
        }
    }
}

/// A service which authenticates requests before passing them on.
#[derive(Debug)]
pub struct AuthenticationService<A, S> {
    inner: S,
    auth: Arc<A>,
}

impl<A, S: Clone> Clone for AuthenticationService<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            auth: self.auth.clone(),
        }
    }
}

impl<A, S, BIn, BOut> tower::Service<http::Request<BIn>> for AuthenticationService<A, S>
where
    A: Authentication,
    S: tower::Service<http::Request<BIn>, Response = http::Response<BOut>>,
    S::Future: Send + 'static,
{
    type Response = http::Response<BOut>;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<BIn>) -> Self::Future {
        let req = self.auth.authenticate(req);
        self.inner.call(req)
    }
}
