//! An in-process stand-in for an HTTP service, for tests.
//!
//! Routes are matched on method, path and query parameters. Every request
//! the service receives is recorded so tests can assert on exactly what
//! was sent.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::BodyExt as _;
use parking_lot::Mutex;
use serde::Serialize;

/// A request as seen by the [MockService].
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Request method
    pub method: Method,

    /// Full request URI
    pub uri: Uri,

    /// Request headers
    pub headers: HeaderMap,

    /// Collected request body
    pub body: Bytes,
}

impl MockRequest {
    /// The request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The decoded query parameters, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.uri.query().unwrap_or_default().as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    /// The first value of a query parameter.
    pub fn query(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Decode the request body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl MockResponse {
    /// A response with the given status, headers and body.
    pub fn new<B: Into<Bytes>>(status: StatusCode, headers: HeaderMap, body: B) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// An empty response with just a status.
    pub fn status(status: StatusCode) -> Self {
        Self::new(status, HeaderMap::new(), Bytes::new())
    }

    /// A JSON response.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self::new(status, headers, body)
    }

    /// Add a header to the response.
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(
            http::HeaderName::from_static(name),
            http::HeaderValue::from_static(value),
        );
        self
    }

    fn to_http(&self) -> http::Response<hyperdriver::Body> {
        let mut response = http::Response::new(hyperdriver::Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }
}

type Handler = Arc<dyn Fn(&MockRequest) -> MockResponse + Send + Sync>;

struct Route {
    method: Option<Method>,
    path: String,
    query: Vec<(String, String)>,
    handler: Handler,
}

impl Route {
    fn matches(&self, request: &MockRequest) -> bool {
        if self.method.as_ref().is_some_and(|m| *m != request.method) {
            return false;
        }

        if self.path != request.path() {
            return false;
        }

        let pairs = request.query_pairs();
        self.query.iter().all(|wanted| pairs.contains(wanted))
    }
}

/// A tower service which answers requests from a table of routes.
///
/// Clones share the same routes and request log. Requests with no matching
/// route get a `404`.
#[derive(Clone, Default)]
pub struct MockService {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl fmt::Debug for MockService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockService")
            .field("routes", &self.routes.lock().len())
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

impl MockService {
    /// A service with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any request for `path` with a fixed response.
    pub fn add<B: Into<Bytes>>(&self, path: &str, status: StatusCode, headers: HeaderMap, body: B) {
        let response = MockResponse::new(status, headers, body);
        self.route(None, path, &[], move |_| response.clone());
    }

    /// Answer requests for `path` carrying all of `query` with a JSON body.
    ///
    /// When several routes match, the one naming the most query parameters wins.
    pub fn add_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        status: StatusCode,
        value: &T,
    ) {
        let response = MockResponse::json(status, value);
        self.route(None, path, query, move |_| response.clone());
    }

    /// Answer requests with a handler, which sees the full request.
    pub fn route<F>(&self, method: Option<Method>, path: &str, query: &[(&str, &str)], handler: F)
    where
        F: Fn(&MockRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.routes.lock().push(Route {
            method,
            path: path.to_owned(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            handler: Arc::new(handler),
        });
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// How many requests were made for `path`.
    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.path() == path)
            .count()
    }

    fn respond(&self, request: &MockRequest) -> MockResponse {
        let handler = self
            .routes
            .lock()
            .iter()
            .filter(|route| route.matches(request))
            .max_by_key(|route| route.query.len())
            .map(|route| route.handler.clone());

        match handler {
            Some(handler) => handler(request),
            None => {
                tracing::warn!(method = %request.method, uri = %request.uri, "no mock route");
                MockResponse::new(
                    StatusCode::NOT_FOUND,
                    HeaderMap::new(),
                    format!("no mock route for {} {}", request.method, request.uri),
                )
            }
        }
    }
}

impl tower::Service<http::Request<hyperdriver::Body>> for MockService {
    type Response = http::Response<hyperdriver::Body>;
    type Error = hyperdriver::client::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<hyperdriver::Body>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = body
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();

            let request = MockRequest {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                body,
            };

            let response = service.respond(&request);
            service.requests.lock().push(request);
            Ok(response.to_http())
        })
    }
}
