//! Request building for API clients.

use std::time::Duration;

use bytes::Bytes;
use http::{header::HeaderValue, HeaderMap, HeaderName, Method, Uri};
use serde::Serialize;

use crate::error::Error;
use crate::uri::UriExtension as _;
use crate::{response::Response, ApiClient, Authentication};

/// Copy the method, URI and headers of a request so they can travel with the response.
pub(crate) fn request_parts<B>(req: &http::Request<B>) -> http::request::Parts {
    let (mut parts, _) = http::Request::new(()).into_parts();
    parts.method = req.method().clone();
    parts.uri = req.uri().clone();
    parts.version = req.version();
    parts.headers = req.headers().clone();
    parts
}

/// A request under construction against an [ApiClient].
#[derive(Debug)]
pub struct RequestBuilder<A> {
    client: ApiClient<A>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<hyperdriver::Body>,
    timeout: Option<Duration>,
    error: Option<Error>,
}

impl<A> RequestBuilder<A> {
    /// Start a request for `method` on `uri`.
    pub fn new(client: ApiClient<A>, uri: Uri, method: Method) -> Self {
        Self {
            client,
            method,
            uri,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            error: None,
        }
    }

    /// The URI this request will be sent to.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Set a header, replacing any previous value.
    pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Append query parameters, form-encoded, after any already on the URI.
    pub fn query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.uri = self.uri.with_query(pairs);
        self
    }

    /// Give this request its own deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a raw request body.
    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(hyperdriver::Body::from(body.into()));
        self
    }

    /// Serialize `value` as the JSON request body.
    ///
    /// An encoding failure is reported when the request is sent.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                self.body = Some(hyperdriver::Body::from(Bytes::from(body)));
            }
            Err(error) => self.error = Some(Error::Encode(error)),
        }
        self
    }

    /// Send the request, returning the response whatever its status.
    pub async fn send(self) -> Result<Response, Error>
    where
        A: Authentication,
    {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut req = http::Request::builder()
            .method(self.method)
            .uri(self.uri)
            .body(self.body.unwrap_or_else(hyperdriver::Body::empty))?;
        req.headers_mut().extend(self.headers);

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.client.execute(req))
                .await
                .map_err(|_| Error::Timeout)?,
            None => self.client.execute(req).await,
        }
    }
}
