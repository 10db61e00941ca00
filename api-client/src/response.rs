//! Response types for working with HTTP responses.

use bytes::Bytes;
use http_body_util::BodyExt as _;
use hyperdriver::Body;

use crate::error::{Error, HttpResponseError};

/// Wrapper around an HTTP response that keeps the request parts which
/// produced it, and collects the body on demand.
#[derive(Debug)]
pub struct Response {
    request: http::request::Parts,
    response: http::response::Parts,
    body: Body,
}

impl Response {
    /// Create a new `Response` instance.
    pub fn new(request: http::request::Parts, response: http::Response<Body>) -> Self {
        let (response, body) = response.into_parts();

        Self {
            request,
            response,
            body,
        }
    }

    /// Get the status code of the response.
    pub fn status(&self) -> http::StatusCode {
        self.response.status
    }

    /// Get the headers of the response.
    pub fn headers(&self) -> &http::HeaderMap {
        &self.response.headers
    }

    /// Get the URI of the request that generated the response.
    pub fn uri(&self) -> &http::Uri {
        &self.request.uri
    }

    /// Get the parts of the request that generated the response.
    pub fn request(&self) -> &http::request::Parts {
        &self.request
    }

    /// Convert the `Response` into an `http::Response` instance.
    pub fn into_response(self) -> http::Response<Body> {
        http::Response::from_parts(self.response, self.body)
    }

    /// Collect the whole body.
    pub async fn bytes(self) -> Result<Bytes, Error> {
        let collected = self
            .body
            .collect()
            .await
            .map_err(|error| Error::ResponseBody(error.into()))?;
        Ok(collected.to_bytes())
    }

    /// Collect the body as UTF-8 text.
    pub async fn text(self) -> Result<String, Error> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|error| Error::ResponseBody(error.into()))
    }

    /// Collect the body and deserialize it as JSON.
    pub async fn json<T>(self) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(Error::Decode)
    }

    /// Convert the `Response` into an `HttpResponseError` instance.
    pub async fn into_error(self) -> HttpResponseError {
        HttpResponseError::from_response(self).await
    }

    /// Convert the `Response` into an `HttpResponseError` unless the status is a success.
    pub async fn error_for_status(self) -> Result<Self, HttpResponseError> {
        if self.status().is_success() {
            Ok(self)
        } else {
            Err(self.into_error().await)
        }
    }
}
