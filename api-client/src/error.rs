//! Error types for API Clients
use std::fmt;

use http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::response::Response;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error occured while sending or recieving an HTTP request
#[derive(Debug, Error)]
pub enum Error {
    /// The server answered with a non-success status
    #[error(transparent)]
    Response(HttpResponseError),

    /// An error occured while recieving the response body
    #[error("Error reading response body: {0}")]
    ResponseBody(#[source] BoxError),

    /// An error occured while sending the request
    #[error(transparent)]
    Request(hyperdriver::client::Error),

    /// The request could not be assembled
    #[error("Building request: {0}")]
    Build(#[from] http::Error),

    /// The request body could not be encoded
    #[error("Encoding request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body was not the expected JSON
    #[error("Decoding response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// No response arrived within the per-request timeout
    #[error("Request timed out")]
    Timeout,
}

impl Error {
    /// The HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Response(error) => Some(error.status),
            _ => None,
        }
    }
}

impl From<HttpResponseError> for Error {
    fn from(error: HttpResponseError) -> Self {
        Error::Response(error)
    }
}

/// A server returned an error response
#[derive(Debug, Clone)]
pub struct HttpResponseError {
    /// The HTTP status code of the response
    pub status: StatusCode,

    /// The response headers, kept for rate limit and retry hints
    pub headers: HeaderMap,

    /// The message body of the response
    pub message: String,
}

impl HttpResponseError {
    /// Create a new HTTP response error from a response
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let message = response
            .text()
            .await
            .unwrap_or_else(|err| format!("Failed to read response body: {}", err));

        Self {
            status,
            headers,
            message,
        }
    }

    /// Look up a response header as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

impl fmt::Display for HttpResponseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HTTP {} response: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpResponseError {}
