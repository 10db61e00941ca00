use std::time::Duration;

use http::StatusCode;
use hyperdriver::Body;
use tower::retry::Policy;

/// A policy for retrying requests with exponential backoff
///
/// Retries server errors, gateway/request timeouts, rate limits and
/// transport failures. Authorization failures are never retried.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// The delay before the next retry
    pub delay: Duration,

    /// The factor to grow the delay by after each retry
    pub exponent: u32,

    /// Give up once the delay would reach this value
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 2, Duration::from_secs(30))
    }
}

impl Backoff {
    /// Create a new backoff policy.
    pub fn new(delay: Duration, exponent: u32, max_delay: Duration) -> Self {
        Self {
            delay,
            exponent,
            max_delay,
        }
    }

    /// The policy for the attempt after this one, or `None` once it is exhausted.
    pub fn increment(&self) -> Option<Self> {
        if self.delay >= self.max_delay {
            return None;
        }

        let delay = self.delay.checked_mul(self.exponent)?;
        Some(Self {
            delay,
            exponent: self.exponent,
            max_delay: self.max_delay,
        })
    }

    /// Honour a server supplied delay, as long as it is within the policy's limit.
    pub fn rate_limited(&self, delay: Duration) -> Option<Self> {
        if delay > self.max_delay {
            return None;
        }

        Some(Self {
            delay,
            exponent: self.exponent,
            max_delay: self.max_delay,
        })
    }
}

fn retry_after(response: &http::Response<Body>) -> Option<Duration> {
    response
        .headers()
        .get(http::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

impl<E> Policy<http::Request<Body>, http::Response<Body>, E> for Backoff {
    type Future = tokio::time::Sleep;

    fn retry(
        &mut self,
        req: &mut http::Request<Body>,
        result: &mut Result<http::Response<Body>, E>,
    ) -> Option<Self::Future> {
        if self.delay >= self.max_delay {
            return None;
        }

        let wait = match result {
            Ok(res) => match res.status() {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return None,
                StatusCode::TOO_MANY_REQUESTS => {
                    tracing::debug!("retrying request to {} due to rate limit", req.uri());
                    match retry_after(res) {
                        Some(delay) => self.rate_limited(delay)?.delay,
                        None => self.delay,
                    }
                }
                StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => {
                    tracing::debug!("retrying request to {} due to timeout", req.uri());
                    self.delay
                }
                status if status.is_server_error() => {
                    tracing::debug!("retrying request to {} due to server error", req.uri());
                    self.delay
                }
                _ => return None,
            },
            Err(_) => {
                tracing::warn!("retrying request to {} due to error", req.uri());
                self.delay
            }
        };

        *self = self.increment().unwrap_or_else(|| Self {
            delay: self.max_delay,
            exponent: self.exponent,
            max_delay: self.max_delay,
        });
        Some(tokio::time::sleep(wait))
    }

    fn clone_request(&mut self, req: &http::Request<Body>) -> Option<http::Request<Body>> {
        let body = req.body().try_clone()?;

        let mut next = http::Request::new(body);
        *next.method_mut() = req.method().clone();
        *next.uri_mut() = req.uri().clone();
        *next.version_mut() = req.version();
        *next.headers_mut() = req.headers().clone();
        *next.extensions_mut() = req.extensions().clone();

        Some(next)
    }
}
