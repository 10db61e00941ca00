use std::error::Error as StdError;
use std::fmt;

use tracing_error::SpanTrace;

/// What went wrong talking to a cache backend, independent of the backend.
///
/// A missing key is not an error: drivers return `Ok(None)` for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheErrorKind {
    /// The backend refused the credentials or the operation.
    ///
    /// **Retryable:** No, not until the credentials change.
    PermissionDenied,

    /// Reading or writing the backing store failed (disk, network).
    ///
    /// **Retryable:** Maybe, if the I/O issue is transient.
    Io,

    /// The backing service is temporarily unavailable.
    ///
    /// **Retryable:** Yes.
    ServiceUnavailable,

    /// The backend rejected the request as malformed.
    ///
    /// **Retryable:** No.
    InvalidRequest,

    /// A stored record could not be encoded or decoded.
    ///
    /// **Retryable:** No. The entry has to be rewritten.
    Serialization,

    /// Anything else.
    Other,
}

impl CacheErrorKind {
    /// Whether the same operation could succeed if tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheErrorKind::ServiceUnavailable | CacheErrorKind::Io)
    }
}

impl fmt::Display for CacheErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheErrorKind::PermissionDenied => write!(f, "permission denied"),
            CacheErrorKind::Io => write!(f, "I/O error"),
            CacheErrorKind::ServiceUnavailable => write!(f, "service unavailable"),
            CacheErrorKind::InvalidRequest => write!(f, "invalid request"),
            CacheErrorKind::Serialization => write!(f, "serialization error"),
            CacheErrorKind::Other => write!(f, "other error"),
        }
    }
}

/// An error from a cache backend.
///
/// Carries the kind, the engine which produced it, the key involved when
/// there was one, the underlying error, and the tracing spans active where it
/// was created.
///
/// # Example
///
/// ```rust
/// use cache_driver::{CacheError, CacheErrorKind};
///
/// fn read_entry() -> Result<Vec<u8>, CacheError> {
///     std::fs::read("cache/octo%2Fcat.json").map_err(|err| {
///         CacheError::builder("local", CacheErrorKind::Io, err)
///             .key("octo/cat")
///             .build()
///     })
/// }
/// ```
#[derive(Debug)]
pub struct CacheError {
    kind: CacheErrorKind,
    engine: &'static str,
    key: Option<String>,
    context: Option<String>,
    source: Box<dyn StdError + Send + Sync + 'static>,
    span_trace: SpanTrace,
}

impl StdError for CacheError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

impl CacheError {
    /// Create a new cache error with the minimum required information.
    ///
    /// For more control, use `CacheError::builder()`.
    #[track_caller]
    pub fn new<E>(engine: &'static str, kind: CacheErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self {
            kind,
            engine,
            key: None,
            context: None,
            source: error.into(),
            span_trace: SpanTrace::capture(),
        }
    }

    /// Create a builder to attach the key and context to an error.
    pub fn builder<E>(engine: &'static str, kind: CacheErrorKind, error: E) -> CacheErrorBuilder
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        CacheErrorBuilder {
            engine,
            kind,
            source: error.into(),
            key: None,
            context: None,
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> CacheErrorKind {
        self.kind
    }

    /// Returns the cache engine name.
    pub fn engine(&self) -> &'static str {
        self.engine
    }

    /// Returns the key being read or written, if available.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Returns additional context, if available.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Returns the tracing span context at the point the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cache error [{}] from {}", self.kind, self.engine)?;

        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }

        if let Some(context) = &self.context {
            write!(f, " ({})", context)?;
        }

        write!(f, ": {}", self.source)
    }
}

/// Builder for a [CacheError] with optional key and context.
#[derive(Debug)]
pub struct CacheErrorBuilder {
    kind: CacheErrorKind,
    engine: &'static str,
    source: Box<dyn StdError + Send + Sync + 'static>,
    key: Option<String>,
    context: Option<String>,
}

impl CacheErrorBuilder {
    /// Set the key involved.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set additional context.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Build the `CacheError`.
    #[track_caller]
    pub fn build(self) -> CacheError {
        CacheError {
            kind: self.kind,
            engine: self.engine,
            key: self.key,
            context: self.context,
            source: self.source,
            span_trace: SpanTrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_key_and_context() {
        let error = CacheError::builder(
            "remote",
            CacheErrorKind::ServiceUnavailable,
            "upstream closed the connection",
        )
        .key("octo/cat")
        .context("upsert")
        .build();

        assert_eq!(
            error.to_string(),
            "Cache error [service unavailable] from remote (key: octo/cat) (upsert): upstream closed the connection"
        );
        assert!(error.kind().is_retryable());
        assert_eq!(error.key(), Some("octo/cat"));
    }

    #[test]
    fn source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read only");
        let error = CacheError::new("local", CacheErrorKind::PermissionDenied, io);

        assert!(!error.kind().is_retryable());
        assert_eq!(error.source().unwrap().to_string(), "read only");
    }
}
