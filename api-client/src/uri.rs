//! URI utilities.

use camino::Utf8Path;
use http::uri::PathAndQuery;
use http::Uri;

/// Serialize and Deserialize a URI to and from a string.
pub mod serde {
    use http::Uri;
    use serde::{Deserialize as _, Deserializer};

    /// Deserialize a URI from a string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Uri, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }

    /// Serialize a URI as a string
    pub fn serialize<S>(uri: &Uri, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(uri)
    }
}

/// Extension trait for URIs.
pub trait UriExtension {
    /// Join a path to a URI, dropping any query the URI had.
    fn join<P: AsRef<str>>(self, path: P) -> Uri;

    /// Append form-encoded query pairs to a URI, keeping any existing ones.
    fn with_query<I, K, V>(self, pairs: I) -> Uri
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>;
}

impl UriExtension for Uri {
    fn join<P: AsRef<str>>(self, path: P) -> Uri {
        let mut parts = self.into_parts();

        let base = parts
            .path_and_query
            .as_ref()
            .map(|pq| pq.path())
            .unwrap_or("/");
        let joined = Utf8Path::new(base).join(path.as_ref());
        parts.path_and_query = Some(
            PathAndQuery::from_maybe_shared(joined.to_string())
                .expect("joined path is a valid URI path"),
        );
        Uri::from_parts(parts).expect("joined URI keeps its scheme and authority")
    }

    fn with_query<I, K, V>(self, pairs: I) -> Uri
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parts = self.into_parts();

        let (path, existing) = match parts.path_and_query.as_ref() {
            Some(pq) => (pq.path().to_owned(), pq.query().unwrap_or_default().to_owned()),
            None => ("/".to_owned(), String::new()),
        };

        let mut serializer = url::form_urlencoded::Serializer::for_suffix(existing, 0);
        for (key, value) in pairs {
            serializer.append_pair(key.as_ref(), value.as_ref());
        }
        let query = serializer.finish();

        let pq = if query.is_empty() {
            path
        } else {
            format!("{path}?{query}")
        };
        parts.path_and_query =
            Some(PathAndQuery::from_maybe_shared(pq).expect("form encoding yields a valid query"));
        Uri::from_parts(parts).expect("URI keeps its scheme and authority")
    }
}
