use api_client::{ApiClient, ApiKeyAuth, Secret};
use http::{HeaderName, HeaderValue, StatusCode, Uri};
use serde::Deserialize;

use cache_driver::{CacheError, CacheErrorKind, Driver, Record};

const ENGINE: &str = "remote";
const SELECT: &str = "key,data,timestamp";

fn default_table() -> String {
    "commit_cache".to_owned()
}

/// Connection details for a PostgREST style cache table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteConfig {
    /// Project URL; the table is served under `rest/v1/`.
    #[serde(with = "api_client::uri::serde")]
    pub url: Uri,

    /// API key, sent as `apikey` and as the bearer token.
    pub key: Secret,

    /// Table with `key`, `data` and `timestamp` columns, unique on `key`.
    #[serde(default = "default_table")]
    pub table: String,
}

fn request_error(key: &str, context: &'static str, err: api_client::Error) -> CacheError {
    let kind = match err.status() {
        Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => CacheErrorKind::PermissionDenied,
        Some(status) if status.is_server_error() => CacheErrorKind::ServiceUnavailable,
        Some(_) => CacheErrorKind::InvalidRequest,
        None => match err {
            api_client::Error::Decode(_) | api_client::Error::Encode(_) => {
                CacheErrorKind::Serialization
            }
            _ => CacheErrorKind::Io,
        },
    };

    CacheError::builder(ENGINE, kind, err)
        .key(key)
        .context(context)
        .build()
}

/// Cache driver backed by a remote table behind a PostgREST API.
#[derive(Debug, Clone)]
pub struct RemoteDriver {
    client: ApiClient<ApiKeyAuth>,
    table: String,
}

impl RemoteDriver {
    /// Connect to the table described by `config`.
    pub fn new(config: RemoteConfig) -> Self {
        let client = ApiClient::new(config.url, ApiKeyAuth::new(config.key));
        Self::with_client(client, config.table)
    }

    /// Use an existing client; the client's base is the project URL.
    pub fn with_client(client: ApiClient<ApiKeyAuth>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("rest/v1/{}", self.table)
    }

    async fn select(&self, key: &str) -> Result<Vec<Record>, api_client::Error> {
        let rows = self
            .client
            .get(&self.endpoint())
            .query([("key", format!("eq.{key}")), ("select", SELECT.to_owned())])
            .send()
            .await?
            .error_for_status()
            .await?
            .json()
            .await?;
        Ok(rows)
    }

    async fn upsert(&self, record: &Record) -> Result<(), api_client::Error> {
        self.client
            .post(&self.endpoint())
            .query([("on_conflict", "key")])
            .header(
                HeaderName::from_static("prefer"),
                HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
            )
            .json(std::slice::from_ref(record))
            .send()
            .await?
            .error_for_status()
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), api_client::Error> {
        self.client
            .delete(&self.endpoint())
            .query([("key", format!("eq.{key}"))])
            .send()
            .await?
            .error_for_status()
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Driver for RemoteDriver {
    fn name(&self) -> &'static str {
        ENGINE
    }

    #[tracing::instrument(skip(self), fields(table = %self.table))]
    async fn get(&self, key: &str) -> Result<Option<Record>, CacheError> {
        let rows = self
            .select(key)
            .await
            .map_err(|err| request_error(key, "select", err))?;
        Ok(rows.into_iter().find(|record| record.key == key))
    }

    #[tracing::instrument(skip_all, fields(table = %self.table, key = %record.key))]
    async fn put(&self, record: Record) -> Result<(), CacheError> {
        self.upsert(&record)
            .await
            .map_err(|err| request_error(&record.key, "upsert", err))
    }

    #[tracing::instrument(skip(self), fields(table = %self.table))]
    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.remove(key)
            .await
            .map_err(|err| request_error(key, "delete", err))
    }
}
