use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::Utf8PathBuf;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use cache_driver::{CacheError, CacheErrorKind, Driver, Record};

const ENGINE: &str = "local";

fn io_error(key: &str, context: &str, err: io::Error) -> CacheError {
    let kind = match err.kind() {
        io::ErrorKind::PermissionDenied => CacheErrorKind::PermissionDenied,
        _ => CacheErrorKind::Io,
    };
    CacheError::builder(ENGINE, kind, err)
        .key(key)
        .context(context)
        .build()
}

/// Cache driver that keeps one JSON file per key in a directory.
#[derive(Debug)]
pub struct LocalDriver {
    root: Utf8PathBuf,
    writes: AtomicU64,
}

impl LocalDriver {
    /// Store records under `root`, which is created on first write.
    pub fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            writes: AtomicU64::new(0),
        }
    }

    /// The directory holding the records.
    pub fn root(&self) -> &camino::Utf8Path {
        &self.root
    }

    fn path(&self, key: &str) -> Utf8PathBuf {
        let name = utf8_percent_encode(key, NON_ALPHANUMERIC).to_string();
        self.root.join(format!("{name}.json"))
    }
}

#[async_trait::async_trait]
impl Driver for LocalDriver {
    fn name(&self) -> &'static str {
        ENGINE
    }

    async fn get(&self, key: &str) -> Result<Option<Record>, CacheError> {
        let path = self.path(key);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(key, "read", err)),
        };

        let record = serde_json::from_slice(&contents).map_err(|err| {
            CacheError::builder(ENGINE, CacheErrorKind::Serialization, err)
                .key(key)
                .context(path.to_string())
                .build()
        })?;
        Ok(Some(record))
    }

    async fn put(&self, record: Record) -> Result<(), CacheError> {
        let path = self.path(&record.key);
        let contents = serde_json::to_vec(&record).map_err(|err| {
            CacheError::builder(ENGINE, CacheErrorKind::Serialization, err)
                .key(&record.key)
                .build()
        })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| io_error(&record.key, "create cache directory", err))?;

        // Readers only ever see a complete file.
        let n = self.writes.fetch_add(1, Ordering::Relaxed);
        let staging = path.with_extension(format!("{}.{n}.tmp", std::process::id()));
        tokio::fs::write(&staging, &contents)
            .await
            .map_err(|err| io_error(&record.key, "write", err))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|err| io_error(&record.key, "rename", err))?;

        tracing::trace!(key = %record.key, %path, "stored cache record");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(key, "remove", err)),
        }
    }
}
