//! Filesystem blob store.
//!
//! Stores attachment bytes under a base directory, keyed by the
//! reconciler-generated storage path. Writes are atomic (temp file +
//! rename) and files are clamped to 0644.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use satchel_core::defaults::download_url_ttl_secs;
use satchel_core::{BlobStore, DownloadUrl, Error, Result};

/// Blob store rooted at a local directory.
pub struct FsBlobStore {
    base_path: PathBuf,
    url_ttl: Duration,
}

impl FsBlobStore {
    /// Create a store rooted at `base_path`. The directory is created on
    /// first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            url_ttl: Duration::seconds(download_url_ttl_secs()),
        }
    }

    fn full_path(&self, path: &str) -> Result<PathBuf> {
        // Storage paths come from the reconciler and are already sanitized;
        // reject traversal anyway since the path crosses a trust boundary.
        if path.split(['/', '\\']).any(|seg| seg == "..") {
            return Err(Error::InvalidInput(format!(
                "storage path escapes the blob root: {path}"
            )));
        }
        Ok(self.base_path.join(path))
    }

    /// Validate that the store can write, read, and delete files.
    ///
    /// Performs a full round trip at startup to catch filesystem issues
    /// (permission errors, missing directories, overlayfs quirks) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }

    /// Read an object's bytes. Mostly useful for tests and local tooling;
    /// consumers normally go through [`BlobStore::resolve_download_url`].
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path)?;
        Ok(fs::read(full_path).await?)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, data: &[u8], _content_type: &str) -> Result<()> {
        let full_path = self.full_path(path)?;
        debug!(storage_path = %path, size_bytes = data.len(), "fs blob store: put");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "fs blob store: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "fs blob store: rename failed");
            e
        })?;

        // 0644: rw-r--r--, no execute
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn resolve_download_url(&self, path: &str) -> Result<DownloadUrl> {
        let full_path = self.full_path(path)?;
        if !fs::try_exists(&full_path).await? {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no blob at {path}"),
            )));
        }
        Ok(DownloadUrl {
            url: format!("file://{}", full_path.display()),
            expires_at: Utc::now() + self.url_ttl,
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path)?;
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }
}
