//! File-system backend.
//!
//! Each entry is a JSON file at `{base_dir}/{namespace}/{key}.json`. The
//! namespace directory is created with mode `0700` and entry files with mode
//! `0600` on Unix.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::SecureKeyValueStore;
use crate::error::{KeystoreError, Result};

/// Maximum allowed length for a key or namespace name.
const MAX_NAME_LEN: usize = 128;

/// On-disk representation of one entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    /// Opaque value as handed to [`SecureKeyValueStore::store`].
    value: String,
    /// When the entry was last written.
    updated_at: DateTime<Utc>,
}

/// A file-system-backed key-value store scoped to one namespace.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Create a store for `namespace` under `base_dir`. Nothing is touched on disk
    /// until the first write.
    pub fn new(base_dir: impl Into<PathBuf>, namespace: &str) -> Result<Self> {
        validate_name(namespace)?;
        Ok(Self {
            dir: base_dir.into().join(namespace),
        })
    }

    /// Directory holding this namespace's entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensure the namespace directory exists with restrictive permissions.
    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            tokio::fs::set_permissions(&self.dir, perms).await?;
        }

        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

/// Validate that a key or namespace is safe to use as a file name.
///
/// Allowed: ASCII alphanumeric, underscore, hyphen, dot (but not `..`). Max length 128.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KeystoreError::InvalidName(
            "name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(KeystoreError::InvalidName(format!(
            "name exceeds maximum length of {MAX_NAME_LEN} characters"
        )));
    }
    if name == "." || name.contains("..") {
        return Err(KeystoreError::InvalidName(format!(
            "name must not be a relative path component: {name}"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(KeystoreError::InvalidName(format!(
            "name contains invalid characters (allowed: alphanumeric, underscore, hyphen, dot): {name}"
        )));
    }
    Ok(())
}

/// Replace `path` with `data` atomically.
///
/// The bytes go to a uniquely named sibling created with mode 0600 on Unix,
/// which is then renamed over `path`. Readers see either the old entry or the
/// new one, never a partial file.
async fn write_entry_file(path: &Path, data: &[u8]) -> Result<()> {
    let temp_path = path.with_extension(format!("json.{:016x}.tmp", rand::random::<u64>()));

    let result: std::io::Result<()> = async {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl SecureKeyValueStore for FileKeyValueStore {
    async fn store(&self, key: &str, value: &str) -> Result<()> {
        validate_name(key)?;
        self.ensure_dir().await?;

        let entry = StoredEntry {
            value: value.to_string(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&entry)?;
        let path = self.entry_path(key);
        debug!(key, path = %path.display(), "writing entry");
        write_entry_file(&path, json.as_bytes()).await
    }

    async fn retrieve(&self, key: &str) -> Result<Option<String>> {
        validate_name(key)?;

        let path = self.entry_path(key);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: StoredEntry = serde_json::from_str(&data)
            .map_err(|e| KeystoreError::Storage(format!("malformed entry {key}: {e}")))?;
        Ok(Some(entry.value))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        validate_name(key)?;

        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, path = %path.display(), "removed entry");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn has_key_stored(&self, key: &str) -> Result<bool> {
        validate_name(key)?;
        Ok(tokio::fs::try_exists(self.entry_path(key)).await?)
    }
}
