//! Plain secure key-value backends.
//!
//! A [`SecureKeyValueStore`] maps opaque string keys to opaque string values
//! and promises nothing beyond durability after a successful write. The
//! software keystore and the hybrid value store both sit on top of one.

use std::sync::Arc;

use async_trait::async_trait;
use keystash_core::config::{BackendKind, Config};

use crate::error::Result;

mod file;
#[cfg(target_os = "macos")]
mod keychain;
mod memory;

pub use file::FileKeyValueStore;
#[cfg(target_os = "macos")]
pub use keychain::KeychainKeyValueStore;
pub use memory::MemoryKeyValueStore;

/// Async trait for plain secure key-value backends.
#[async_trait]
pub trait SecureKeyValueStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value.
    async fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value under `key`, `None` if absent.
    async fn retrieve(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Removing an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<()>;

    async fn has_key_stored(&self, key: &str) -> Result<bool>;
}

/// Open the backend selected in `config` for its namespace.
pub fn open(config: &Config) -> Result<Arc<dyn SecureKeyValueStore>> {
    match config.backend.kind {
        BackendKind::Memory => Ok(Arc::new(MemoryKeyValueStore::new())),
        BackendKind::File => {
            let dir = config.store_dir()?;
            Ok(Arc::new(FileKeyValueStore::new(dir, &config.namespace)?))
        }
        #[cfg(target_os = "macos")]
        BackendKind::Keychain => Ok(Arc::new(KeychainKeyValueStore::new(&config.namespace))),
        #[cfg(not(target_os = "macos"))]
        BackendKind::Keychain => Err(crate::error::KeystoreError::Storage(
            "the keychain backend is only available on macOS".to_string(),
        )),
    }
}
