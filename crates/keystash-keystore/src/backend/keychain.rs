//! macOS Keychain backend.
//!
//! Entries are generic passwords with service = namespace and account = key.

use async_trait::async_trait;
use security_framework::passwords::{
    delete_generic_password, get_generic_password, set_generic_password,
};
use tracing::debug;

use super::SecureKeyValueStore;
use crate::error::{KeystoreError, Result};

/// errSecItemNotFound
const ITEM_NOT_FOUND: i32 = -25300;

/// A backend over the login keychain.
#[derive(Debug, Clone)]
pub struct KeychainKeyValueStore {
    service: String,
}

impl KeychainKeyValueStore {
    pub fn new(namespace: &str) -> Self {
        Self {
            service: namespace.to_string(),
        }
    }
}

fn keychain_error(action: &str, e: security_framework::base::Error) -> KeystoreError {
    KeystoreError::Storage(format!("keychain {action} failed: {e}"))
}

#[async_trait]
impl SecureKeyValueStore for KeychainKeyValueStore {
    async fn store(&self, key: &str, value: &str) -> Result<()> {
        debug!(service = %self.service, key, "writing keychain entry");
        set_generic_password(&self.service, key, value.as_bytes())
            .map_err(|e| keychain_error("write", e))
    }

    async fn retrieve(&self, key: &str) -> Result<Option<String>> {
        match get_generic_password(&self.service, key) {
            Ok(data) => String::from_utf8(data)
                .map(Some)
                .map_err(|e| KeystoreError::Storage(format!("keychain data is not valid UTF-8: {e}"))),
            Err(e) if e.code() == ITEM_NOT_FOUND => Ok(None),
            Err(e) => Err(keychain_error("read", e)),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match delete_generic_password(&self.service, key) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ITEM_NOT_FOUND => Ok(()),
            Err(e) => Err(keychain_error("delete", e)),
        }
    }

    async fn has_key_stored(&self, key: &str) -> Result<bool> {
        Ok(self.retrieve(key).await?.is_some())
    }
}
