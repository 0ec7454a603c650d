//! Keystore emulated on a plain key-value backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{KeyRecord, KeystoreBackend};
use crate::backend::SecureKeyValueStore;
use crate::capability::KeyPurposes;
use crate::engine::{CipherEngine, GeneratedKey};
use crate::error::{KeystoreError, Result};
use crate::keygen::KeyGenSpec;

/// Prefix of the backend slot a key record is stored under.
///
/// Values written through the same backend by the hybrid store may not use
/// names starting with it, so key records cannot be overwritten or removed
/// through the value API.
pub const KEY_RECORD_PREFIX: &str = "__key__.";

/// Backend slot holding the record for `alias`.
pub fn record_slot(alias: &str) -> String {
    format!("{KEY_RECORD_PREFIX}{alias}")
}

/// Stores each key as an encoded [`KeyRecord`] in its alias's record slot,
/// exactly as if it were an ordinary value.
pub struct SoftwareKeystore {
    store: Arc<dyn SecureKeyValueStore>,
    engine: Arc<dyn CipherEngine>,
}

impl SoftwareKeystore {
    pub fn new(store: Arc<dyn SecureKeyValueStore>, engine: Arc<dyn CipherEngine>) -> Self {
        Self { store, engine }
    }
}

#[async_trait]
impl KeystoreBackend for SoftwareKeystore {
    async fn generate(
        &self,
        alias: &str,
        spec: &KeyGenSpec,
        purposes: KeyPurposes,
    ) -> Result<Option<Vec<u8>>> {
        let generated = self.engine.generate(spec)?;
        let record = KeyRecord::new(spec.params(), purposes, &generated);
        let blob = record.encode()?;
        self.store.store(&record_slot(alias), &blob).await?;
        debug!(alias, algorithm = %spec.algorithm(), engine = self.engine.profile().name, "stored key record");

        Ok(match generated {
            GeneratedKey::Symmetric(_) => None,
            GeneratedKey::Pair { public_der, .. } => Some(public_der),
        })
    }

    async fn retrieve(&self, alias: &str) -> Result<KeyRecord> {
        match self.store.retrieve(&record_slot(alias)).await? {
            Some(blob) => KeyRecord::decode(alias, &blob),
            None => Err(KeystoreError::ImpossibleToRetrieveKey(alias.to_string())),
        }
    }

    async fn is_alias_taken(&self, alias: &str) -> Result<bool> {
        self.store.has_key_stored(&record_slot(alias)).await
    }

    async fn delete(&self, alias: &str) -> Result<()> {
        self.store.remove(&record_slot(alias)).await
    }
}
