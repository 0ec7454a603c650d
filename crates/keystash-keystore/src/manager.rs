//! Key lifecycle manager.
//!
//! Every alias is either absent or holds exactly one key. Generation never
//! overwrites; deletion returns the alias to the absent state so it can be
//! reused at once. Handles are only handed out after the requested operation
//! has been checked against the key's purposes.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use keystash_core::{Algorithm, BlockMode, SecretBytes};
use tracing::{debug, info, warn};

use crate::backend::SecureKeyValueStore;
use crate::capability::{KeyOperation, KeyPurposes};
use crate::engine::{CipherEngine, Direction};
use crate::envelope::EnvelopeCodec;
use crate::error::{KeystoreError, Result};
use crate::handle::KeyHandle;
use crate::hybrid::MASTER_KEY_PREFIX;
use crate::keygen::KeyGenSpec;
use crate::keystore::{KeystoreBackend, SoftwareKeystore};
use crate::transformation::Transformation;

/// Generates, resolves and deletes keys by alias.
#[derive(Clone)]
pub struct KeyManager {
    keystore: Arc<dyn KeystoreBackend>,
    codec: EnvelopeCodec,
}

impl KeyManager {
    pub fn new(keystore: Arc<dyn KeystoreBackend>, engine: Arc<dyn CipherEngine>) -> Self {
        Self {
            keystore,
            codec: EnvelopeCodec::new(engine),
        }
    }

    /// A manager over a software-emulated keystore on `store`.
    pub fn software(store: Arc<dyn SecureKeyValueStore>, engine: Arc<dyn CipherEngine>) -> Self {
        let keystore = Arc::new(SoftwareKeystore::new(store, engine.clone()));
        Self::new(keystore, engine)
    }

    pub fn codec(&self) -> &EnvelopeCodec {
        &self.codec
    }

    fn engine(&self) -> &Arc<dyn CipherEngine> {
        self.codec.engine()
    }

    /// Generate a key under a fresh alias.
    ///
    /// Returns the SPKI DER public half for asymmetric keys and `None` for
    /// symmetric keys, which are only ever addressed by alias.
    pub async fn generate_key(
        &self,
        alias: &str,
        spec: &KeyGenSpec,
        purposes: KeyPurposes,
    ) -> Result<Option<Vec<u8>>> {
        if alias.is_empty() {
            return Err(KeystoreError::InvalidName(
                "alias must not be empty".to_string(),
            ));
        }
        if self.alias_exists(alias).await? {
            return Err(KeystoreError::AliasAlreadyTaken(alias.to_string()));
        }
        spec.validate()?;
        let purposes = purposes.validated()?;

        let public = self.keystore.generate(alias, spec, purposes).await?;
        info!(alias, algorithm = %spec.algorithm(), "generated key");
        Ok(public)
    }

    /// Whether `alias` holds a key. Never fails on absence.
    pub async fn alias_exists(&self, alias: &str) -> Result<bool> {
        self.keystore.is_alias_taken(alias).await
    }

    /// Resolve the key under `alias` for `operation`.
    ///
    /// Fails with [`KeystoreError::KeyCannotPerformOperation`] when the key's
    /// purposes do not grant `operation`. For asymmetric keys the public half
    /// is returned for encryption and verification, the private half otherwise.
    pub async fn get_key(&self, alias: &str, operation: KeyOperation) -> Result<KeyHandle> {
        let record = self.keystore.retrieve(alias).await?;
        if let Err(e) = record.purposes().ensure(operation) {
            warn!(alias, %operation, "key purposes deny operation");
            return Err(e);
        }
        debug!(alias, %operation, "resolved key");
        record.resolve_handle(operation)
    }

    /// Delete the key under `alias`. Deleting an absent alias succeeds.
    ///
    /// Master keys of hybrid stores cannot be deleted here; every value
    /// sealed under one would become unreadable.
    pub async fn delete_key(&self, alias: &str) -> Result<()> {
        if alias.starts_with(MASTER_KEY_PREFIX) {
            return Err(KeystoreError::InvalidName(format!(
                "{alias} is a master key and cannot be deleted"
            )));
        }
        self.keystore.delete(alias).await?;
        info!(alias, "deleted key");
        Ok(())
    }

    /// Encrypt with the key under `alias`.
    ///
    /// AES keys produce an envelope in the key's block mode; RSA keys produce
    /// base64 ciphertext under the key's padding.
    pub async fn encrypt(&self, alias: &str, plaintext: &[u8]) -> Result<String> {
        let key = self.get_key(alias, KeyOperation::Encrypt).await?;
        match key.params().algorithm {
            Algorithm::Aes => {
                self.codec
                    .encrypt(plaintext, key.symmetric_bytes()?, symmetric_mode(&key))
            }
            _ => {
                let transformation = self.asymmetric_transformation(&key);
                let ciphertext =
                    self.engine()
                        .asymmetric(&transformation, Direction::Encrypt, &key, plaintext)?;
                Ok(BASE64.encode(ciphertext))
            }
        }
    }

    /// Decrypt output of [`KeyManager::encrypt`] for the same alias.
    pub async fn decrypt(&self, alias: &str, ciphertext: &str) -> Result<SecretBytes> {
        let key = self.get_key(alias, KeyOperation::Decrypt).await?;
        match key.params().algorithm {
            Algorithm::Aes => {
                self.codec
                    .decrypt(ciphertext, key.symmetric_bytes()?, symmetric_mode(&key))
            }
            _ => {
                let transformation = self.asymmetric_transformation(&key);
                let raw = BASE64.decode(ciphertext.trim())?;
                self.engine()
                    .asymmetric(&transformation, Direction::Decrypt, &key, &raw)
                    .map(SecretBytes::new)
            }
        }
    }

    pub async fn sign(&self, alias: &str, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.get_key(alias, KeyOperation::Sign).await?;
        self.engine().sign(&key, data)
    }

    pub async fn verify(&self, alias: &str, data: &[u8], signature: &[u8]) -> Result<bool> {
        let key = self.get_key(alias, KeyOperation::Verify).await?;
        self.engine().verify(&key, data, signature)
    }

    /// ECDH with a peer's SPKI DER public key.
    pub async fn agree(&self, alias: &str, peer_public_der: &[u8]) -> Result<SecretBytes> {
        let key = self.get_key(alias, KeyOperation::Agree).await?;
        self.engine().agree(&key, peer_public_der)
    }

    fn asymmetric_transformation(&self, key: &KeyHandle) -> Transformation {
        let params = key.params();
        Transformation::resolve(
            params.algorithm,
            None,
            Some(params.padding),
            &self.engine().profile().aliases,
        )
    }
}

fn symmetric_mode(key: &KeyHandle) -> BlockMode {
    key.params().block_mode.unwrap_or_default()
}
