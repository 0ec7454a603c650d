//! Key registries behind the lifecycle manager.
//!
//! [`KeystoreBackend`] is the seam a hardware-backed keystore would plug
//! into. The only implementation here is [`SoftwareKeystore`], which emulates
//! one on top of a plain [`SecureKeyValueStore`](crate::backend::SecureKeyValueStore).

use async_trait::async_trait;

use crate::capability::KeyPurposes;
use crate::error::Result;
use crate::keygen::KeyGenSpec;

mod record;
mod software;

pub use record::KeyRecord;
pub use software::{record_slot, SoftwareKeystore, KEY_RECORD_PREFIX};

/// A registry of keys addressed by alias.
#[async_trait]
pub trait KeystoreBackend: Send + Sync {
    /// Generate and persist a key under `alias`, returning the SPKI DER
    /// public half for asymmetric keys. Alias uniqueness is the caller's job.
    async fn generate(
        &self,
        alias: &str,
        spec: &KeyGenSpec,
        purposes: KeyPurposes,
    ) -> Result<Option<Vec<u8>>>;

    /// Load the record stored under `alias`.
    async fn retrieve(&self, alias: &str) -> Result<KeyRecord>;

    async fn is_alias_taken(&self, alias: &str) -> Result<bool>;

    /// Remove `alias`. Absent aliases are not an error.
    async fn delete(&self, alias: &str) -> Result<()>;
}
