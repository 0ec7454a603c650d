//! Alias-addressed key storage and encrypted value storage for Keystash.
//!
//! Keys are described by a [`KeyGenSpec`] and a [`KeyPurposes`] set, live
//! under an alias in a [`KeystoreBackend`], and are only handed out for
//! operations their purposes grant. The [`HybridStore`] uses one master key
//! per namespace to seal arbitrary scalar values before they reach a plain
//! [`SecureKeyValueStore`].

pub mod backend;
pub mod capability;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod handle;
pub mod hybrid;
pub mod keygen;
pub mod keystore;
pub mod manager;
pub mod transformation;

pub use backend::{FileKeyValueStore, MemoryKeyValueStore, SecureKeyValueStore};
pub use capability::{KeyOperation, KeyPurposes};
pub use engine::{CipherEngine, EngineProfile, RustCryptoEngine};
pub use envelope::EnvelopeCodec;
pub use error::{KeystoreError, Result};
pub use handle::KeyHandle;
pub use hybrid::{HybridStore, MasterKeyStatus, WriteOutcome, WriteTicket};
pub use keygen::{KeyGenSpec, KeyParams};
pub use keystore::{KeyRecord, KeystoreBackend, SoftwareKeystore};
pub use manager::KeyManager;
pub use transformation::{PaddingAliases, Transformation};
