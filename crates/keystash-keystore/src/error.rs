//! Error types for key and value storage.

use thiserror::Error;

use crate::capability::KeyOperation;

/// Message catalogue surfaced to callers.
pub mod messages {
    pub const ALIAS_ALREADY_TAKEN: &str = "Alias already taken";
    pub const IMPOSSIBLE_TO_RETRIEVE_KEY: &str = "Impossible to retrieve key";
    pub const KEY_CANNOT_PERFORM_OPERATION: &str = "Key cannot perform operation";
    pub const UNSUPPORTED_TYPE: &str = "Unsupported type";
    pub const INVALID_KEY_PURPOSES: &str = "Invalid key purposes: at least one purpose must be granted";
    pub const INVALID_PADDING: &str = "Invalid padding";
    pub const KEY_NOT_STORED: &str = "Key not stored";
}

/// Errors that can occur during key and value operations.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("{}: {0}", messages::ALIAS_ALREADY_TAKEN)]
    AliasAlreadyTaken(String),

    #[error("{}: {0}", messages::IMPOSSIBLE_TO_RETRIEVE_KEY)]
    ImpossibleToRetrieveKey(String),

    #[error("{}: {0}", messages::KEY_CANNOT_PERFORM_OPERATION)]
    KeyCannotPerformOperation(KeyOperation),

    #[error("Invalid key spec: {0}")]
    InvalidKeySpec(String),

    #[error("{}: {0}", messages::UNSUPPORTED_TYPE)]
    UnsupportedType(String),

    #[error("{}", messages::INVALID_KEY_PURPOSES)]
    InvalidKeyPurposes,

    #[error("{}", messages::INVALID_PADDING)]
    InvalidPadding,

    #[error("{}: {0}", messages::KEY_NOT_STORED)]
    KeyNotStored(String),

    #[error("Unsupported transformation: {0}")]
    UnsupportedTransformation(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Signature failed: {0}")]
    SignatureFailed(String),

    #[error("Key agreement failed: {0}")]
    AgreementFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Background write failed: {0}")]
    BackgroundTask(String),

    #[error("Configuration error: {0}")]
    Config(#[from] keystash_core::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Convenience result alias for keystore operations.
pub type Result<T> = std::result::Result<T, KeystoreError>;
