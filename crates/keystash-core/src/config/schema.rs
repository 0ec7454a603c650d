//! Configuration schema definitions.

use crate::types::{BlockMode, EncryptionPadding};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main Keystash configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Namespace the store is opened under. Aliases are unique per namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Plain secure key-value backend.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Master key parameters for the hybrid value store.
    #[serde(default)]
    pub master_key: MasterKeyConfig,

    /// Cipher engine profile.
    #[serde(default)]
    pub engine: EngineKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            backend: BackendConfig::default(),
            master_key: MasterKeyConfig::default(),
            engine: EngineKind::default(),
        }
    }
}

fn default_namespace() -> String {
    "keystash".to_string()
}

/// Backend configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend kind.
    #[serde(default)]
    pub kind: BackendKind,

    /// Storage directory for the `file` backend (defaults to `~/.keystash/store`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Which plain secure key-value backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local, lost on exit.
    Memory,
    /// One JSON file per entry.
    #[default]
    File,
    /// OS credential vault (macOS Keychain).
    Keychain,
}

/// Master symmetric key parameters, fixed once per namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterKeyConfig {
    /// Block mode used for every envelope written by the value store.
    #[serde(default)]
    pub block_mode: BlockMode,

    /// Encryption padding (PKCS7 for CBC, none otherwise).
    #[serde(default)]
    pub padding: EncryptionPadding,

    /// AES key size in bits.
    #[serde(default = "default_master_key_size")]
    pub key_size: u32,
}

impl Default for MasterKeyConfig {
    fn default() -> Self {
        Self {
            block_mode: BlockMode::Gcm,
            padding: EncryptionPadding::None,
            key_size: default_master_key_size(),
        }
    }
}

fn default_master_key_size() -> u32 {
    256
}

/// Cipher engine profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// Engine pads block modes itself.
    #[default]
    Software,
    /// Engine only encrypts whole blocks; padding is applied by the envelope codec.
    RawBlocks,
}
