//! Configuration loading and persistence.

use super::Config;
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use crate::types::{BlockMode, EncryptionPadding};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maximum namespace length; namespaces become directory and service names.
const MAX_NAMESPACE_LEN: usize = 128;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "loading configuration");
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Load configuration from the default path, falling back to defaults if no
    /// file exists. Environment overrides are applied either way.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let mut config = match Self::load_default() {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `KEYSTASH_NAMESPACE` and `KEYSTASH_DIR` on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(namespace) = env::get_var(env::vars::KEYSTASH_NAMESPACE) {
            self.namespace = namespace;
        }
        if let Some(dir) = env::get_var(env::vars::KEYSTASH_DIR) {
            self.backend.dir = Some(PathBuf::from(dir));
        }
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = paths::config_file()?;
        self.save(&path)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Directory the file backend writes to.
    pub fn store_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.backend.dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::store_dir(),
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        // 1. Namespace must be usable as a directory / service name
        if self.namespace.is_empty() {
            errors.push("Namespace must not be empty".to_string());
        } else if self.namespace.len() > MAX_NAMESPACE_LEN {
            errors.push(format!(
                "Namespace exceeds maximum length of {MAX_NAMESPACE_LEN} characters"
            ));
        } else if self.namespace == "."
            || self.namespace == ".."
            || !self
                .namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            errors.push(format!(
                "Namespace '{}' contains invalid characters (allowed: alphanumeric, '_', '-', '.')",
                self.namespace
            ));
        }

        // 2. Master key must be a valid AES size
        let master = &self.master_key;
        if !matches!(master.key_size, 128 | 192 | 256) {
            errors.push(format!(
                "Master key size must be 128, 192 or 256 bits, got {}",
                master.key_size
            ));
        }

        // 3. Block mode / padding pairing
        match (master.block_mode, master.padding) {
            (BlockMode::None, _) => {
                errors.push("Master key requires a block mode (CBC, CTR or GCM)".to_string());
            }
            (BlockMode::Cbc, EncryptionPadding::Pkcs7) => {}
            (BlockMode::Cbc, padding) => errors.push(format!(
                "CBC master key requires PKCS7 padding, got {}",
                padding.as_str()
            )),
            (_, EncryptionPadding::None) => {}
            (mode, padding) => errors.push(format!(
                "{} master key does not take padding, got {}",
                mode.as_str(),
                padding.as_str()
            )),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
