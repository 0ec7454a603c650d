//! Path resolution utilities.

use crate::env;
use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the Keystash base directory (`~/.keystash`, or `$KEYSTASH_HOME`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = env::get_var(env::vars::KEYSTASH_HOME) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".keystash"))
}

/// Get the main config file path (`~/.keystash/keystash.json5`).
///
/// `$KEYSTASH_CONFIG` takes precedence when set.
pub fn config_file() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env::get_var(env::vars::KEYSTASH_CONFIG) {
        return Ok(PathBuf::from(path));
    }
    Ok(base_dir()?.join("keystash.json5"))
}

/// Get the default directory for the file-backed value store (`~/.keystash/store`).
pub fn store_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("store"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_dir_is_under_base() {
        let base = base_dir().unwrap();
        let store = store_dir().unwrap();
        assert!(store.starts_with(&base));
        assert!(store.ends_with("store"));
    }
}
