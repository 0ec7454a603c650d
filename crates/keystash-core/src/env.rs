//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
pub fn get_var_or(name: &str, default: &str) -> String {
    get_var(name).unwrap_or_else(|| default.to_string())
}

/// Well-known environment variable names.
pub mod vars {
    /// Keystash home directory override.
    pub const KEYSTASH_HOME: &str = "KEYSTASH_HOME";

    /// Keystash config file override.
    pub const KEYSTASH_CONFIG: &str = "KEYSTASH_CONFIG";

    /// Namespace override for the opened store.
    pub const KEYSTASH_NAMESPACE: &str = "KEYSTASH_NAMESPACE";

    /// Directory override for the file-backed value store.
    pub const KEYSTASH_DIR: &str = "KEYSTASH_DIR";

    /// Keystash log filter (fallback when `RUST_LOG` is unset).
    pub const KEYSTASH_LOG: &str = "KEYSTASH_LOG";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_var_empty_is_none() {
        env::set_var("KEYSTASH_TEST_EMPTY", "");
        assert!(get_var("KEYSTASH_TEST_EMPTY").is_none());
        env::remove_var("KEYSTASH_TEST_EMPTY");
    }

    #[test]
    fn test_get_var_or_default() {
        assert_eq!(get_var_or("KEYSTASH_TEST_UNSET_VAR", "fallback"), "fallback");
    }
}
