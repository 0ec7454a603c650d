//! Cross-crate integration tests for Keystash. See `tests/`.
