//! # keystash-core
//!
//! Core types, configuration, and utilities for Keystash.
//!
//! This crate provides shared functionality used across all Keystash crates:
//!
//! - **Configuration**: Loading, validation, and persistence of the JSON5 config file
//! - **Types**: The algorithm / block-mode / padding / digest vocabulary keys are described in
//! - **Utilities**: Path resolution, environment handling, and zeroizing secret wrappers

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::ConfigError;
pub use secret::{SecretBytes, SecretString};
pub use types::*;
