//! CLI command implementations.

pub mod config;
pub mod keys;
pub mod values;
