//! Shared type definitions.

mod crypto;

pub use crypto::*;
