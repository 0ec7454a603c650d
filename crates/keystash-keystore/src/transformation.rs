//! Cipher transformation descriptors.
//!
//! Builds `ALGORITHM[/BLOCKMODE][/PADDING]` strings from the abstract key
//! vocabulary. Padding names are the platform names from
//! [`EncryptionPadding::as_str`]; an engine that spells a padding differently
//! supplies a [`PaddingAliases`] table and the substitution happens here,
//! never at call sites.

use keystash_core::{Algorithm, BlockMode, EncryptionPadding};
use std::fmt;

/// Platform padding name -> engine padding name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingAliases {
    table: &'static [(&'static str, &'static str)],
}

impl PaddingAliases {
    /// No substitutions.
    pub const IDENTITY: Self = Self { table: &[] };

    /// Engines that only know the PKCS#5 name for block-cipher padding.
    pub const PKCS5: Self = Self {
        table: &[("PKCS7Padding", "PKCS5Padding")],
    };

    /// The engine's name for `platform_name`.
    pub fn resolve<'a>(&self, platform_name: &'a str) -> &'a str {
        self.table
            .iter()
            .find(|(from, _)| *from == platform_name)
            .map(|(_, to)| *to)
            .unwrap_or(platform_name)
    }
}

impl Default for PaddingAliases {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A resolved transformation descriptor such as `AES/GCM/NoPadding`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transformation(String);

impl Transformation {
    /// Join the present segments, substituting the padding name through `aliases`.
    pub fn resolve(
        algorithm: Algorithm,
        block_mode: Option<BlockMode>,
        padding: Option<EncryptionPadding>,
        aliases: &PaddingAliases,
    ) -> Self {
        let mut descriptor = algorithm.as_str().to_string();
        if let Some(mode) = block_mode {
            descriptor.push('/');
            descriptor.push_str(mode.as_str());
        }
        if let Some(padding) = padding {
            descriptor.push('/');
            descriptor.push_str(aliases.resolve(padding.as_str()));
        }
        Self(descriptor)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Transformation {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
