//! Key algorithm vocabulary.
//!
//! These enums are the configuration surface every key is described in:
//! algorithm, block mode, encryption padding and digest. They serialize to
//! the upper-case names used in config files and stored key records
//! (`"AES"`, `"GCM"`, `"RSA_OAEP"`, `"SHA256"`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalize a user-supplied name for case-insensitive matching.
fn normalize(s: &str) -> String {
    s.trim().to_ascii_uppercase().replace('-', "_")
}

/// Key algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    Rsa,
    Ec,
    Aes,
}

impl Algorithm {
    /// Name used in cipher transformation descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Ec => "EC",
            Self::Aes => "AES",
        }
    }

    /// Whether keys of this family are public/private pairs.
    pub fn is_asymmetric(&self) -> bool {
        !matches!(self, Self::Aes)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "RSA" => Ok(Self::Rsa),
            "EC" | "ECDSA" => Ok(Self::Ec),
            "AES" => Ok(Self::Aes),
            other => Err(format!("unknown algorithm: {other}")),
        }
    }
}

/// Block cipher mode of operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockMode {
    Cbc,
    Ctr,
    #[default]
    Gcm,
    /// No block mode; only meaningful for asymmetric transformations.
    None,
}

impl BlockMode {
    /// Name used in cipher transformation descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cbc => "CBC",
            Self::Ctr => "CTR",
            Self::Gcm => "GCM",
            Self::None => "NONE",
        }
    }

    /// Nonce/IV length mandated by this mode, or `None` when the mode carries none.
    pub fn iv_len(&self) -> Option<usize> {
        match self {
            Self::Cbc | Self::Ctr => Some(16),
            Self::Gcm => Some(12),
            Self::None => None,
        }
    }
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "CBC" => Ok(Self::Cbc),
            "CTR" => Ok(Self::Ctr),
            "GCM" => Ok(Self::Gcm),
            "NONE" | "ECB" => Ok(Self::None),
            other => Err(format!("unknown block mode: {other}")),
        }
    }
}

/// Encryption padding scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptionPadding {
    #[default]
    None,
    Pkcs7,
    RsaPkcs1,
    RsaOaep,
}

impl EncryptionPadding {
    /// Platform padding name, before any engine-specific alias substitution.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NoPadding",
            Self::Pkcs7 => "PKCS7Padding",
            Self::RsaPkcs1 => "PKCS1Padding",
            Self::RsaOaep => "OAEPPadding",
        }
    }
}

impl fmt::Display for EncryptionPadding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionPadding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "NONE" | "NOPADDING" => Ok(Self::None),
            "PKCS7" | "PKCS7PADDING" => Ok(Self::Pkcs7),
            "RSA_PKCS1" | "PKCS1" | "PKCS1PADDING" => Ok(Self::RsaPkcs1),
            "RSA_OAEP" | "OAEP" | "OAEPPADDING" => Ok(Self::RsaOaep),
            other => Err(format!("unknown padding: {other}")),
        }
    }
}

/// Message digest used for signatures and OAEP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Digest {
    #[default]
    None,
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl Digest {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha224 => "SHA224",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Digest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).replace('_', "").as_str() {
            "NONE" => Ok(Self::None),
            "MD5" => Ok(Self::Md5),
            "SHA1" => Ok(Self::Sha1),
            "SHA224" => Ok(Self::Sha224),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            other => Err(format!("unknown digest: {other}")),
        }
    }
}
