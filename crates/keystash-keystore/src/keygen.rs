//! Key generation parameters.
//!
//! A [`KeyGenSpec`] describes a key independently of any platform API.
//! Algorithm/mode/padding compatibility is checked here, before any native
//! call is made; later stages (transformation resolution, the cipher engine)
//! assume a validated spec.

use keystash_core::{Algorithm, BlockMode, Digest, EncryptionPadding};
use serde::{Deserialize, Serialize};

use crate::error::{KeystoreError, Result};

/// AES key sizes in bits.
pub const AES_KEY_SIZES: [u32; 3] = [128, 192, 256];

/// RSA modulus sizes in bits.
pub const RSA_KEY_SIZES: [u32; 4] = [1024, 2048, 3072, 4096];

/// EC curve sizes in bits (P-256).
pub const EC_KEY_SIZES: [u32; 1] = [256];

/// Parameters for a symmetric (AES) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymmetricKeyGenSpec {
    pub key_size: u32,
    pub block_mode: BlockMode,
    pub encryption_padding: EncryptionPadding,
}

/// Parameters for an asymmetric (RSA or EC) key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsymmetricKeyGenSpec {
    pub algorithm: Algorithm,
    pub key_size: u32,
    pub encryption_padding: EncryptionPadding,
    pub digest: Option<Digest>,
}

/// What kind of key to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGenSpec {
    Symmetric(SymmetricKeyGenSpec),
    Asymmetric(AsymmetricKeyGenSpec),
}

impl KeyGenSpec {
    /// A validated AES spec.
    pub fn symmetric(
        key_size: u32,
        block_mode: BlockMode,
        encryption_padding: EncryptionPadding,
    ) -> Result<Self> {
        let spec = Self::Symmetric(SymmetricKeyGenSpec {
            key_size,
            block_mode,
            encryption_padding,
        });
        spec.validate()?;
        Ok(spec)
    }

    /// A validated RSA spec. `digest` selects the OAEP / signature hash.
    pub fn rsa(key_size: u32, encryption_padding: EncryptionPadding, digest: Option<Digest>) -> Result<Self> {
        let spec = Self::Asymmetric(AsymmetricKeyGenSpec {
            algorithm: Algorithm::Rsa,
            key_size,
            encryption_padding,
            digest,
        });
        spec.validate()?;
        Ok(spec)
    }

    /// A validated EC (P-256) spec.
    pub fn ec(digest: Digest) -> Result<Self> {
        let spec = Self::Asymmetric(AsymmetricKeyGenSpec {
            algorithm: Algorithm::Ec,
            key_size: 256,
            encryption_padding: EncryptionPadding::None,
            digest: Some(digest),
        });
        spec.validate()?;
        Ok(spec)
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Symmetric(_) => Algorithm::Aes,
            Self::Asymmetric(spec) => spec.algorithm,
        }
    }

    /// Check that the algorithm, sizes, modes and paddings fit together.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Symmetric(spec) => validate_symmetric(spec),
            Self::Asymmetric(spec) => validate_asymmetric(spec),
        }
    }

    /// The parameters a generated key carries for the rest of its life.
    pub fn params(&self) -> KeyParams {
        match self {
            Self::Symmetric(spec) => KeyParams {
                algorithm: Algorithm::Aes,
                key_size: spec.key_size,
                block_mode: Some(spec.block_mode),
                padding: spec.encryption_padding,
                digest: None,
            },
            Self::Asymmetric(spec) => KeyParams {
                algorithm: spec.algorithm,
                key_size: spec.key_size,
                block_mode: None,
                padding: spec.encryption_padding,
                digest: spec.digest.filter(|d| *d != Digest::None),
            },
        }
    }
}

fn validate_symmetric(spec: &SymmetricKeyGenSpec) -> Result<()> {
    if !AES_KEY_SIZES.contains(&spec.key_size) {
        return Err(KeystoreError::InvalidKeySpec(format!(
            "AES key size must be one of {AES_KEY_SIZES:?}, got {}",
            spec.key_size
        )));
    }
    match (spec.block_mode, spec.encryption_padding) {
        (BlockMode::None, _) => Err(KeystoreError::InvalidKeySpec(
            "symmetric keys require a block mode (CBC, CTR or GCM)".to_string(),
        )),
        (BlockMode::Cbc, EncryptionPadding::Pkcs7) => Ok(()),
        (BlockMode::Cbc, padding) => Err(KeystoreError::InvalidKeySpec(format!(
            "CBC requires PKCS7 padding, got {}",
            padding.as_str()
        ))),
        (_, EncryptionPadding::None) => Ok(()),
        (mode, padding) => Err(KeystoreError::InvalidKeySpec(format!(
            "{} does not take padding, got {}",
            mode.as_str(),
            padding.as_str()
        ))),
    }
}

fn validate_asymmetric(spec: &AsymmetricKeyGenSpec) -> Result<()> {
    match spec.algorithm {
        Algorithm::Aes => Err(KeystoreError::InvalidKeySpec(
            "AES is not an asymmetric algorithm".to_string(),
        )),
        Algorithm::Rsa => {
            if !RSA_KEY_SIZES.contains(&spec.key_size) {
                return Err(KeystoreError::InvalidKeySpec(format!(
                    "RSA key size must be one of {RSA_KEY_SIZES:?}, got {}",
                    spec.key_size
                )));
            }
            match spec.encryption_padding {
                EncryptionPadding::RsaPkcs1 | EncryptionPadding::RsaOaep => Ok(()),
                EncryptionPadding::None => Err(KeystoreError::InvalidKeySpec(
                    "RSA keys cannot use no padding".to_string(),
                )),
                other => Err(KeystoreError::InvalidKeySpec(format!(
                    "RSA keys cannot use {} padding",
                    other.as_str()
                ))),
            }
        }
        Algorithm::Ec => {
            if !EC_KEY_SIZES.contains(&spec.key_size) {
                return Err(KeystoreError::InvalidKeySpec(format!(
                    "EC key size must be one of {EC_KEY_SIZES:?}, got {}",
                    spec.key_size
                )));
            }
            match spec.digest {
                None | Some(Digest::None) => Err(KeystoreError::InvalidKeySpec(
                    "EC keys require a digest".to_string(),
                )),
                Some(_) => Ok(()),
            }
        }
    }
}

/// Parameters stored alongside a key and used whenever it is operated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyParams {
    pub algorithm: Algorithm,
    pub key_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_mode: Option<BlockMode>,
    #[serde(default)]
    pub padding: EncryptionPadding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
}
