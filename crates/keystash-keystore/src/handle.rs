//! Resolved native key handles.

use keystash_core::{Algorithm, SecretBytes};
use p256::pkcs8::{DecodePrivateKey as _, DecodePublicKey as _};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;

use crate::error::{KeystoreError, Result};
use crate::keygen::KeyParams;

/// Native key material, one half of a pair or a whole symmetric key.
pub enum KeyMaterial {
    Symmetric(SecretBytes),
    RsaPublic(RsaPublicKey),
    RsaPrivate(Box<RsaPrivateKey>),
    EcPublic(p256::PublicKey),
    EcPrivate(p256::SecretKey),
}

impl KeyMaterial {
    /// Decode a PKCS#8 DER private key for `algorithm`.
    pub fn private_from_der(algorithm: Algorithm, der: &[u8]) -> Result<Self> {
        match algorithm {
            Algorithm::Rsa => RsaPrivateKey::from_pkcs8_der(der)
                .map(|key| Self::RsaPrivate(Box::new(key)))
                .map_err(|e| malformed("RSA private", e)),
            Algorithm::Ec => p256::SecretKey::from_pkcs8_der(der)
                .map(Self::EcPrivate)
                .map_err(|e| malformed("EC private", e)),
            Algorithm::Aes => Err(KeystoreError::ImpossibleToRetrieveKey(
                "AES keys have no private half".to_string(),
            )),
        }
    }

    /// Decode an SPKI DER public key for `algorithm`.
    pub fn public_from_der(algorithm: Algorithm, der: &[u8]) -> Result<Self> {
        match algorithm {
            Algorithm::Rsa => RsaPublicKey::from_public_key_der(der)
                .map(Self::RsaPublic)
                .map_err(|e| malformed("RSA public", e)),
            Algorithm::Ec => p256::PublicKey::from_public_key_der(der)
                .map(Self::EcPublic)
                .map_err(|e| malformed("EC public", e)),
            Algorithm::Aes => Err(KeystoreError::ImpossibleToRetrieveKey(
                "AES keys have no public half".to_string(),
            )),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Symmetric(_) => "symmetric",
            Self::RsaPublic(_) => "rsa-public",
            Self::RsaPrivate(_) => "rsa-private",
            Self::EcPublic(_) => "ec-public",
            Self::EcPrivate(_) => "ec-private",
        }
    }
}

fn malformed(what: &str, e: impl fmt::Display) -> KeystoreError {
    KeystoreError::ImpossibleToRetrieveKey(format!("malformed {what} key: {e}"))
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial::{}([REDACTED])", self.kind())
    }
}

/// A key resolved for one operation, with the parameters it was generated under.
#[derive(Debug)]
pub struct KeyHandle {
    params: KeyParams,
    material: KeyMaterial,
}

impl KeyHandle {
    pub fn new(params: KeyParams, material: KeyMaterial) -> Self {
        Self { params, material }
    }

    pub fn params(&self) -> &KeyParams {
        &self.params
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Raw symmetric key bytes, or an error for asymmetric halves.
    pub fn symmetric_bytes(&self) -> Result<&[u8]> {
        match &self.material {
            KeyMaterial::Symmetric(bytes) => Ok(bytes.expose_secret()),
            other => Err(KeystoreError::UnsupportedTransformation(format!(
                "expected a symmetric key, got {}",
                other.kind()
            ))),
        }
    }

    /// Whether this handle is the public half of a pair.
    pub fn is_public(&self) -> bool {
        matches!(
            self.material,
            KeyMaterial::RsaPublic(_) | KeyMaterial::EcPublic(_)
        )
    }
}
