//! Self-describing key records for the software keystore.
//!
//! A record is a JSON object
//!
//! ```json
//! {"algorithm":"AES","key":"<base64>","canEncrypt":true,"canDecrypt":true,
//!  "canSign":false,"canVerify":false,"canWrapKey":false,"canAgree":false,
//!  "blockMode":"GCM","padding":"NONE","keySize":256}
//! ```
//!
//! with `publicKey` added for asymmetric pairs, then base64-encoded as a
//! whole. `key` is the raw AES key or the PKCS#8 DER private key; `publicKey`
//! is SPKI DER. The parameter fields are optional so older records decode.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use keystash_core::{Algorithm, BlockMode, Digest, EncryptionPadding, SecretBytes, SecretString};
use serde::{Deserialize, Serialize};

use crate::capability::{KeyOperation, KeyPurposes};
use crate::engine::GeneratedKey;
use crate::error::{KeystoreError, Result};
use crate::handle::{KeyHandle, KeyMaterial};
use crate::keygen::KeyParams;

/// A persisted key and the purposes it was created with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    algorithm: Algorithm,
    key: SecretString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_key: Option<String>,
    #[serde(flatten)]
    purposes: KeyPurposes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block_mode: Option<BlockMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    padding: Option<EncryptionPadding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<Digest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_size: Option<u32>,
}

impl KeyRecord {
    pub(crate) fn new(params: KeyParams, purposes: KeyPurposes, generated: &GeneratedKey) -> Self {
        let (key, public_key) = match generated {
            GeneratedKey::Symmetric(bytes) => (BASE64.encode(bytes.expose_secret()), None),
            GeneratedKey::Pair {
                private_der,
                public_der,
            } => (
                BASE64.encode(private_der.expose_secret()),
                Some(BASE64.encode(public_der)),
            ),
        };
        Self {
            algorithm: params.algorithm,
            key: SecretString::new(key),
            public_key,
            purposes,
            block_mode: params.block_mode,
            padding: Some(params.padding),
            digest: params.digest,
            key_size: Some(params.key_size),
        }
    }

    /// Serialize to the opaque string written to the backend.
    pub(crate) fn encode(&self) -> Result<String> {
        Ok(BASE64.encode(serde_json::to_vec(self)?))
    }

    /// Parse a stored blob. Anything unreadable is reported as unretrievable.
    pub(crate) fn decode(alias: &str, blob: &str) -> Result<Self> {
        let corrupt =
            |what: String| KeystoreError::ImpossibleToRetrieveKey(format!("{alias}: {what}"));
        let json = BASE64
            .decode(blob.trim())
            .map_err(|e| corrupt(format!("record is not base64: {e}")))?;
        let record: Self = serde_json::from_slice(&json)
            .map_err(|e| corrupt(format!("record is not valid JSON: {e}")))?;
        record
            .purposes
            .validated()
            .map_err(|e| corrupt(format!("record purposes are invalid: {e}")))?;
        Ok(record)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn purposes(&self) -> &KeyPurposes {
        &self.purposes
    }

    /// The public half, SPKI DER, for asymmetric records.
    pub fn public_key_der(&self) -> Result<Option<Vec<u8>>> {
        self.public_key
            .as_deref()
            .map(|encoded| BASE64.decode(encoded).map_err(Into::into))
            .transpose()
    }

    /// Parameters the key was generated under, filling gaps left by older records.
    pub fn params(&self) -> KeyParams {
        let key_size = self.key_size.unwrap_or(match self.algorithm {
            Algorithm::Aes => BASE64
                .decode(self.key.expose_secret())
                .map(|bytes| SecretBytes::new(bytes).len() as u32 * 8)
                .unwrap_or(0),
            Algorithm::Rsa => 2048,
            Algorithm::Ec => 256,
        });
        let block_mode = match self.algorithm {
            Algorithm::Aes => Some(self.block_mode.unwrap_or_default()),
            _ => self.block_mode,
        };
        KeyParams {
            algorithm: self.algorithm,
            key_size,
            block_mode,
            padding: self.padding.unwrap_or_default(),
            digest: self.digest.filter(|d| *d != Digest::None),
        }
    }

    /// Decode the half of the key `operation` needs.
    ///
    /// Asymmetric pairs hand out the public half for encryption and
    /// verification and the private half for everything else. Purposes are
    /// not checked here.
    pub(crate) fn resolve_handle(&self, operation: KeyOperation) -> Result<KeyHandle> {
        let params = self.params();
        let corrupt = |what: &str| {
            KeystoreError::ImpossibleToRetrieveKey(format!("{} record {what}", self.algorithm))
        };

        let material = match self.algorithm {
            Algorithm::Aes => {
                let bytes = BASE64
                    .decode(self.key.expose_secret())
                    .map_err(|_| corrupt("has a malformed key"))?;
                KeyMaterial::Symmetric(SecretBytes::new(bytes))
            }
            algorithm if operation.uses_public_half() => {
                let der = self
                    .public_key_der()
                    .map_err(|_| corrupt("has a malformed public key"))?
                    .ok_or_else(|| corrupt("has no public key"))?;
                KeyMaterial::public_from_der(algorithm, &der)?
            }
            algorithm => {
                let der = SecretBytes::new(
                    BASE64
                        .decode(self.key.expose_secret())
                        .map_err(|_| corrupt("has a malformed private key"))?,
                );
                KeyMaterial::private_from_der(algorithm, der.expose_secret())?
            }
        };
        Ok(KeyHandle::new(params, material))
    }
}
