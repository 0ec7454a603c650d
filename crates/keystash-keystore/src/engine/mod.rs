//! Native cipher engines.
//!
//! The key lifecycle and envelope code is written once against
//! [`CipherEngine`]; which engine backs it is chosen when a store is opened.
//! [`RustCryptoEngine`] is the software provider, offered in two profiles:
//!
//! - `software` pads CBC itself and only knows the PKCS#5 padding name, so
//!   its profile carries a `PKCS7Padding -> PKCS5Padding` alias table.
//! - `raw-blocks` only transforms whole blocks, like constrained platform
//!   APIs do; the envelope codec applies PKCS#7 padding before calling it.

mod asymmetric;
mod symmetric;

pub(crate) use symmetric::AES_BLOCK_SIZE;

use std::sync::Arc;

use keystash_core::config::EngineKind;
use keystash_core::{Algorithm, BlockMode, SecretBytes};
use rand::RngCore;

use crate::error::{KeystoreError, Result};
use crate::handle::KeyHandle;
use crate::keygen::KeyGenSpec;
use crate::transformation::{PaddingAliases, Transformation};

/// Cipher direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Static facts about an engine that callers need to drive it correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineProfile {
    pub name: &'static str,
    pub aliases: PaddingAliases,
    /// Whether the engine applies block padding itself.
    pub native_block_padding: bool,
}

impl EngineProfile {
    pub const SOFTWARE: Self = Self {
        name: "software",
        aliases: PaddingAliases::PKCS5,
        native_block_padding: true,
    };

    pub const RAW_BLOCKS: Self = Self {
        name: "raw-blocks",
        aliases: PaddingAliases::IDENTITY,
        native_block_padding: false,
    };
}

/// Freshly generated key material, encoded for storage.
pub enum GeneratedKey {
    Symmetric(SecretBytes),
    /// PKCS#8 DER private half and SPKI DER public half.
    Pair {
        private_der: SecretBytes,
        public_der: Vec<u8>,
    },
}

/// A native crypto provider.
pub trait CipherEngine: Send + Sync {
    fn profile(&self) -> &EngineProfile;

    /// Generate key material for a validated spec.
    fn generate(&self, spec: &KeyGenSpec) -> Result<GeneratedKey>;

    /// Run a symmetric transformation with an explicit IV / nonce.
    fn symmetric(
        &self,
        transformation: &Transformation,
        direction: Direction,
        key: &[u8],
        iv: &[u8],
        input: &[u8],
    ) -> Result<Vec<u8>>;

    /// Run an asymmetric encryption transformation.
    fn asymmetric(
        &self,
        transformation: &Transformation,
        direction: Direction,
        key: &KeyHandle,
        input: &[u8],
    ) -> Result<Vec<u8>>;

    fn sign(&self, key: &KeyHandle, data: &[u8]) -> Result<Vec<u8>>;

    fn verify(&self, key: &KeyHandle, data: &[u8], signature: &[u8]) -> Result<bool>;

    /// Derive a shared secret with a peer's SPKI DER public key.
    fn agree(&self, key: &KeyHandle, peer_public_der: &[u8]) -> Result<SecretBytes>;
}

/// Build the engine selected in configuration.
pub fn for_kind(kind: EngineKind) -> Arc<dyn CipherEngine> {
    match kind {
        EngineKind::Software => Arc::new(RustCryptoEngine::software()),
        EngineKind::RawBlocks => Arc::new(RustCryptoEngine::raw_blocks()),
    }
}

/// Fill a fresh random buffer of `len` bytes.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// Padding names this engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnginePadding {
    None,
    Pkcs5,
    Pkcs1,
    Oaep,
}

/// A transformation descriptor parsed against the engine's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parsed {
    algorithm: Algorithm,
    mode: Option<BlockMode>,
    padding: EnginePadding,
}

/// Software engine backed by the RustCrypto crates.
#[derive(Debug, Clone)]
pub struct RustCryptoEngine {
    profile: EngineProfile,
}

impl RustCryptoEngine {
    pub fn software() -> Self {
        Self {
            profile: EngineProfile::SOFTWARE,
        }
    }

    pub fn raw_blocks() -> Self {
        Self {
            profile: EngineProfile::RAW_BLOCKS,
        }
    }

    fn parse(&self, transformation: &Transformation) -> Result<Parsed> {
        let unsupported =
            |what: &str| KeystoreError::UnsupportedTransformation(format!("{transformation}: {what}"));

        let mut segments = transformation.segments();
        let algorithm = match segments.next() {
            Some("AES") => Algorithm::Aes,
            Some("RSA") => Algorithm::Rsa,
            Some("EC") => Algorithm::Ec,
            Some(other) => return Err(unsupported(&format!("unknown algorithm {other}"))),
            None => return Err(unsupported("empty descriptor")),
        };

        let mut mode = None;
        let mut padding = None;
        for segment in segments {
            let parsed_mode = match segment {
                "CBC" => Some(BlockMode::Cbc),
                "CTR" => Some(BlockMode::Ctr),
                "GCM" => Some(BlockMode::Gcm),
                "NONE" | "ECB" => Some(BlockMode::None),
                _ => None,
            };
            if let Some(m) = parsed_mode {
                if mode.is_some() || padding.is_some() {
                    return Err(unsupported("block mode out of place"));
                }
                mode = Some(m);
                continue;
            }
            if padding.is_some() {
                return Err(unsupported("more than one padding"));
            }
            padding = Some(match segment {
                "NoPadding" => EnginePadding::None,
                "PKCS5Padding" if self.profile.native_block_padding => EnginePadding::Pkcs5,
                "PKCS1Padding" => EnginePadding::Pkcs1,
                "OAEPPadding" => EnginePadding::Oaep,
                other => return Err(unsupported(&format!("unknown padding {other}"))),
            });
        }

        Ok(Parsed {
            algorithm,
            mode,
            padding: padding.unwrap_or(EnginePadding::None),
        })
    }
}

impl CipherEngine for RustCryptoEngine {
    fn profile(&self) -> &EngineProfile {
        &self.profile
    }

    fn generate(&self, spec: &KeyGenSpec) -> Result<GeneratedKey> {
        spec.validate()?;
        match spec {
            KeyGenSpec::Symmetric(s) => Ok(GeneratedKey::Symmetric(SecretBytes::new(
                random_bytes(s.key_size as usize / 8),
            ))),
            KeyGenSpec::Asymmetric(a) => match a.algorithm {
                Algorithm::Rsa => asymmetric::generate_rsa(a.key_size as usize),
                Algorithm::Ec => asymmetric::generate_ec(),
                Algorithm::Aes => Err(KeystoreError::InvalidKeySpec(
                    "AES is not an asymmetric algorithm".to_string(),
                )),
            },
        }
    }

    fn symmetric(
        &self,
        transformation: &Transformation,
        direction: Direction,
        key: &[u8],
        iv: &[u8],
        input: &[u8],
    ) -> Result<Vec<u8>> {
        let parsed = self.parse(transformation)?;
        if parsed.algorithm != Algorithm::Aes {
            return Err(KeystoreError::UnsupportedTransformation(format!(
                "{transformation}: not a symmetric algorithm"
            )));
        }
        let mode = match parsed.mode {
            Some(mode) if mode != BlockMode::None => mode,
            _ => {
                return Err(KeystoreError::UnsupportedTransformation(format!(
                    "{transformation}: symmetric transformations need CBC, CTR or GCM"
                )))
            }
        };
        if mode.iv_len() != Some(iv.len()) {
            return Err(KeystoreError::UnsupportedTransformation(format!(
                "{transformation}: IV must be {:?} bytes, got {}",
                mode.iv_len(),
                iv.len()
            )));
        }

        match (mode, parsed.padding) {
            (BlockMode::Gcm, EnginePadding::None) => symmetric::gcm(key, iv, input, direction),
            (BlockMode::Ctr, EnginePadding::None) => symmetric::ctr(key, iv, input),
            (BlockMode::Cbc, EnginePadding::None) => symmetric::cbc(key, iv, input, direction, false),
            (BlockMode::Cbc, EnginePadding::Pkcs5) => symmetric::cbc(key, iv, input, direction, true),
            _ => Err(KeystoreError::UnsupportedTransformation(format!(
                "{transformation}: padding not valid for {mode}"
            ))),
        }
    }

    fn asymmetric(
        &self,
        transformation: &Transformation,
        direction: Direction,
        key: &KeyHandle,
        input: &[u8],
    ) -> Result<Vec<u8>> {
        let parsed = self.parse(transformation)?;
        if parsed.algorithm != Algorithm::Rsa {
            return Err(KeystoreError::UnsupportedTransformation(format!(
                "{transformation}: only RSA supports asymmetric encryption"
            )));
        }
        if matches!(parsed.mode, Some(m) if m != BlockMode::None) {
            return Err(KeystoreError::UnsupportedTransformation(format!(
                "{transformation}: RSA takes no block mode"
            )));
        }
        let digest = key.params().digest;
        match parsed.padding {
            EnginePadding::Pkcs1 => {
                asymmetric::rsa_crypt(key, direction, asymmetric::RsaPadding::Pkcs1v15, input)
            }
            EnginePadding::Oaep => {
                asymmetric::rsa_crypt(key, direction, asymmetric::RsaPadding::Oaep(digest), input)
            }
            _ => Err(KeystoreError::UnsupportedTransformation(format!(
                "{transformation}: RSA requires PKCS1 or OAEP padding"
            ))),
        }
    }

    fn sign(&self, key: &KeyHandle, data: &[u8]) -> Result<Vec<u8>> {
        asymmetric::sign(key, data)
    }

    fn verify(&self, key: &KeyHandle, data: &[u8], signature: &[u8]) -> Result<bool> {
        asymmetric::verify(key, data, signature)
    }

    fn agree(&self, key: &KeyHandle, peer_public_der: &[u8]) -> Result<SecretBytes> {
        asymmetric::agree(key, peer_public_der)
    }
}
