//! Symmetric envelope codec.
//!
//! An envelope is `base64(iv || ciphertext)`. The IV length is fixed by the
//! block mode (16 bytes for CBC and CTR, 12 for GCM) and there is no length
//! field, so a value must be decrypted with the block mode it was written
//! under. A fresh IV is drawn for every call; callers cannot supply one.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use keystash_core::{Algorithm, BlockMode, EncryptionPadding, SecretBytes};

use crate::engine::{random_bytes, CipherEngine, Direction, AES_BLOCK_SIZE};
use crate::error::{KeystoreError, Result};
use crate::transformation::Transformation;

/// Encrypts and decrypts envelopes through a cipher engine.
#[derive(Clone)]
pub struct EnvelopeCodec {
    engine: Arc<dyn CipherEngine>,
}

impl EnvelopeCodec {
    pub fn new(engine: Arc<dyn CipherEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn CipherEngine> {
        &self.engine
    }

    /// Encrypt `plaintext` under `key` and return the base64 envelope.
    pub fn encrypt(&self, plaintext: &[u8], key: &[u8], block_mode: BlockMode) -> Result<String> {
        let iv_len = iv_len(block_mode)?;
        let iv = random_bytes(iv_len);

        let padded;
        let input = if self.pads_manually(block_mode) {
            padded = pkcs7_pad(plaintext);
            padded.as_slice()
        } else {
            plaintext
        };

        let transformation = self.transformation(block_mode);
        let ciphertext = self
            .engine
            .symmetric(&transformation, Direction::Encrypt, key, &iv, input)?;

        let mut envelope = iv;
        envelope.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(envelope))
    }

    /// Decrypt a base64 envelope written with the same key and block mode.
    pub fn decrypt(&self, envelope: &str, key: &[u8], block_mode: BlockMode) -> Result<SecretBytes> {
        let iv_len = iv_len(block_mode)?;
        let bytes = BASE64.decode(envelope.trim())?;
        if bytes.len() < iv_len {
            return Err(KeystoreError::DecryptionFailed(format!(
                "envelope of {} bytes is shorter than its {iv_len}-byte IV",
                bytes.len()
            )));
        }
        let (iv, ciphertext) = bytes.split_at(iv_len);

        let transformation = self.transformation(block_mode);
        let mut plaintext =
            self.engine
                .symmetric(&transformation, Direction::Decrypt, key, iv, ciphertext)?;

        if self.pads_manually(block_mode) {
            let len = pkcs7_unpadded_len(&plaintext)?;
            plaintext.truncate(len);
        }
        Ok(SecretBytes::new(plaintext))
    }

    fn pads_manually(&self, block_mode: BlockMode) -> bool {
        block_mode == BlockMode::Cbc && !self.engine.profile().native_block_padding
    }

    fn transformation(&self, block_mode: BlockMode) -> Transformation {
        let profile = self.engine.profile();
        let padding = if block_mode == BlockMode::Cbc && profile.native_block_padding {
            EncryptionPadding::Pkcs7
        } else {
            EncryptionPadding::None
        };
        Transformation::resolve(Algorithm::Aes, Some(block_mode), Some(padding), &profile.aliases)
    }
}

fn iv_len(block_mode: BlockMode) -> Result<usize> {
    block_mode.iv_len().ok_or_else(|| {
        KeystoreError::UnsupportedTransformation(
            "block mode NONE has no envelope; it is reserved for asymmetric keys".to_string(),
        )
    })
}

fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad = AES_BLOCK_SIZE - data.len() % AES_BLOCK_SIZE;
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    out.resize(data.len() + pad, pad as u8);
    out
}

/// Length of `data` once its trailing padding-length byte is honoured.
fn pkcs7_unpadded_len(data: &[u8]) -> Result<usize> {
    let pad = *data.last().ok_or(KeystoreError::InvalidPadding)? as usize;
    if pad == 0 || pad > AES_BLOCK_SIZE || pad > data.len() {
        return Err(KeystoreError::InvalidPadding);
    }
    Ok(data.len() - pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RustCryptoEngine;

    fn codecs() -> Vec<EnvelopeCodec> {
        vec![
            EnvelopeCodec::new(Arc::new(RustCryptoEngine::software())),
            EnvelopeCodec::new(Arc::new(RustCryptoEngine::raw_blocks())),
        ]
    }

    const MODES: [BlockMode; 3] = [BlockMode::Cbc, BlockMode::Ctr, BlockMode::Gcm];

    #[test]
    fn test_roundtrip_all_modes_and_lengths() {
        let key = random_bytes(32);
        for codec in codecs() {
            for mode in MODES {
                for len in [0usize, 1, 15, 16, 17, 100] {
                    let plaintext = vec![0xa5u8; len];
                    let envelope = codec.encrypt(&plaintext, &key, mode).unwrap();
                    let decrypted = codec.decrypt(&envelope, &key, mode).unwrap();
                    assert_eq!(
                        decrypted.expose_secret(),
                        plaintext.as_slice(),
                        "{} {mode} len {len}",
                        codec.engine().profile().name
                    );
                }
            }
        }
    }

    #[test]
    fn test_iv_is_prefixed() {
        let codec = EnvelopeCodec::new(Arc::new(RustCryptoEngine::software()));
        let key = random_bytes(16);

        let gcm = BASE64.decode(codec.encrypt(b"abc", &key, BlockMode::Gcm).unwrap()).unwrap();
        assert_eq!(gcm.len(), 12 + 3 + 16);

        let ctr = BASE64.decode(codec.encrypt(b"abc", &key, BlockMode::Ctr).unwrap()).unwrap();
        assert_eq!(ctr.len(), 16 + 3);

        let cbc = BASE64.decode(codec.encrypt(b"", &key, BlockMode::Cbc).unwrap()).unwrap();
        assert_eq!(cbc.len(), 16 + 16);
    }

    #[test]
    fn test_nonce_freshness() {
        let key = random_bytes(32);
        for codec in codecs() {
            for mode in MODES {
                let a = codec.encrypt(b"same", &key, mode).unwrap();
                let b = codec.encrypt(b"same", &key, mode).unwrap();
                assert_ne!(a, b, "{mode} reused an IV");
            }
        }
    }

    #[test]
    fn test_truncated_cbc_is_invalid_padding() {
        let key = random_bytes(32);
        for codec in codecs() {
            let envelope = codec.encrypt(b"secret value", &key, BlockMode::Cbc).unwrap();
            let mut bytes = BASE64.decode(envelope).unwrap();
            bytes.pop();
            let truncated = BASE64.encode(bytes);
            assert!(matches!(
                codec.decrypt(&truncated, &key, BlockMode::Cbc),
                Err(KeystoreError::InvalidPadding)
            ));
        }
    }

    #[test]
    fn test_mode_none_rejected() {
        let codec = EnvelopeCodec::new(Arc::new(RustCryptoEngine::software()));
        let key = random_bytes(16);
        assert!(codec.encrypt(b"x", &key, BlockMode::None).is_err());
        assert!(codec.decrypt("AAAA", &key, BlockMode::None).is_err());
    }

    #[test]
    fn test_short_envelope_rejected() {
        let codec = EnvelopeCodec::new(Arc::new(RustCryptoEngine::software()));
        let short = BASE64.encode([0u8; 8]);
        assert!(matches!(
            codec.decrypt(&short, &random_bytes(16), BlockMode::Gcm),
            Err(KeystoreError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_unpad_bounds() {
        assert_eq!(pkcs7_unpadded_len(&[1, 2, 3, 1]).unwrap(), 3);
        assert_eq!(pkcs7_unpadded_len(&[16u8; 16]).unwrap(), 0);
        assert!(matches!(pkcs7_unpadded_len(&[1, 2, 0]), Err(KeystoreError::InvalidPadding)));
        assert!(matches!(pkcs7_unpadded_len(&[17u8; 32]), Err(KeystoreError::InvalidPadding)));
        assert!(matches!(pkcs7_unpadded_len(&[]), Err(KeystoreError::InvalidPadding)));
    }

    #[test]
    fn test_pad_always_adds() {
        assert_eq!(pkcs7_pad(b"").len(), 16);
        assert_eq!(pkcs7_pad(&[0u8; 16]).len(), 32);
        assert_eq!(*pkcs7_pad(b"abc").last().unwrap(), 13);
    }
}
