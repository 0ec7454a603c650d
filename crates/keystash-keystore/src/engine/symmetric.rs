//! AES in GCM, CTR and CBC modes.

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, Nonce};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, KeyInit};
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};

use super::Direction;
use crate::error::{KeystoreError, Result};

type Aes192Gcm = AesGcm<Aes192, U12>;
type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes192Ctr = ctr::Ctr128BE<Aes192>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// AES block size in bytes.
pub(crate) const AES_BLOCK_SIZE: usize = 16;

fn bad_key_len(len: usize) -> KeystoreError {
    KeystoreError::UnsupportedTransformation(format!(
        "AES key must be 16, 24 or 32 bytes, got {len}"
    ))
}

pub(super) fn gcm(key: &[u8], iv: &[u8], input: &[u8], direction: Direction) -> Result<Vec<u8>> {
    match key.len() {
        16 => gcm_with::<Aes128Gcm>(key, iv, input, direction),
        24 => gcm_with::<Aes192Gcm>(key, iv, input, direction),
        32 => gcm_with::<Aes256Gcm>(key, iv, input, direction),
        n => Err(bad_key_len(n)),
    }
}

fn gcm_with<A: Aead + KeyInit>(
    key: &[u8],
    iv: &[u8],
    input: &[u8],
    direction: Direction,
) -> Result<Vec<u8>> {
    let cipher = A::new_from_slice(key).map_err(|e| KeystoreError::EncryptionFailed(e.to_string()))?;
    let nonce = Nonce::<A>::from_slice(iv);
    match direction {
        Direction::Encrypt => cipher
            .encrypt(nonce, input)
            .map_err(|e| KeystoreError::EncryptionFailed(e.to_string())),
        // The tag is the trailing 16 bytes of `input`; a mismatch is an integrity failure.
        Direction::Decrypt => cipher
            .decrypt(nonce, input)
            .map_err(|_| KeystoreError::DecryptionFailed("authentication tag mismatch".to_string())),
    }
}

/// CTR is its own inverse, so direction does not matter.
pub(super) fn ctr(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => ctr_with::<Aes128Ctr>(key, iv, input),
        24 => ctr_with::<Aes192Ctr>(key, iv, input),
        32 => ctr_with::<Aes256Ctr>(key, iv, input),
        n => Err(bad_key_len(n)),
    }
}

fn ctr_with<C: KeyIvInit + StreamCipher>(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    let mut cipher =
        C::new_from_slices(key, iv).map_err(|e| KeystoreError::EncryptionFailed(e.to_string()))?;
    let mut buf = input.to_vec();
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}

/// CBC, padding with PKCS#7 when `pkcs7` is set and requiring whole blocks otherwise.
pub(super) fn cbc(
    key: &[u8],
    iv: &[u8],
    input: &[u8],
    direction: Direction,
    pkcs7: bool,
) -> Result<Vec<u8>> {
    match (key.len(), direction) {
        (16, Direction::Encrypt) => cbc_encrypt::<cbc::Encryptor<Aes128>>(key, iv, input, pkcs7),
        (24, Direction::Encrypt) => cbc_encrypt::<cbc::Encryptor<Aes192>>(key, iv, input, pkcs7),
        (32, Direction::Encrypt) => cbc_encrypt::<cbc::Encryptor<Aes256>>(key, iv, input, pkcs7),
        (16, Direction::Decrypt) => cbc_decrypt::<cbc::Decryptor<Aes128>>(key, iv, input, pkcs7),
        (24, Direction::Decrypt) => cbc_decrypt::<cbc::Decryptor<Aes192>>(key, iv, input, pkcs7),
        (32, Direction::Decrypt) => cbc_decrypt::<cbc::Decryptor<Aes256>>(key, iv, input, pkcs7),
        (n, _) => Err(bad_key_len(n)),
    }
}

fn cbc_encrypt<E: KeyIvInit + BlockEncryptMut>(
    key: &[u8],
    iv: &[u8],
    input: &[u8],
    pkcs7: bool,
) -> Result<Vec<u8>> {
    let encryptor =
        E::new_from_slices(key, iv).map_err(|e| KeystoreError::EncryptionFailed(e.to_string()))?;
    if pkcs7 {
        return Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(input));
    }
    if input.len() % AES_BLOCK_SIZE != 0 {
        return Err(KeystoreError::EncryptionFailed(format!(
            "input of {} bytes is not a whole number of blocks",
            input.len()
        )));
    }
    Ok(encryptor.encrypt_padded_vec_mut::<NoPadding>(input))
}

fn cbc_decrypt<D: KeyIvInit + BlockDecryptMut>(
    key: &[u8],
    iv: &[u8],
    input: &[u8],
    pkcs7: bool,
) -> Result<Vec<u8>> {
    // A ragged ciphertext can only come from truncation or a mode mismatch.
    if input.is_empty() || input.len() % AES_BLOCK_SIZE != 0 {
        return Err(KeystoreError::InvalidPadding);
    }
    let decryptor =
        D::new_from_slices(key, iv).map_err(|e| KeystoreError::DecryptionFailed(e.to_string()))?;
    if pkcs7 {
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(input)
            .map_err(|_| KeystoreError::InvalidPadding)
    } else {
        decryptor
            .decrypt_padded_vec_mut::<NoPadding>(input)
            .map_err(|_| KeystoreError::InvalidPadding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = [0x2b; 16];
    const IV16: [u8; 16] = [0x01; 16];
    const IV12: [u8; 12] = [0x02; 12];

    #[test]
    fn test_gcm_appends_tag() {
        let ct = gcm(&KEY, &IV12, b"abc", Direction::Encrypt).unwrap();
        assert_eq!(ct.len(), 3 + 16);
        let pt = gcm(&KEY, &IV12, &ct, Direction::Decrypt).unwrap();
        assert_eq!(pt, b"abc");
    }

    #[test]
    fn test_gcm_tamper_detected() {
        let mut ct = gcm(&KEY, &IV12, b"abc", Direction::Encrypt).unwrap();
        ct[0] ^= 0xff;
        assert!(matches!(
            gcm(&KEY, &IV12, &ct, Direction::Decrypt),
            Err(KeystoreError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_ctr_preserves_length() {
        let ct = ctr(&KEY, &IV16, b"seventeen bytes!!").unwrap();
        assert_eq!(ct.len(), 17);
        assert_eq!(ctr(&KEY, &IV16, &ct).unwrap(), b"seventeen bytes!!");
    }

    #[test]
    fn test_cbc_pkcs7_full_block_of_padding() {
        let ct = cbc(&KEY, &IV16, &[0u8; 16], Direction::Encrypt, true).unwrap();
        assert_eq!(ct.len(), 32);
        let pt = cbc(&KEY, &IV16, &ct, Direction::Decrypt, true).unwrap();
        assert_eq!(pt, [0u8; 16]);
    }

    #[test]
    fn test_cbc_truncated_is_invalid_padding() {
        let ct = cbc(&KEY, &IV16, b"hello", Direction::Encrypt, true).unwrap();
        assert!(matches!(
            cbc(&KEY, &IV16, &ct[..ct.len() - 1], Direction::Decrypt, true),
            Err(KeystoreError::InvalidPadding)
        ));
    }

    #[test]
    fn test_rejects_bad_key_length() {
        assert!(gcm(&[0u8; 20], &IV12, b"x", Direction::Encrypt).is_err());
        assert!(ctr(&[0u8; 20], &IV16, b"x").is_err());
        assert!(cbc(&[0u8; 20], &IV16, b"x", Direction::Encrypt, true).is_err());
    }
}
