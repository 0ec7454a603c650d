//! RSA and P-256 operations.

use keystash_core::{Digest, SecretBytes};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePublicKey as _, EncodePrivateKey as _, EncodePublicKey as _};
use rand::rngs::OsRng;
use rsa::{Oaep, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey};
use sha2::Digest as _;

use super::{Direction, GeneratedKey};
use crate::error::{KeystoreError, Result};
use crate::handle::{KeyHandle, KeyMaterial};

/// RSA encryption padding, resolved from the transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RsaPadding {
    Pkcs1v15,
    /// OAEP hash; SHA-256 when the key carries no digest.
    Oaep(Option<Digest>),
}

fn keygen_failed(e: impl std::fmt::Display) -> KeystoreError {
    KeystoreError::KeyGeneration(e.to_string())
}

pub(super) fn generate_rsa(bits: usize) -> Result<GeneratedKey> {
    let private = RsaPrivateKey::new(&mut OsRng, bits).map_err(keygen_failed)?;
    let public = private.to_public_key();
    let private_der = private.to_pkcs8_der().map_err(keygen_failed)?;
    let public_der = public.to_public_key_der().map_err(keygen_failed)?;
    Ok(GeneratedKey::Pair {
        private_der: SecretBytes::new(private_der.as_bytes().to_vec()),
        public_der: public_der.as_bytes().to_vec(),
    })
}

pub(super) fn generate_ec() -> Result<GeneratedKey> {
    let secret = p256::SecretKey::random(&mut OsRng);
    let public = secret.public_key();
    let private_der = secret.to_pkcs8_der().map_err(keygen_failed)?;
    let public_der = public.to_public_key_der().map_err(keygen_failed)?;
    Ok(GeneratedKey::Pair {
        private_der: SecretBytes::new(private_der.as_bytes().to_vec()),
        public_der: public_der.as_bytes().to_vec(),
    })
}

fn hash(digest: Digest, data: &[u8]) -> Vec<u8> {
    match digest {
        Digest::None => data.to_vec(),
        Digest::Md5 => md5::Md5::digest(data).to_vec(),
        Digest::Sha1 => sha1::Sha1::digest(data).to_vec(),
        Digest::Sha224 => sha2::Sha224::digest(data).to_vec(),
        Digest::Sha256 => sha2::Sha256::digest(data).to_vec(),
        Digest::Sha384 => sha2::Sha384::digest(data).to_vec(),
        Digest::Sha512 => sha2::Sha512::digest(data).to_vec(),
    }
}

fn oaep(digest: Option<Digest>) -> Oaep {
    match digest.unwrap_or(Digest::Sha256) {
        Digest::Md5 => Oaep::new::<md5::Md5>(),
        Digest::Sha1 => Oaep::new::<sha1::Sha1>(),
        Digest::Sha224 => Oaep::new::<sha2::Sha224>(),
        Digest::None | Digest::Sha256 => Oaep::new::<sha2::Sha256>(),
        Digest::Sha384 => Oaep::new::<sha2::Sha384>(),
        Digest::Sha512 => Oaep::new::<sha2::Sha512>(),
    }
}

fn pkcs1v15_sign(digest: Option<Digest>) -> Pkcs1v15Sign {
    match digest.unwrap_or(Digest::None) {
        Digest::None => Pkcs1v15Sign::new_unprefixed(),
        Digest::Md5 => Pkcs1v15Sign::new::<md5::Md5>(),
        Digest::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        Digest::Sha224 => Pkcs1v15Sign::new::<sha2::Sha224>(),
        Digest::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        Digest::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        Digest::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
    }
}

pub(super) fn rsa_crypt(
    key: &KeyHandle,
    direction: Direction,
    padding: RsaPadding,
    input: &[u8],
) -> Result<Vec<u8>> {
    let encrypt_failed = |e: rsa::Error| KeystoreError::EncryptionFailed(e.to_string());
    let decrypt_failed = |e: rsa::Error| KeystoreError::DecryptionFailed(e.to_string());

    match (key.material(), direction) {
        (KeyMaterial::RsaPublic(public), Direction::Encrypt) => match padding {
            RsaPadding::Pkcs1v15 => public
                .encrypt(&mut OsRng, Pkcs1v15Encrypt, input)
                .map_err(encrypt_failed),
            RsaPadding::Oaep(digest) => public
                .encrypt(&mut OsRng, oaep(digest), input)
                .map_err(encrypt_failed),
        },
        (KeyMaterial::RsaPrivate(private), Direction::Decrypt) => match padding {
            RsaPadding::Pkcs1v15 => private.decrypt(Pkcs1v15Encrypt, input).map_err(decrypt_failed),
            RsaPadding::Oaep(digest) => private.decrypt(oaep(digest), input).map_err(decrypt_failed),
        },
        (material, direction) => Err(KeystoreError::UnsupportedTransformation(format!(
            "RSA {direction:?} cannot use {material:?}"
        ))),
    }
}

pub(super) fn sign(key: &KeyHandle, data: &[u8]) -> Result<Vec<u8>> {
    let digest = key.params().digest;
    match key.material() {
        KeyMaterial::RsaPrivate(private) => {
            let hashed = hash(digest.unwrap_or(Digest::None), data);
            private
                .sign(pkcs1v15_sign(digest), &hashed)
                .map_err(|e| KeystoreError::SignatureFailed(e.to_string()))
        }
        KeyMaterial::EcPrivate(secret) => {
            let prehash = hash(digest.unwrap_or(Digest::Sha256), data);
            let signing = SigningKey::from(secret);
            let signature: Signature = signing
                .sign_prehash(&prehash)
                .map_err(|e| KeystoreError::SignatureFailed(e.to_string()))?;
            Ok(signature.to_bytes().to_vec())
        }
        other => Err(KeystoreError::UnsupportedTransformation(format!(
            "signing requires an RSA or EC private key, got {other:?}"
        ))),
    }
}

pub(super) fn verify(key: &KeyHandle, data: &[u8], signature: &[u8]) -> Result<bool> {
    let digest = key.params().digest;
    match key.material() {
        KeyMaterial::RsaPublic(public) => {
            let hashed = hash(digest.unwrap_or(Digest::None), data);
            Ok(public.verify(pkcs1v15_sign(digest), &hashed, signature).is_ok())
        }
        KeyMaterial::EcPublic(public) => {
            let prehash = hash(digest.unwrap_or(Digest::Sha256), data);
            let Ok(signature) = Signature::from_slice(signature) else {
                return Ok(false);
            };
            let verifying = VerifyingKey::from(public);
            Ok(verifying.verify_prehash(&prehash, &signature).is_ok())
        }
        other => Err(KeystoreError::UnsupportedTransformation(format!(
            "verification requires an RSA or EC public key, got {other:?}"
        ))),
    }
}

pub(super) fn agree(key: &KeyHandle, peer_public_der: &[u8]) -> Result<SecretBytes> {
    match key.material() {
        KeyMaterial::EcPrivate(secret) => {
            let peer = p256::PublicKey::from_public_key_der(peer_public_der)
                .map_err(|e| KeystoreError::AgreementFailed(format!("bad peer key: {e}")))?;
            let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
            Ok(SecretBytes::new(shared.raw_secret_bytes().to_vec()))
        }
        other => Err(KeystoreError::AgreementFailed(format!(
            "key agreement requires an EC private key, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::KeyGenSpec;
    use keystash_core::{Algorithm, EncryptionPadding};

    fn pair(spec: KeyGenSpec, generated: GeneratedKey) -> (KeyHandle, KeyHandle, Vec<u8>) {
        let params = spec.params();
        match generated {
            GeneratedKey::Pair {
                private_der,
                public_der,
            } => (
                KeyHandle::new(
                    params,
                    KeyMaterial::private_from_der(params.algorithm, private_der.expose_secret())
                        .unwrap(),
                ),
                KeyHandle::new(
                    params,
                    KeyMaterial::public_from_der(params.algorithm, &public_der).unwrap(),
                ),
                public_der,
            ),
            GeneratedKey::Symmetric(_) => panic!("expected a key pair"),
        }
    }

    fn ec_pair(digest: Digest) -> (KeyHandle, KeyHandle, Vec<u8>) {
        pair(KeyGenSpec::ec(digest).unwrap(), generate_ec().unwrap())
    }

    #[test]
    fn test_ecdsa_sign_verify_across_digests() {
        for digest in [Digest::Md5, Digest::Sha1, Digest::Sha256, Digest::Sha512] {
            let (private, public, _) = ec_pair(digest);
            let sig = sign(&private, b"message").unwrap();
            assert!(verify(&public, b"message", &sig).unwrap(), "{digest} failed");
            assert!(!verify(&public, b"tampered", &sig).unwrap(), "{digest} accepted tamper");
        }
    }

    #[test]
    fn test_ecdsa_garbage_signature_is_false() {
        let (_, public, _) = ec_pair(Digest::Sha256);
        assert!(!verify(&public, b"message", b"short").unwrap());
    }

    #[test]
    fn test_ecdh_agreement_matches() {
        let (alice, _, alice_pub) = ec_pair(Digest::Sha256);
        let (bob, _, bob_pub) = ec_pair(Digest::Sha256);
        let ab = agree(&alice, &bob_pub).unwrap();
        let ba = agree(&bob, &alice_pub).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 32);
    }

    #[test]
    fn test_public_half_cannot_sign_or_agree() {
        let (_, public, other_pub) = ec_pair(Digest::Sha256);
        assert!(sign(&public, b"m").is_err());
        assert!(agree(&public, &other_pub).is_err());
    }

    #[test]
    fn test_rsa_oaep_and_signature() {
        let spec = KeyGenSpec::rsa(1024, EncryptionPadding::RsaOaep, Some(Digest::Sha256)).unwrap();
        let (private, public, _) = pair(spec, generate_rsa(1024).unwrap());
        assert_eq!(private.params().algorithm, Algorithm::Rsa);

        let oaep = RsaPadding::Oaep(Some(Digest::Sha256));
        let ct = rsa_crypt(&public, Direction::Encrypt, oaep, b"wrapped").unwrap();
        assert_eq!(ct.len(), 128);
        let pt = rsa_crypt(&private, Direction::Decrypt, oaep, &ct).unwrap();
        assert_eq!(pt, b"wrapped");

        let ct = rsa_crypt(&public, Direction::Encrypt, RsaPadding::Pkcs1v15, b"v15").unwrap();
        let pt = rsa_crypt(&private, Direction::Decrypt, RsaPadding::Pkcs1v15, &ct).unwrap();
        assert_eq!(pt, b"v15");

        // Encrypting with the private half is a misuse.
        assert!(rsa_crypt(&private, Direction::Encrypt, oaep, b"x").is_err());

        let sig = sign(&private, b"document").unwrap();
        assert!(verify(&public, b"document", &sig).unwrap());
        assert!(!verify(&public, b"forged", &sig).unwrap());
    }

    #[test]
    fn test_hash_lengths() {
        assert_eq!(hash(Digest::Md5, b"x").len(), 16);
        assert_eq!(hash(Digest::Sha1, b"x").len(), 20);
        assert_eq!(hash(Digest::Sha224, b"x").len(), 28);
        assert_eq!(hash(Digest::Sha384, b"x").len(), 48);
        assert_eq!(hash(Digest::None, b"x"), b"x");
    }
}
