//! Key purposes and operation gating.
//!
//! Every key carries an immutable [`KeyPurposes`] set fixed at generation
//! time. Before a key handle is handed out for an operation, the requested
//! [`KeyOperation`] is checked against that set.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KeystoreError, Result};

/// An operation a caller wants to perform with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOperation {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    Agree,
    Wrap,
    /// Internal retrieval that performs no cryptographic transform. Always permitted.
    ObtainKey,
}

impl KeyOperation {
    /// Operations that only ever need the public half of an asymmetric pair.
    pub fn uses_public_half(&self) -> bool {
        matches!(self, Self::Encrypt | Self::Verify)
    }
}

impl fmt::Display for KeyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Encrypt => "ENCRYPT",
            Self::Decrypt => "DECRYPT",
            Self::Sign => "SIGN",
            Self::Verify => "VERIFY",
            Self::Agree => "AGREE",
            Self::Wrap => "WRAP",
            Self::ObtainKey => "OBTAIN_KEY",
        };
        f.write_str(name)
    }
}

/// The set of operations a key may perform.
///
/// Construct through [`KeyPurposes::new`] or the builder methods starting
/// from [`KeyPurposes::builder`]; a set with every flag cleared is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPurposes {
    can_encrypt: bool,
    can_decrypt: bool,
    can_sign: bool,
    can_verify: bool,
    can_wrap_key: bool,
    can_agree: bool,
}

impl KeyPurposes {
    /// Create a purposes set, failing with [`KeystoreError::InvalidKeyPurposes`]
    /// if every flag is false.
    pub fn new(
        can_encrypt: bool,
        can_decrypt: bool,
        can_sign: bool,
        can_verify: bool,
        can_wrap_key: bool,
        can_agree: bool,
    ) -> Result<Self> {
        Self {
            can_encrypt,
            can_decrypt,
            can_sign,
            can_verify,
            can_wrap_key,
            can_agree,
        }
        .validated()
    }

    /// Start from an empty set; finish with [`PurposesBuilder::build`].
    pub fn builder() -> PurposesBuilder {
        PurposesBuilder::default()
    }

    /// Encrypt + decrypt, the usual purposes for a symmetric key.
    pub fn encrypt_decrypt() -> Self {
        Self {
            can_encrypt: true,
            can_decrypt: true,
            can_sign: false,
            can_verify: false,
            can_wrap_key: false,
            can_agree: false,
        }
    }

    /// Sign + verify.
    pub fn sign_verify() -> Self {
        Self {
            can_encrypt: false,
            can_decrypt: false,
            can_sign: true,
            can_verify: true,
            can_wrap_key: false,
            can_agree: false,
        }
    }

    /// Re-check the non-empty invariant, e.g. after deserializing a stored record.
    pub fn validated(self) -> Result<Self> {
        if self.can_encrypt
            || self.can_decrypt
            || self.can_sign
            || self.can_verify
            || self.can_wrap_key
            || self.can_agree
        {
            Ok(self)
        } else {
            Err(KeystoreError::InvalidKeyPurposes)
        }
    }

    /// Whether the key may perform `operation`.
    pub fn can_perform(&self, operation: KeyOperation) -> bool {
        match operation {
            KeyOperation::Encrypt => self.can_encrypt,
            KeyOperation::Decrypt => self.can_decrypt,
            KeyOperation::Sign => self.can_sign,
            KeyOperation::Verify => self.can_verify,
            KeyOperation::Agree => self.can_agree,
            KeyOperation::Wrap => self.can_wrap_key,
            KeyOperation::ObtainKey => true,
        }
    }

    /// Fail with [`KeystoreError::KeyCannotPerformOperation`] unless `operation` is granted.
    pub fn ensure(&self, operation: KeyOperation) -> Result<()> {
        if self.can_perform(operation) {
            Ok(())
        } else {
            Err(KeystoreError::KeyCannotPerformOperation(operation))
        }
    }

    pub fn can_encrypt(&self) -> bool {
        self.can_encrypt
    }

    pub fn can_decrypt(&self) -> bool {
        self.can_decrypt
    }

    pub fn can_sign(&self) -> bool {
        self.can_sign
    }

    pub fn can_verify(&self) -> bool {
        self.can_verify
    }

    pub fn can_wrap_key(&self) -> bool {
        self.can_wrap_key
    }

    pub fn can_agree(&self) -> bool {
        self.can_agree
    }
}

/// Incremental construction of a [`KeyPurposes`] set.
#[derive(Debug, Default, Clone, Copy)]
pub struct PurposesBuilder {
    flags: [bool; 6],
}

impl PurposesBuilder {
    pub fn encrypt(mut self) -> Self {
        self.flags[0] = true;
        self
    }

    pub fn decrypt(mut self) -> Self {
        self.flags[1] = true;
        self
    }

    pub fn sign(mut self) -> Self {
        self.flags[2] = true;
        self
    }

    pub fn verify(mut self) -> Self {
        self.flags[3] = true;
        self
    }

    pub fn wrap_key(mut self) -> Self {
        self.flags[4] = true;
        self
    }

    pub fn agree(mut self) -> Self {
        self.flags[5] = true;
        self
    }

    /// Grant the purpose matching `operation`. `ObtainKey` grants nothing.
    pub fn grant(self, operation: KeyOperation) -> Self {
        match operation {
            KeyOperation::Encrypt => self.encrypt(),
            KeyOperation::Decrypt => self.decrypt(),
            KeyOperation::Sign => self.sign(),
            KeyOperation::Verify => self.verify(),
            KeyOperation::Agree => self.agree(),
            KeyOperation::Wrap => self.wrap_key(),
            KeyOperation::ObtainKey => self,
        }
    }

    pub fn build(self) -> Result<KeyPurposes> {
        let [e, d, s, v, w, a] = self.flags;
        KeyPurposes::new(e, d, s, v, w, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GATED: [KeyOperation; 6] = [
        KeyOperation::Encrypt,
        KeyOperation::Decrypt,
        KeyOperation::Sign,
        KeyOperation::Verify,
        KeyOperation::Agree,
        KeyOperation::Wrap,
    ];

    #[test]
    fn test_all_false_is_rejected() {
        let result = KeyPurposes::new(false, false, false, false, false, false);
        assert!(matches!(result, Err(KeystoreError::InvalidKeyPurposes)));
        assert!(matches!(
            KeyPurposes::builder().build(),
            Err(KeystoreError::InvalidKeyPurposes)
        ));
    }

    #[test]
    fn test_each_purpose_grants_exactly_its_operation() {
        for granted in GATED {
            let purposes = KeyPurposes::builder().grant(granted).build().unwrap();
            for op in GATED {
                assert_eq!(
                    purposes.can_perform(op),
                    op == granted,
                    "purposes granting {granted} answered wrongly for {op}"
                );
            }
        }
    }

    #[test]
    fn test_obtain_key_always_permitted() {
        let purposes = KeyPurposes::builder().verify().build().unwrap();
        assert!(purposes.can_perform(KeyOperation::ObtainKey));
        assert!(purposes.ensure(KeyOperation::ObtainKey).is_ok());
    }

    #[test]
    fn test_ensure_reports_operation() {
        let purposes = KeyPurposes::encrypt_decrypt();
        match purposes.ensure(KeyOperation::Sign) {
            Err(KeystoreError::KeyCannotPerformOperation(op)) => {
                assert_eq!(op, KeyOperation::Sign)
            }
            other => panic!("expected KeyCannotPerformOperation, got {other:?}"),
        }
    }

    #[test]
    fn test_public_half_operations() {
        assert!(KeyOperation::Encrypt.uses_public_half());
        assert!(KeyOperation::Verify.uses_public_half());
        assert!(!KeyOperation::Decrypt.uses_public_half());
        assert!(!KeyOperation::Sign.uses_public_half());
        assert!(!KeyOperation::Agree.uses_public_half());
        assert!(!KeyOperation::Wrap.uses_public_half());
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(KeyPurposes::encrypt_decrypt()).unwrap();
        assert_eq!(json["canEncrypt"], true);
        assert_eq!(json["canWrapKey"], false);
        assert_eq!(json["canAgree"], false);
    }
}
