//! Key management commands.
//!
//! Provides `keystash keys generate|exists|delete|encrypt|decrypt` over the
//! software keystore of the configured namespace.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Args, ValueEnum};
use keystash_core::{Algorithm, BlockMode, Config, Digest, EncryptionPadding};
use keystash_keystore::keygen::AsymmetricKeyGenSpec;
use keystash_keystore::{backend, engine, KeyGenSpec, KeyManager, KeyOperation, KeyPurposes};

/// Keys command arguments.
#[derive(Args)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,
}

#[derive(clap::Subcommand)]
pub enum KeysCommand {
    /// Generate a key under a new alias
    Generate {
        /// Key alias
        alias: String,

        /// Key algorithm (aes, rsa, ec)
        #[arg(long, default_value = "aes")]
        algorithm: Algorithm,

        /// Key size in bits (AES: 128/192/256, RSA: 1024-4096)
        #[arg(long)]
        key_size: Option<u32>,

        /// Block mode for AES keys (cbc, ctr, gcm)
        #[arg(long)]
        block_mode: Option<BlockMode>,

        /// Encryption padding (none, pkcs7, rsa_pkcs1, rsa_oaep)
        #[arg(long)]
        padding: Option<EncryptionPadding>,

        /// Digest for RSA / EC keys
        #[arg(long)]
        digest: Option<Digest>,

        /// Comma-separated operations the key may perform
        #[arg(long, value_enum, value_delimiter = ',', required = true)]
        purposes: Vec<PurposeArg>,
    },

    /// Check whether an alias holds a key
    Exists {
        /// Key alias
        alias: String,
    },

    /// Delete a key (succeeds if absent)
    Delete {
        /// Key alias
        alias: String,
    },

    /// Encrypt text with a key and print the base64 result
    Encrypt {
        /// Key alias
        alias: String,

        /// Plaintext
        text: String,
    },

    /// Decrypt base64 output of `keys encrypt`
    Decrypt {
        /// Key alias
        alias: String,

        /// Base64 ciphertext or envelope
        ciphertext: String,
    },
}

/// A purpose flag as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PurposeArg {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    WrapKey,
    Agree,
}

impl From<PurposeArg> for KeyOperation {
    fn from(arg: PurposeArg) -> Self {
        match arg {
            PurposeArg::Encrypt => Self::Encrypt,
            PurposeArg::Decrypt => Self::Decrypt,
            PurposeArg::Sign => Self::Sign,
            PurposeArg::Verify => Self::Verify,
            PurposeArg::WrapKey => Self::Wrap,
            PurposeArg::Agree => Self::Agree,
        }
    }
}

/// Build a validated spec, filling unset parameters with per-algorithm defaults.
pub fn build_spec(
    algorithm: Algorithm,
    key_size: Option<u32>,
    block_mode: Option<BlockMode>,
    padding: Option<EncryptionPadding>,
    digest: Option<Digest>,
) -> anyhow::Result<KeyGenSpec> {
    let spec = match algorithm {
        Algorithm::Aes => {
            let block_mode = block_mode.unwrap_or(BlockMode::Gcm);
            let padding = padding.unwrap_or(if block_mode == BlockMode::Cbc {
                EncryptionPadding::Pkcs7
            } else {
                EncryptionPadding::None
            });
            KeyGenSpec::symmetric(key_size.unwrap_or(256), block_mode, padding)?
        }
        Algorithm::Rsa => KeyGenSpec::rsa(
            key_size.unwrap_or(2048),
            padding.unwrap_or(EncryptionPadding::RsaOaep),
            Some(digest.unwrap_or(Digest::Sha256)),
        )?,
        Algorithm::Ec => {
            let spec = KeyGenSpec::Asymmetric(AsymmetricKeyGenSpec {
                algorithm: Algorithm::Ec,
                key_size: key_size.unwrap_or(256),
                encryption_padding: EncryptionPadding::None,
                digest: Some(digest.unwrap_or(Digest::Sha256)),
            });
            spec.validate()?;
            spec
        }
    };
    Ok(spec)
}

/// Build a purposes set from command-line flags.
pub fn build_purposes(purposes: &[PurposeArg]) -> anyhow::Result<KeyPurposes> {
    let builder = purposes
        .iter()
        .fold(KeyPurposes::builder(), |builder, p| builder.grant((*p).into()));
    Ok(builder.build()?)
}

fn open_manager(config: &Config) -> anyhow::Result<KeyManager> {
    let store = backend::open(config)?;
    Ok(KeyManager::software(store, engine::for_kind(config.engine)))
}

/// Run the keys command.
pub async fn run(args: &KeysArgs, config: &Config) -> anyhow::Result<()> {
    let manager = open_manager(config)?;

    match &args.command {
        KeysCommand::Generate {
            alias,
            algorithm,
            key_size,
            block_mode,
            padding,
            digest,
            purposes,
        } => {
            let spec = build_spec(*algorithm, *key_size, *block_mode, *padding, *digest)?;
            let purposes = build_purposes(purposes)?;
            let public = manager.generate_key(alias, &spec, purposes).await?;

            println!("Key '{}' generated ({}).", alias, algorithm);
            if let Some(der) = public {
                println!("Public key (SPKI DER, base64):");
                println!("{}", BASE64.encode(der));
            }
        }

        KeysCommand::Exists { alias } => {
            if manager.alias_exists(alias).await? {
                println!("Key '{}' exists.", alias);
            } else {
                anyhow::bail!("Key '{}' does not exist", alias);
            }
        }

        KeysCommand::Delete { alias } => {
            manager.delete_key(alias).await?;
            println!("Key '{}' deleted.", alias);
        }

        KeysCommand::Encrypt { alias, text } => {
            println!("{}", manager.encrypt(alias, text.as_bytes()).await?);
        }

        KeysCommand::Decrypt { alias, ciphertext } => {
            let plaintext = manager.decrypt(alias, ciphertext).await?;
            let text = std::str::from_utf8(plaintext.expose_secret())
                .map_err(|e| anyhow::anyhow!("Plaintext is not UTF-8: {}", e))?;
            println!("{}", text);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_spec_defaults() {
        let spec = build_spec(Algorithm::Aes, None, Some(BlockMode::Cbc), None, None).unwrap();
        let params = spec.params();
        assert_eq!(params.key_size, 256);
        assert_eq!(params.padding, EncryptionPadding::Pkcs7);

        let spec = build_spec(Algorithm::Rsa, None, None, None, None).unwrap();
        assert_eq!(spec.params().padding, EncryptionPadding::RsaOaep);
        assert_eq!(spec.params().digest, Some(Digest::Sha256));
    }

    #[test]
    fn test_build_spec_rejects_rsa_without_padding() {
        assert!(build_spec(Algorithm::Rsa, None, None, Some(EncryptionPadding::None), None).is_err());
    }

    #[test]
    fn test_build_spec_ec_key_size() {
        let spec = build_spec(Algorithm::Ec, None, None, None, None).unwrap();
        assert_eq!(spec.params().key_size, 256);
        assert!(build_spec(Algorithm::Ec, Some(256), None, None, None).is_ok());
        assert!(build_spec(Algorithm::Ec, Some(384), None, None, None).is_err());
    }

    #[test]
    fn test_build_purposes() {
        let purposes = build_purposes(&[PurposeArg::Sign, PurposeArg::WrapKey]).unwrap();
        assert!(purposes.can_sign());
        assert!(purposes.can_wrap_key());
        assert!(!purposes.can_encrypt());
        assert!(build_purposes(&[]).is_err());
    }
}
