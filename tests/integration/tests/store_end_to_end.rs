//! End-to-end behaviour of the key manager and hybrid store on disk.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use keystash_core::config::{BackendConfig, BackendKind, Config, EngineKind};
use keystash_core::{BlockMode, Digest, EncryptionPadding};
use keystash_keystore::hybrid::master_key_alias;
use keystash_keystore::keystore::record_slot;
use keystash_keystore::{
    engine, FileKeyValueStore, HybridStore, KeyGenSpec, KeyManager, KeyOperation, KeyPurposes,
    KeystoreError, SecureKeyValueStore,
};
use tempfile::TempDir;

fn file_config(dir: &TempDir, engine: EngineKind, block_mode: BlockMode) -> Config {
    let mut config = Config {
        namespace: "e2e".to_string(),
        backend: BackendConfig {
            kind: BackendKind::File,
            dir: Some(dir.path().to_path_buf()),
        },
        engine,
        ..Config::default()
    };
    config.master_key.block_mode = block_mode;
    config.master_key.padding = if block_mode == BlockMode::Cbc {
        EncryptionPadding::Pkcs7
    } else {
        EncryptionPadding::None
    };
    config
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, EngineKind::Software, BlockMode::Gcm);

    let store = HybridStore::open(&config).await.unwrap();
    store.safeguard("token", "s3cr3t").await.unwrap().wait().await.unwrap();
    store.safeguard("retries", &3u8).await.unwrap().wait().await.unwrap();
    store.shutdown().await.unwrap();

    let reopened = HybridStore::open(&config).await.unwrap();
    assert_eq!(
        reopened.withdraw("token").await.unwrap().unwrap().expose_secret(),
        "s3cr3t"
    );
    assert_eq!(reopened.withdraw_as::<u8>("retries").await.unwrap(), Some(3));
}

#[tokio::test]
async fn test_plaintext_never_reaches_disk() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, EngineKind::Software, BlockMode::Gcm);

    let store = HybridStore::open(&config).await.unwrap();
    store
        .safeguard("card", "4111-1111-1111-1111")
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let on_disk = std::fs::read_to_string(tmp.path().join("e2e").join("card.json")).unwrap();
    assert!(!on_disk.contains("4111"));
    assert!(tmp
        .path()
        .join("e2e")
        .join(format!("{}.json", record_slot(&master_key_alias("e2e"))))
        .exists());
}

#[tokio::test]
async fn test_every_engine_and_mode_on_disk() {
    for engine in [EngineKind::Software, EngineKind::RawBlocks] {
        for mode in [BlockMode::Cbc, BlockMode::Ctr, BlockMode::Gcm] {
            let tmp = TempDir::new().unwrap();
            let config = file_config(&tmp, engine, mode);
            let store = HybridStore::open(&config).await.unwrap();
            store.safeguard("k", "").await.unwrap().wait().await.unwrap();
            store.safeguard("j", "x".repeat(33).as_str()).await.unwrap().wait().await.unwrap();
            assert_eq!(store.withdraw("k").await.unwrap().unwrap().expose_secret(), "");
            assert_eq!(
                store.withdraw("j").await.unwrap().unwrap().expose_secret().len(),
                33,
                "{engine:?} {mode}"
            );
        }
    }
}

#[tokio::test]
async fn test_truncated_cbc_value_is_invalid_padding() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, EngineKind::RawBlocks, BlockMode::Cbc);
    let store = HybridStore::open(&config).await.unwrap();
    store.safeguard("k", "sixteen bytes!!!").await.unwrap().wait().await.unwrap();

    let backend = FileKeyValueStore::new(tmp.path(), "e2e").unwrap();
    let envelope = backend.retrieve("k").await.unwrap().unwrap();
    let mut bytes = BASE64.decode(envelope).unwrap();
    bytes.pop();
    backend.store("k", &BASE64.encode(bytes)).await.unwrap();

    assert!(matches!(
        store.withdraw("k").await,
        Err(KeystoreError::InvalidPadding)
    ));
}

#[tokio::test]
async fn test_key_manager_on_file_backend() {
    let tmp = TempDir::new().unwrap();
    let store: Arc<dyn SecureKeyValueStore> =
        Arc::new(FileKeyValueStore::new(tmp.path(), "keys").unwrap());
    let manager = KeyManager::software(store.clone(), engine::for_kind(EngineKind::Software));

    let spec = KeyGenSpec::ec(Digest::Sha512).unwrap();
    manager
        .generate_key("signer", &spec, KeyPurposes::sign_verify())
        .await
        .unwrap();

    // A second manager over the same directory sees the same key.
    let other = KeyManager::software(store, engine::for_kind(EngineKind::Software));
    let signature = manager.sign("signer", b"release-1.0").await.unwrap();
    assert!(other.verify("signer", b"release-1.0", &signature).await.unwrap());

    assert!(matches!(
        other.get_key("signer", KeyOperation::Encrypt).await,
        Err(KeystoreError::KeyCannotPerformOperation(KeyOperation::Encrypt))
    ));

    other.delete_key("signer").await.unwrap();
    assert!(!manager.alias_exists("signer").await.unwrap());
}

#[tokio::test]
async fn test_wrong_block_mode_is_rejected_at_config_time() {
    let tmp = TempDir::new().unwrap();
    let mut config = file_config(&tmp, EngineKind::Software, BlockMode::Gcm);
    config.master_key.padding = EncryptionPadding::Pkcs7;
    assert!(matches!(
        HybridStore::open(&config).await,
        Err(KeystoreError::Config(_))
    ));
}
