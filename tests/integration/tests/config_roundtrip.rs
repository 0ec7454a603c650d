//! Config save/load roundtrip integration tests.
//!
//! These tests verify that configuration can be serialized, written to disk,
//! and loaded back with identical field values.

use keystash_core::config::{BackendKind, Config, EngineKind};
use keystash_core::{BlockMode, EncryptionPadding};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keystash.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.namespace, config.namespace);
    assert_eq!(loaded.backend.kind, config.backend.kind);
    assert_eq!(loaded.master_key.block_mode, config.master_key.block_mode);
    assert_eq!(loaded.master_key.key_size, config.master_key.key_size);
    assert_eq!(loaded.engine, config.engine);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keystash.json5");

    let mut config = Config::default();
    config.namespace = "work".to_string();
    config.backend.kind = BackendKind::Memory;
    config.master_key.block_mode = BlockMode::Cbc;
    config.master_key.padding = EncryptionPadding::Pkcs7;
    config.engine = EngineKind::RawBlocks;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.namespace, "work");
    assert_eq!(loaded.backend.kind, BackendKind::Memory);
    assert_eq!(loaded.master_key.block_mode, BlockMode::Cbc);
    assert_eq!(loaded.master_key.padding, EncryptionPadding::Pkcs7);
    assert_eq!(loaded.engine, EngineKind::RawBlocks);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_config_json5_hand_written() {
    let config = Config::parse(
        r#"{
            // trailing commas and comments are fine
            namespace: 'ci',
            backend: { kind: 'file', dir: '/tmp/keystash-ci' },
            master_key: { block_mode: 'CTR', key_size: 128 },
            engine: 'raw-blocks',
        }"#,
    )
    .unwrap();
    assert_eq!(config.namespace, "ci");
    assert_eq!(config.master_key.block_mode, BlockMode::Ctr);
    assert_eq!(config.engine, EngineKind::RawBlocks);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/keystash.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}
