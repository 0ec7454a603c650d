//! CLI binary integration tests.
//!
//! These tests exercise the compiled `keystash` binary to verify command
//! routing and that state written by one invocation is readable by the next.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Locate the compiled `keystash` binary in the workspace target directory.
///
/// Cargo sets `CARGO_MANIFEST_DIR` to the manifest directory of the package
/// being tested. We navigate up to the workspace root and look inside
/// `target/debug/`. Returns `None` when the binary has not been built.
fn keystash_bin() -> Option<PathBuf> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    // tests/integration -> workspace root
    let workspace_root = manifest_dir.parent()?.parent()?;
    let bin = workspace_root.join("target").join("debug").join("keystash");
    if bin.exists() {
        Some(bin)
    } else {
        eprintln!(
            "keystash binary not found at {}; run `cargo build -p keystash-cli` first",
            bin.display()
        );
        None
    }
}

/// Write a file-backed config rooted in `dir` and return its path.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("keystash.json5");
    let store = dir.join("store");
    std::fs::write(
        &path,
        format!(
            "{{ namespace: 'cli-test', backend: {{ kind: 'file', dir: {:?} }} }}",
            store.to_str().unwrap()
        ),
    )
    .unwrap();
    path
}

fn run(bin: &Path, config: &Path, args: &[&str]) -> Output {
    Command::new(bin)
        .arg("-c")
        .arg(config)
        .args(args)
        .env_remove("KEYSTASH_NAMESPACE")
        .env_remove("KEYSTASH_DIR")
        .output()
        .expect("failed to run keystash")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn test_cli_version() {
    let Some(bin) = keystash_bin() else { return };
    let output = Command::new(bin).arg("version").output().unwrap();
    assert!(output.status.success(), "version command should succeed");
    assert!(stdout(&output).contains("keystash"));
}

#[test]
fn test_cli_help_lists_commands() {
    let Some(bin) = keystash_bin() else { return };
    let output = Command::new(bin).arg("--help").output().unwrap();
    assert!(output.status.success(), "--help should succeed");
    let help = stdout(&output);
    assert!(help.contains("keys"), "help should mention 'keys': {help}");
    assert!(help.contains("values"), "help should mention 'values': {help}");
}

#[test]
fn test_cli_unknown_command_fails() {
    let Some(bin) = keystash_bin() else { return };
    let output = Command::new(bin).arg("nonexistent").output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_cli_values_persist_between_runs() {
    let Some(bin) = keystash_bin() else { return };
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    assert!(run(&bin, &config, &["values", "set", "pin", "1234"]).status.success());
    let got = run(&bin, &config, &["values", "get", "pin"]);
    assert!(got.status.success());
    assert_eq!(stdout(&got), "1234");

    assert!(run(&bin, &config, &["values", "refresh", "pin", "4321"]).status.success());
    assert_eq!(stdout(&run(&bin, &config, &["values", "get", "pin"])), "4321");

    assert!(run(&bin, &config, &["values", "remove", "pin"]).status.success());
    assert!(!run(&bin, &config, &["values", "remove", "pin"]).status.success());
}

#[test]
fn test_cli_keys_lifecycle() {
    let Some(bin) = keystash_bin() else { return };
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    let generate = ["keys", "generate", "data", "--purposes", "encrypt,decrypt"];
    assert!(run(&bin, &config, &generate).status.success());
    assert!(!run(&bin, &config, &generate).status.success(), "alias reuse must fail");
    assert!(run(&bin, &config, &["keys", "exists", "data"]).status.success());

    let envelope = stdout(&run(&bin, &config, &["keys", "encrypt", "data", "hello"]));
    let decrypted = run(&bin, &config, &["keys", "decrypt", "data", &envelope]);
    assert!(decrypted.status.success());
    assert_eq!(stdout(&decrypted), "hello");

    assert!(run(&bin, &config, &["keys", "delete", "data"]).status.success());
    assert!(run(&bin, &config, &["keys", "delete", "data"]).status.success());
    assert!(!run(&bin, &config, &["keys", "exists", "data"]).status.success());
}

#[test]
fn test_cli_master_key_cannot_be_deleted() {
    let Some(bin) = keystash_bin() else { return };
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    assert!(run(&bin, &config, &["values", "set", "pin", "1234"]).status.success());
    let delete = run(&bin, &config, &["keys", "delete", "__master_key__.cli-test"]);
    assert!(!delete.status.success(), "master key deletion must be refused");
    assert_eq!(stdout(&run(&bin, &config, &["values", "get", "pin"])), "1234");
}
