//! CLI Integration Tests
//!
//! These tests run the `seedgate` binary end to end against a temporary
//! data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Seed "pk_test1700000000000" has its first difficulty-2 solution at nonce 15
const FIXTURE_SEED: &str = "pk_test1700000000000";
const FIXTURE_HASH: &str = "00e0dbe819f35d0e9a59acbf838b0e4ff88fe42b97b1508fd378b78bf86d4088";

/// Create a CLI command with a temporary data directory
fn cli_cmd(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("seedgate").expect("Failed to find seedgate binary");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is JSON")
}

// ============================================================================
// Keygen / Mnemonic
// ============================================================================

#[test]
fn test_keygen_prints_prefixed_identifiers() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .arg("keygen")
        .assert()
        .success()
        .stdout(predicate::str::contains("Public id:      pk_"))
        .stdout(predicate::str::contains("Private secret: sk_"));
}

#[test]
fn test_keygen_json() {
    let data_dir = TempDir::new().unwrap();
    let json = stdout_json(cli_cmd(&data_dir).args(["keygen", "--json"]));

    let public_id = json["publicId"].as_str().unwrap();
    assert!(public_id.starts_with("pk_"));
    assert_eq!(public_id.len(), 67);
    assert!(json["privateSecret"].as_str().unwrap().starts_with("sk_"));
}

#[test]
fn test_keygen_never_logs_secret() {
    let data_dir = TempDir::new().unwrap();
    let json = stdout_json(cli_cmd(&data_dir).args(["-vvv", "keygen", "--json"]));
    let secret = json["privateSecret"].as_str().unwrap().to_string();

    let logs_dir = data_dir.path().join("logs");
    for entry in std::fs::read_dir(&logs_dir).unwrap() {
        let content = std::fs::read_to_string(entry.unwrap().path()).unwrap();
        assert!(!content.contains(&secret));
        assert!(!content.contains(&secret[3..]));
    }
}

#[test]
fn test_mnemonic_has_twelve_words() {
    let data_dir = TempDir::new().unwrap();
    let output = cli_cmd(&data_dir)
        .arg("mnemonic")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let phrase = String::from_utf8(output).unwrap();
    assert_eq!(phrase.split_whitespace().count(), 12);
}

#[test]
fn test_mnemonic_rejects_short_wordlist() {
    let data_dir = TempDir::new().unwrap();
    let list = data_dir.path().join("tiny.txt");
    std::fs::write(&list, "alpha\nbravo\ncharlie\n").unwrap();

    cli_cmd(&data_dir)
        .arg("mnemonic")
        .arg("--wordlist")
        .arg(&list)
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 256"));
}

// ============================================================================
// Proof-of-work
// ============================================================================

#[test]
fn test_pow_solve_fixture() {
    let data_dir = TempDir::new().unwrap();
    let json = stdout_json(cli_cmd(&data_dir).args([
        "pow",
        "solve",
        "--public-id",
        "pk_test",
        "--timestamp",
        "1700000000000",
        "--difficulty",
        "2",
        "--json",
    ]));

    assert_eq!(json["nonce"], 15);
    assert_eq!(json["hash"], FIXTURE_HASH);
    assert_eq!(json["timestamp"], 1_700_000_000_000i64);
    assert_eq!(json["difficulty"], 2);
}

#[test]
fn test_pow_solve_exhausted() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args([
            "pow",
            "solve",
            "--public-id",
            "pk_test",
            "--difficulty",
            "64",
            "--max-iterations",
            "2000",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found within 2000 iterations"));
}

#[test]
fn test_pow_verify() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["pow", "verify", "--seed", FIXTURE_SEED, "--nonce", "15"])
        .args(["--hash", FIXTURE_HASH, "--difficulty", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid"));

    cli_cmd(&data_dir)
        .args(["pow", "verify", "--seed", FIXTURE_SEED, "--nonce", "16"])
        .args(["--hash", FIXTURE_HASH, "--difficulty", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match"));

    cli_cmd(&data_dir)
        .args(["pow", "verify", "--seed", FIXTURE_SEED, "--nonce", "15"])
        .args(["--hash", FIXTURE_HASH, "--difficulty", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("leading zeros"));
}

// ============================================================================
// Provision
// ============================================================================

#[test]
fn test_provision_offline() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["provision", "--offline", "--difficulty", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Seed phrase:"))
        .stdout(predicate::str::contains("Registered"))
        .stdout(predicate::str::contains("Ledger block: blk_00000001"));
}

#[test]
fn test_provision_offline_json() {
    let data_dir = TempDir::new().unwrap();
    let json = stdout_json(cli_cmd(&data_dir).args([
        "provision",
        "--offline",
        "--difficulty",
        "2",
        "--visibility",
        "private",
        "--tone",
        "formal",
        "--json",
    ]));

    assert_eq!(json["seedPhrase"].as_str().unwrap().split(' ').count(), 12);
    assert_eq!(json["proofOfWork"]["difficulty"], 2);
    assert!(json["proofOfWork"]["hash"].as_str().unwrap().starts_with("00"));
    assert_eq!(json["account"]["accountStatus"], "active");
    assert_eq!(json["localOnly"], false);
}

#[test]
fn test_provision_rejects_bad_profile() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["provision", "--offline", "--visibility", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown profile visibility"));

    cli_cmd(&data_dir)
        .args(["provision", "--offline", "--agent-verbosity", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside 1..=5"));
}

#[test]
fn test_provision_online_requires_endpoint() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["provision", "--difficulty", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no registration endpoint"));
}

#[test]
fn test_provision_unreachable_endpoint_is_local_only() {
    let data_dir = TempDir::new().unwrap();

    // port 9 (discard) on localhost refuses connections
    cli_cmd(&data_dir)
        .args(["provision", "--difficulty", "1", "--retries", "0"])
        .args(["--url", "http://127.0.0.1:9/register"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("usable only locally"))
        .stderr(predicate::str::contains("Registration failed"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_init_and_show() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["config", "init", "--registration-url", "https://example.com/register"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seedgate.json"));

    assert!(data_dir.path().join("seedgate.json").exists());

    cli_cmd(&data_dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/register"))
        .stdout(predicate::str::contains("\"difficulty\": 4"));

    cli_cmd(&data_dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_invalid_config_file_fails() {
    let data_dir = TempDir::new().unwrap();
    let config = data_dir.path().join("custom.json");
    std::fs::write(&config, r#"{ "pow": { "chunk_size": 0 } }"#).unwrap();

    cli_cmd(&data_dir)
        .arg("--config")
        .arg(&config)
        .arg("keygen")
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk_size"));
}
