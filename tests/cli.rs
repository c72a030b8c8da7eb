//! CLI Integration Tests
//!
//! Drives the `sizeceph` binary through encode, shard loss, and decode.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn sizeceph(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sizeceph"))
        .args(args)
        .env_remove("SIZECEPH_PROFILE")
        .env_remove("SIZECEPH_LIBRARY")
        .output()
        .expect("Failed to run sizeceph")
}

fn path(p: &Path) -> &str {
    p.to_str().expect("non-UTF-8 temp path")
}

#[test]
fn test_encode_lose_three_decode() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.bin");
    let shards = dir.path().join("shards");
    let output = dir.path().join("restored.bin");

    let data: Vec<u8> = (0..1001u32).map(|i| (i * 17) as u8).collect();
    fs::write(&input, &data).unwrap();

    let out = sizeceph(&["encode", "--input", path(&input), "--out-dir", path(&shards)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(shards.join("meta.json").exists());
    for i in 0..9 {
        assert!(shards.join(format!("shard.{}", i)).exists());
    }

    for lost in [0, 4, 7] {
        fs::remove_file(shards.join(format!("shard.{}", lost))).unwrap();
    }

    let out = sizeceph(&["decode", "--shard-dir", path(&shards), "--output", path(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::read(&output).unwrap(), data);
}

#[test]
fn test_decode_with_four_losses_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.bin");
    let shards = dir.path().join("shards");

    fs::write(&input, vec![5u8; 64]).unwrap();
    let out = sizeceph(&["encode", "--input", path(&input), "--out-dir", path(&shards)]);
    assert!(out.status.success());

    for lost in [1, 2, 5, 8] {
        fs::remove_file(shards.join(format!("shard.{}", lost))).unwrap();
    }

    let output = dir.path().join("restored.bin");
    let out = sizeceph(&["decode", "--shard-dir", path(&shards), "--output", path(&output)]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Insufficient shards"));
}

#[test]
fn test_wrong_profile_rejected() {
    let out = sizeceph(&["--profile", "k=6,m=3", "info"]);
    assert!(!out.status.success());
}

#[test]
fn test_info_reports_layout() {
    let out = sizeceph(&["info"]);
    assert!(out.status.success());
    let info: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(info["k"], 4);
    assert_eq!(info["m"], 5);
    assert_eq!(info["min_available"], 6);
}
