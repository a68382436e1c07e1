use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_strata"))
}

fn write_config(dir: &tempfile::TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("conv.json");
    std::fs::write(&path, json).unwrap();
    path
}

// ── help ────────────────────────────────────────────────────────────

#[test]
fn help_flag() {
    let out = bin().arg("--help").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("inspect"));
    assert!(stdout.contains("flops"));
}

// ── flops ───────────────────────────────────────────────────────────

#[test]
fn flops_without_activation() {
    let out = bin()
        .args(["flops", "--weight", "6,3,5,5", "--input", "1,3,32,32"])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "410400");
}

#[test]
fn flops_with_activation() {
    let out = bin()
        .args(["flops", "--weight", "6,3,5,5", "--input", "1,3,32,32", "--activation"])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "415800");
}

#[test]
fn flops_rejects_short_shape() {
    let out = bin()
        .args(["flops", "--weight", "6,3,5", "--input", "1,3,32,32"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("--weight must have 4 dimensions"));
}

#[test]
fn flops_overflowing_pad_fails_cleanly() {
    let pad = format!("{},1", usize::MAX / 2 + 1);
    let out = bin()
        .args(["flops", "--weight", "6,3,5,5", "--input", "1,3,32,32", "--pad", &pad])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Failed to estimate FLOPs"), "{stderr}");
    assert!(!stderr.contains("panicked"), "{stderr}");
}

// ── inspect ─────────────────────────────────────────────────────────

#[test]
fn inspect_reports_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, r#"{"size": [6, 3], "compute_flops": true}"#);
    let out = bin()
        .args(["inspect", "--input", "1,3,32,32", "--seed", "7", "--name", "c1", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Layer   : c1 (Conv)"));
    assert!(stdout.contains("Weight  : (6, 3, 5, 5)"));
    assert!(stdout.contains("Output  : (1, 6, 30, 30)"));
    assert!(stdout.contains("FLOPs   : 415800"));
    assert!(stdout.contains("Recorded: 415800"));
}

#[test]
fn inspect_requires_size() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, r#"{"kernel_shape": [3, 3]}"#);
    let out = bin()
        .args(["inspect", "--input", "1,3,32,32", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("does not set a size"));
}

#[test]
fn inspect_channel_mismatch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, r#"{"size": [6, 3]}"#);
    let out = bin()
        .args(["inspect", "--input", "1,4,32,32", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Forward pass failed"));
}
