use assert_cmd::{cargo::cargo_bin_cmd, Command};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Get a Command for kinship, isolated from the caller's environment
pub fn kinship() -> Command {
    let mut cmd = cargo_bin_cmd!("kinship");
    cmd.env_remove("KINSHIP_NOTES")
        .env_remove("KINSHIP_CONFIG")
        .env_remove("KINSHIP_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// One note in snapshot (camelCase) form
pub fn note(id: &str, text: &str, tags: &[&str], created_at: &str) -> Value {
    json!({
        "id": id,
        "textContent": text,
        "tags": tags,
        "createdAt": created_at,
    })
}

/// Write `notes` as a JSON array snapshot under `dir`
pub fn write_snapshot(dir: &Path, notes: &[Value]) -> PathBuf {
    let path = dir.join("notes.json");
    fs::write(&path, serde_json::to_string(notes).unwrap()).unwrap();
    path
}

/// "hello world" / "hello world!" / "goodbye"
pub fn hello_snapshot(dir: &Path) -> PathBuf {
    write_snapshot(
        dir,
        &[
            note("A", "hello world", &[], "2024-01-01T00:00:00Z"),
            note("B", "hello world!", &[], "2024-01-02T00:00:00Z"),
            note("C", "goodbye", &[], "2024-01-03T00:00:00Z"),
        ],
    )
}

/// Parse a command's stdout as JSON
pub fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}
