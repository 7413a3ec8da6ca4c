#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join("tasklink.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_record(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn address(&self) -> Option<String> {
        fs::read_to_string(self.dir.path().join("address"))
            .ok()
            .map(|raw| raw.trim().to_string())
    }

    /// `tasklink` pointed at this store.
    pub fn cmd(&self) -> Command {
        let mut cmd = tasklink_cmd();
        cmd.arg("--store").arg(self.path());
        cmd
    }

    /// Run with `--json` and return the envelope's `data`.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run tasklink");
        assert!(
            output.status.success(),
            "tasklink {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("json envelope");
        assert_eq!(envelope["status"], "success");
        envelope["data"].clone()
    }

    /// Add a task and return its full id.
    pub fn add(&self, text: &str) -> String {
        let data = self.json(&["add", text]);
        data["task"]["id"].as_str().expect("task id").to_string()
    }
}

pub fn tasklink_cmd() -> Command {
    let mut cmd = Command::cargo_bin("tasklink").expect("binary");
    cmd.env_remove("TASKLINK_STORE")
        .env_remove("TASKLINK_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}
