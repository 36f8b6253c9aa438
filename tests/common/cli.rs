#![allow(dead_code)]

use serde_json::Value;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// A scratch directory with its own database for running the binary.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("stored.db")
    }

    /// `stored` with the workspace database, actor `tester` and a clean env.
    pub fn cmd(&self) -> Command {
        self.cmd_as("tester")
    }

    pub fn cmd_as(&self, actor: &str) -> Command {
        let bin = assert_cmd::cargo::cargo_bin!("stored");
        let mut cmd = Command::new(bin.as_os_str());
        cmd.current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .env("STORED_LOG_LEVEL", "error")
            .arg("--db")
            .arg(self.db_path())
            .arg("--actor")
            .arg(actor);
        cmd
    }

    /// Run with `--json`, assert success and parse stdout.
    pub fn json<I, S>(&self, args: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.json_as("tester", args)
    }

    pub fn json_as<I, S>(&self, actor: &str, args: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let output = self.cmd_as(actor).arg("--json").args(args).output().expect("run");
        assert!(
            output.status.success(),
            "command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
    }
}
