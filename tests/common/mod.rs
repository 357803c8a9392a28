//! Common test utilities for project tracker integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/project-tracker/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates two temporary directories:
/// - `repo_dir`: Acts as the git repository root
/// - `data_dir`: Holds the tracker database (via `PT_DATA_DIR` env var)
///
/// The `pt()` method returns a `Command` that sets `PT_DATA_DIR`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub repo_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            repo_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a test environment whose repo dir is an initialized git repository.
    pub fn with_git() -> Self {
        let env = Self::new();
        env.git(&["init", "--quiet", "-b", "main"]);
        env.git(&["config", "user.email", "test@test.com"]);
        env.git(&["config", "user.name", "Test User"]);
        env.git(&["config", "commit.gpgsign", "false"]);
        env
    }

    /// Get a Command for the pt binary with isolated data directory.
    pub fn pt(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pt"));
        cmd.current_dir(self.repo_dir.path());
        cmd.env("PT_DATA_DIR", self.data_dir.path());
        cmd.env_remove("PT_REPO");
        cmd.env_remove("PT_LOG");
        cmd
    }

    /// Get the path to the repo directory.
    pub fn path(&self) -> &Path {
        self.repo_dir.path()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Run git in the repo directory, panicking on failure.
    ///
    /// `PT_DATA_DIR` is set so an installed hook writes to this environment.
    pub fn git(&self, args: &[&str]) -> String {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(self.path())
            .env("PT_DATA_DIR", self.data_path())
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Commit a change with `message`.
    pub fn commit(&self, message: &str) {
        let file = self.path().join("CHANGES");
        let mut content = std::fs::read_to_string(&file).unwrap_or_default();
        content.push_str(message);
        content.push('\n');
        std::fs::write(&file, content).unwrap();
        self.git(&["add", "CHANGES"]);
        self.git(&["commit", "--quiet", "--no-verify", "-m", message]);
    }

    /// Register the repo directory as project `name` and return its ID.
    pub fn add_repo_project(&self, name: &str) -> i64 {
        let output = self
            .pt()
            .args(["project", "add", name, "--path"])
            .arg(self.path())
            .output()
            .unwrap();
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["project"]["id"].as_i64().unwrap()
    }

    /// Add a task to `project` and return its ID.
    pub fn add_task(&self, project: &str, title: &str) -> i64 {
        let output = self
            .pt()
            .args(["task", "add", project, title])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["task"]["id"].as_i64().unwrap()
    }

    /// Read a task's status through `pt task show`.
    pub fn task_status(&self, id: i64) -> String {
        let output = self
            .pt()
            .args(["task", "show", &id.to_string()])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["task"]["status"].as_str().unwrap().to_string()
    }

    /// Number of activity records for `project`.
    pub fn activity_count(&self, project: &str) -> u64 {
        let output = self
            .pt()
            .args(["activity", project, "-n", "1000"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["count"].as_u64().unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
