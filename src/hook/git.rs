//! Reading repository state with the `git` CLI.

use crate::models::CommitInfo;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Branch name recorded when git cannot report one (detached HEAD).
pub const UNKNOWN_BRANCH: &str = "unknown";

/// Find the top-level directory of the git repository containing `path`.
pub fn find_git_root(path: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

/// The hooks directory of the repository at `path`, if `path` holds a
/// `.git` directory. The hooks directory itself may not exist yet.
pub fn hooks_dir(path: &Path) -> Option<PathBuf> {
    let git_dir = path.join(".git");
    git_dir.is_dir().then(|| git_dir.join("hooks"))
}

/// Read hash, branch and full message of `HEAD`.
pub fn read_head_commit(repo: &Path) -> Result<CommitInfo> {
    let hash = git(repo, &["rev-parse", "HEAD"])?;
    let message = git(repo, &["log", "-1", "--pretty=format:%B"])?;
    let branch = git(repo, &["branch", "--show-current"])
        .ok()
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| UNKNOWN_BRANCH.to_string());

    Ok(CommitInfo {
        hash,
        branch,
        message,
    })
}

/// Working tree state of a project's repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoInfo {
    pub branch: String,
    /// Abbreviated `HEAD` hash
    pub commit: String,
    /// Whether `git status --porcelain` reports anything
    pub has_changes: bool,
}

/// Branch, `HEAD` and dirty state of the repository rooted at `path`.
///
/// `None` when `path` is not a repository root or has no commits yet.
pub fn repo_info(path: &Path) -> Option<RepoInfo> {
    if !path.join(".git").exists() {
        return None;
    }

    let head = git(path, &["rev-parse", "HEAD"]).ok()?;
    let status = git(path, &["status", "--porcelain"]).ok()?;
    let branch = git(path, &["branch", "--show-current"])
        .ok()
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| UNKNOWN_BRANCH.to_string());

    Some(RepoInfo {
        branch,
        commit: head.get(..8).unwrap_or(&head).to_string(),
        has_changes: !status.is_empty(),
    })
}

fn git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| Error::Git(format!("Failed to run git: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
