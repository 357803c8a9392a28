//! Installing the post-commit hook into tracked repositories.

use super::git;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// First comment line of every hook script we write.
pub const HOOK_MARKER: &str = "# Project Tracker Git Integration";

/// Render the post-commit script that runs `exe hook post-commit`.
///
/// `exec` hands the exit status of `pt` straight back to git.
pub fn post_commit_script(exe: &Path) -> String {
    format!(
        "#!/bin/sh\n{}\nexec \"{}\" hook post-commit\n",
        HOOK_MARKER,
        exe.display()
    )
}

/// Write `.git/hooks/post-commit` in `repo`, marked executable.
///
/// Fails with `InvalidInput` when `repo` is not a git working tree. An
/// existing hook that was not written by us is replaced, with a warning.
pub fn install_post_commit_hook(repo: &Path, exe: &Path) -> Result<PathBuf> {
    let hooks_dir = git::hooks_dir(repo).ok_or_else(|| {
        Error::InvalidInput(format!("{} is not a git repository", repo.display()))
    })?;
    fs::create_dir_all(&hooks_dir)?;

    let hook_path = hooks_dir.join("post-commit");
    if let Ok(existing) = fs::read_to_string(&hook_path) {
        if !existing.contains(HOOK_MARKER) {
            tracing::warn!(path = %hook_path.display(), "replacing existing post-commit hook");
        }
    }

    fs::write(&hook_path, post_commit_script(exe))?;
    set_executable(&hook_path)?;

    tracing::debug!(path = %hook_path.display(), "installed post-commit hook");
    Ok(hook_path)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
