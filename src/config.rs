//! Runtime configuration resolved from the environment.
//!
//! The tracker keeps one SQLite database per user. Its directory is taken
//! from `PT_DATA_DIR` when set, otherwise `<data_dir>/project-tracker`
//! (`~/.local/share/project-tracker` on Linux).

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PT_DATA_DIR";

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "PT_LOG";

/// Filter used when `PT_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "tracker.db";

/// Resolve the data directory.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let base = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(base.join("project-tracker"))
}

/// Path of the database file inside `data_dir`.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path() {
        let path = database_path(Path::new("/tmp/pt"));
        assert_eq!(path, PathBuf::from("/tmp/pt/tracker.db"));
    }
}
