//! Project Tracker - a personal project and task tracker driven by git commits.
//!
//! This library provides the core functionality for the `pt` CLI tool:
//! project and task storage, the task status state machine, and the
//! post-commit pipeline that turns `pt:<id>` references in commit messages
//! into status changes and activity records.

pub mod cli;
pub mod commands;
pub mod config;
pub mod hook;
pub mod models;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::models::{Priority, Project, Task};
    use crate::storage::Storage;

    /// Test environment with an isolated data directory and a fake repository.
    pub struct TestEnv {
        /// Simulated repository directory
        pub repo_dir: TempDir,
        /// Isolated data storage directory
        pub data_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                repo_dir: TempDir::new().unwrap(),
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Get the path to the simulated repository.
        pub fn path(&self) -> &Path {
            self.repo_dir.path()
        }

        /// Get the path to the isolated data directory.
        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Open (creating if needed) storage for this environment.
        pub fn open_storage(&self) -> Storage {
            Storage::open_with_data_dir(self.data_path()).unwrap()
        }

        /// Register a project bound to the simulated repository.
        pub fn add_repo_project(&self, storage: &Storage, name: &str) -> Project {
            storage
                .add_project(name, Some(self.path()), None)
                .unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Add a medium priority task with no description or due date.
    pub fn add_task(storage: &Storage, project: &Project, title: &str) -> Task {
        storage
            .add_task(project.id, title, None, Priority::Medium, None)
            .unwrap()
    }
}

/// Library-level error type for Project Tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The database could not be opened or its schema could not be set up.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] rusqlite::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: no tracker database found")]
    NotInitialized,

    #[error("Invalid status '{0}'. Use: pending, in_progress, completed, blocked")]
    InvalidStatus(String),

    #[error("Task {0} not found")]
    TaskNotFound(i64),

    #[error("Ambiguous status keywords for task {task_id}")]
    ParseAmbiguous { task_id: i64 },

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Project Tracker operations.
pub type Result<T> = std::result::Result<T, Error>;
