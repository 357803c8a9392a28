//! Storage layer for Project Tracker data.
//!
//! All data lives in a single SQLite database (`tracker.db`) in the data
//! directory:
//!
//! - `projects` - named projects, optionally bound to a repository path
//! - `tasks` - work items owned by a project
//! - `git_activity` - append-only commit log written by the post-commit hook
//!
//! A `Storage` wraps one connection. It is opened per invocation and closed
//! when dropped; nothing holds a global connection.

pub mod activity;

use crate::config;
use crate::models::{Priority, Project, ProjectStatus, Task, TaskStatus};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const PROJECT_COLUMNS: &str = "id, name, path, description, status, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, project_id, title, description, status, priority, due_date, created_at, updated_at";

/// Storage manager for the tracker database.
pub struct Storage {
    /// Data directory holding the database
    pub root: PathBuf,
    conn: Connection,
}

/// Per-status task counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub blocked: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed + self.blocked
    }

    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
            TaskStatus::Blocked => self.blocked,
        }
    }

    fn add(&mut self, status: TaskStatus, count: usize) {
        match status {
            TaskStatus::Pending => self.pending += count,
            TaskStatus::InProgress => self.in_progress += count,
            TaskStatus::Completed => self.completed += count,
            TaskStatus::Blocked => self.blocked += count,
        }
    }
}

impl Storage {
    /// Open or create storage in an explicit data directory.
    pub fn open_with_data_dir(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let conn =
            Connection::open(config::database_path(data_dir)).map_err(Error::StoreUnavailable)?;
        Self::init_schema(&conn).map_err(Error::StoreUnavailable)?;

        Ok(Self {
            root: data_dir.to_path_buf(),
            conn,
        })
    }

    /// Open storage only if the database already exists.
    ///
    /// Returns `Error::NotInitialized` otherwise. Used by the hook so a commit
    /// in an untracked environment never creates a database.
    pub fn open_existing_with_data_dir(data_dir: &Path) -> Result<Self> {
        if !Self::exists_with_data_dir(data_dir) {
            return Err(Error::NotInitialized);
        }
        Self::open_with_data_dir(data_dir)
    }

    /// Check if a database exists in `data_dir`.
    pub fn exists_with_data_dir(data_dir: &Path) -> bool {
        config::database_path(data_dir).is_file()
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                path TEXT,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'archived')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL,
                title TEXT NOT NULL CHECK (length(title) > 0),
                description TEXT,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'in_progress', 'completed', 'blocked')),
                priority TEXT NOT NULL DEFAULT 'medium'
                    CHECK (priority IN ('high', 'medium', 'low')),
                due_date TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id)
            );

            CREATE TABLE IF NOT EXISTS git_activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL,
                task_id INTEGER,
                commit_hash TEXT NOT NULL,
                branch_name TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id),
                FOREIGN KEY (task_id) REFERENCES tasks(id)
            );

            CREATE INDEX IF NOT EXISTS idx_projects_path ON projects(path);
            CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_activity_project ON git_activity(project_id);
            "#,
        )?;
        Ok(())
    }

    /// Start a transaction on this connection.
    ///
    /// Every `Storage` call made while the returned guard is alive runs inside
    /// it. Dropping the guard without `commit()` rolls back.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    // === Project Operations ===

    /// Register a new project.
    ///
    /// Existing paths are canonicalized so they match what git reports from
    /// inside the repository.
    pub fn add_project(
        &self,
        name: &str,
        path: Option<&Path>,
        description: Option<&str>,
    ) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Project name cannot be empty".to_string()));
        }

        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE name = ?1)",
            [name],
            |row| row.get(0),
        )?;
        if exists {
            return Err(Error::InvalidInput(format!(
                "Project '{}' already exists",
                name
            )));
        }

        let path = path.map(normalize_path);
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO projects (name, path, description, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![name, path, description, ProjectStatus::Active.as_str(), now],
        )?;

        self.get_project(self.conn.last_insert_rowid())
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: i64) -> Result<Project> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
                [id],
                row_to_project,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Project {} not found", id)))
    }

    /// Resolve a project from a CLI reference.
    ///
    /// Numeric references are IDs; anything else matches by name, exact match
    /// first, then the oldest project whose name contains the reference.
    pub fn resolve_project(&self, reference: &str) -> Result<Project> {
        let reference = reference.trim();
        if let Ok(id) = reference.parse::<i64>() {
            return self.get_project(id);
        }

        let exact = self
            .conn
            .query_row(
                &format!("SELECT {} FROM projects WHERE name = ?1", PROJECT_COLUMNS),
                [reference],
                row_to_project,
            )
            .optional()?;
        if let Some(project) = exact {
            return Ok(project);
        }

        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM projects WHERE name LIKE ?1 ORDER BY id LIMIT 1",
                    PROJECT_COLUMNS
                ),
                [format!("%{}%", reference)],
                row_to_project,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Project '{}' not found", reference)))
    }

    /// Find the project registered for a repository path.
    pub fn find_project_by_path(&self, path: &Path) -> Result<Option<Project>> {
        let literal = path.to_string_lossy().to_string();
        let canonical = normalize_path(path);

        let project = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM projects WHERE path = ?1 OR path = ?2 ORDER BY id LIMIT 1",
                    PROJECT_COLUMNS
                ),
                params![canonical, literal],
                row_to_project,
            )
            .optional()?;
        Ok(project)
    }

    /// List projects, most recently updated first.
    pub fn list_projects(&self, status: Option<ProjectStatus>) -> Result<Vec<Project>> {
        let mut sql = format!("SELECT {} FROM projects", PROJECT_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(s) = status {
            sql.push_str(" WHERE status = ?");
            params_vec.push(Box::new(s.as_str()));
        }
        sql.push_str(" ORDER BY updated_at DESC, id DESC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let projects = stmt
            .query_map(params_refs.as_slice(), row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Set a project's status (archive or reactivate). Tasks are untouched.
    pub fn set_project_status(&self, id: i64, status: ProjectStatus) -> Result<Project> {
        let changed = self.conn.execute(
            "UPDATE projects SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), format_timestamp(Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Project {} not found", id)));
        }
        self.get_project(id)
    }

    fn touch_project(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE projects SET updated_at = ?1 WHERE id = ?2",
            params![format_timestamp(at), id],
        )?;
        Ok(())
    }

    // === Task Operations ===

    /// Create a task in a project.
    pub fn add_task(
        &self,
        project_id: i64,
        title: &str,
        description: Option<&str>,
        priority: Priority,
        due_date: Option<NaiveDate>,
    ) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Task title cannot be empty".to_string()));
        }
        self.get_project(project_id)?;

        let now = Utc::now();
        let stamp = format_timestamp(now);
        self.conn.execute(
            "INSERT INTO tasks (project_id, title, description, status, priority, due_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                project_id,
                title,
                description,
                TaskStatus::Pending.as_str(),
                priority.as_str(),
                due_date.map(|d| d.to_string()),
                stamp,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.touch_project(project_id, now)?;

        self.get_task(id)
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: i64) -> Result<Task> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                [id],
                row_to_task,
            )
            .optional()?
            .ok_or(Error::TaskNotFound(id))
    }

    /// Find a task by ID within one project.
    pub fn find_task(&self, project_id: i64, task_id: i64) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM tasks WHERE id = ?1 AND project_id = ?2",
                    TASK_COLUMNS
                ),
                params![task_id, project_id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// List tasks, optionally filtered by project and status.
    ///
    /// Ordered by priority (high first), then due date (undated last), then
    /// newest first.
    pub fn list_tasks(
        &self,
        project_id: Option<i64>,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>> {
        let mut sql = format!("SELECT {} FROM tasks WHERE 1=1", TASK_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(p) = project_id {
            sql.push_str(" AND project_id = ?");
            params_vec.push(Box::new(p));
        }
        if let Some(s) = status {
            sql.push_str(" AND status = ?");
            params_vec.push(Box::new(s.as_str()));
        }

        sql.push_str(
            " ORDER BY CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END,
              due_date IS NULL, due_date ASC, created_at DESC, id DESC",
        );

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params_refs.as_slice(), row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Apply a status transition and persist it.
    ///
    /// Refreshes the task's and the owning project's `updated_at`. Does not
    /// open its own transaction so the hook can batch it with the activity
    /// record.
    pub fn update_task_status(&self, task_id: i64, status: TaskStatus) -> Result<Task> {
        let mut task = self.get_task(task_id)?;
        task.transition(status);

        self.conn.execute(
            "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![task.status.as_str(), format_timestamp(task.updated_at), task.id],
        )?;
        self.touch_project(task.project_id, task.updated_at)?;

        self.get_task(task_id)
    }

    /// Validate a raw status token and apply it, atomically.
    ///
    /// An unknown token fails with `Error::InvalidStatus` before anything is
    /// read or written.
    pub fn set_task_status(&self, task_id: i64, token: &str) -> Result<Task> {
        let status: TaskStatus = token.parse()?;
        let tx = self.begin()?;
        let task = self.update_task_status(task_id, status)?;
        tx.commit()?;
        Ok(task)
    }

    /// Count tasks per status, for one project or all of them.
    pub fn status_counts(&self, project_id: Option<i64>) -> Result<StatusCounts> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM tasks
             WHERE ?1 IS NULL OR project_id = ?1
             GROUP BY status",
        )?;
        let rows = stmt
            .query_map([project_id], |row| {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((status, count))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let status: TaskStatus = status.parse()?;
            counts.add(status, usize::try_from(count).unwrap_or(0));
        }
        Ok(counts)
    }

    /// Count projects, returning `(active, total)`.
    pub fn project_counts(&self) -> Result<(usize, usize)> {
        let (active, total): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(status = 'active'), 0), COUNT(*) FROM projects",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((active as usize, total as usize))
    }
}

/// Canonicalize a path if it exists, otherwise keep it as given.
pub fn normalize_path(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        description: row.get(3)?,
        status: parse_column(row, 4)?,
        created_at: parse_timestamp(row, 5)?,
        updated_at: parse_timestamp(row, 6)?,
    })
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let due_date = row
        .get::<_, Option<String>>(6)?
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
            })
        })
        .transpose()?;

    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: parse_column(row, 4)?,
        priority: parse_column(row, 5)?,
        due_date,
        created_at: parse_timestamp(row, 7)?,
        updated_at: parse_timestamp(row, 8)?,
    })
}
