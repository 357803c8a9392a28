//! Append-only git activity log.
//!
//! One row per commit processed by the post-commit hook. Rows are never
//! updated or deleted.

use super::{format_timestamp, parse_timestamp, Storage};
use crate::models::{ActivityRecord, CommitInfo};
use crate::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

impl Storage {
    /// Append an activity record for a commit.
    ///
    /// `task_id` may be absent or name a task that does not exist; either way
    /// the record is written, with no task.
    pub fn record_activity(
        &self,
        project_id: i64,
        task_id: Option<i64>,
        commit: &CommitInfo,
        timestamp: DateTime<Utc>,
    ) -> Result<ActivityRecord> {
        let task_id = match task_id {
            Some(id) if self.task_exists(id)? => Some(id),
            Some(id) => {
                tracing::debug!(task_id = id, "recording activity without unknown task");
                None
            }
            None => None,
        };

        self.conn.execute(
            "INSERT INTO git_activity (project_id, task_id, commit_hash, branch_name, message, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project_id,
                task_id,
                commit.hash,
                commit.branch,
                commit.message,
                format_timestamp(timestamp),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        let record = self.conn.query_row(
            "SELECT id, project_id, task_id, commit_hash, branch_name, message, timestamp
             FROM git_activity WHERE id = ?1",
            [id],
            row_to_activity,
        )?;
        Ok(record)
    }

    /// List activity, newest first, optionally for one project.
    pub fn list_activity(&self, project_id: Option<i64>, limit: usize) -> Result<Vec<ActivityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, task_id, commit_hash, branch_name, message, timestamp
             FROM git_activity
             WHERE ?1 IS NULL OR project_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![project_id, limit], row_to_activity)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn task_exists(&self, task_id: i64) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
            [task_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Count activity records for a project.
    pub fn count_activity(&self, project_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM git_activity WHERE project_id = ?1",
            [project_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn row_to_activity(row: &Row<'_>) -> rusqlite::Result<ActivityRecord> {
    Ok(ActivityRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        task_id: row.get(2)?,
        commit_hash: row.get(3)?,
        branch: row.get(4)?,
        message: row.get(5)?,
        timestamp: parse_timestamp(row, 6)?,
    })
}
