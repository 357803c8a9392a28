//! Data models for Project Tracker entities.
//!
//! This module defines the core data structures:
//! - `Project` - A named unit of work, optionally bound to a git repository path
//! - `Task` - Work items with status, priority and an optional due date
//! - `ActivityRecord` - Append-only log of commits seen by the post-commit hook
//! - `TaskStatus` - The closed set of task states and the transition rule

use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task status in the workflow.
///
/// Every state may move to every other state. Validation only guards against
/// tokens outside this set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    /// All statuses in display order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Blocked,
    ];

    /// Canonical token as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
        }
    }

    /// Human label ("In Progress").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Blocked => "Blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "in-progress" | "inprogress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "blocked" => Ok(Self::Blocked),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Status change implied by a commit message keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIntent {
    Complete,
    InProgress,
    Blocked,
}

impl StatusIntent {
    /// Map a commit keyword to its intent. Matching is case-insensitive.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "completed" | "done" => Some(Self::Complete),
            "progress" | "working" => Some(Self::InProgress),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    /// The status a task moves to under this intent.
    pub fn target_status(self) -> TaskStatus {
        match self {
            Self::Complete => TaskStatus::Completed,
            Self::InProgress => TaskStatus::InProgress,
            Self::Blocked => TaskStatus::Blocked,
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(Error::InvalidInput(format!(
                "Invalid priority '{}'. Use: high, medium, low",
                s
            ))),
        }
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            _ => Err(Error::InvalidInput(format!(
                "Invalid project status '{}'. Use: active, archived",
                s
            ))),
        }
    }
}

/// A tracked project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Internal identifier
    pub id: i64,

    /// Unique name
    pub name: String,

    /// Repository path used to match post-commit hooks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: ProjectStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A work item belonging to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, assigned by the store
    pub id: i64,

    /// Owning project
    pub project_id: i64,

    /// Task title (never empty)
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Move the task to `status`.
    ///
    /// Any transition is legal, including re-entering the current state.
    /// `updated_at` always moves strictly forward, even when the wall clock
    /// has not advanced past the previous value.
    pub fn transition(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = next_timestamp(self.updated_at);
    }
}

/// A timestamp that is `now`, or one microsecond after `previous` if the clock
/// has not moved past it. Microsecond precision matches what the store keeps.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// One commit seen by the post-commit hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub project_id: i64,

    /// First task referenced by the commit that exists in the project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,

    pub commit_hash: String,
    pub branch: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Commit metadata read from the repository at hook time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub branch: String,
    pub message: String,
}

impl CommitInfo {
    /// Abbreviated hash for display.
    pub fn short_hash(&self) -> &str {
        self.hash.get(..8).unwrap_or(&self.hash)
    }
}

/// Parse a `YYYY-MM-DD` due date.
pub fn parse_due_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("Invalid date '{}'. Use YYYY-MM-DD", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: 1,
            project_id: 1,
            title: "Write docs".to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_parse_canonical_tokens() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_aliases_and_case() {
        assert_eq!(
            "In-Progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!("BLOCKED".parse::<TaskStatus>().unwrap(), TaskStatus::Blocked);
    }

    #[test]
    fn test_status_parse_rejects_unknown_token() {
        let err = "finished".parse::<TaskStatus>().unwrap_err();
        assert!(matches!(err, Error::InvalidStatus(ref s) if s == "finished"));
        assert!("done".parse::<TaskStatus>().is_err());
        assert!("".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_every_transition_is_allowed() {
        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                let mut task = sample_task();
                task.status = from;
                task.transition(to);
                assert_eq!(task.status, to);
            }
        }
    }

    #[test]
    fn test_completed_can_be_reopened() {
        let mut task = sample_task();
        task.transition(TaskStatus::Completed);
        task.transition(TaskStatus::InProgress);
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn test_transition_strictly_advances_updated_at() {
        let mut task = sample_task();
        // A timestamp in the future forces the fallback path.
        let future = Utc::now() + Duration::hours(1);
        task.updated_at = future;
        task.transition(TaskStatus::Blocked);
        assert!(task.updated_at > future);

        let before = task.updated_at;
        task.transition(TaskStatus::Blocked);
        assert!(task.updated_at > before);
    }

    #[test]
    fn test_intent_keywords() {
        assert_eq!(StatusIntent::from_keyword("DONE"), Some(StatusIntent::Complete));
        assert_eq!(
            StatusIntent::from_keyword("completed"),
            Some(StatusIntent::Complete)
        );
        assert_eq!(
            StatusIntent::from_keyword("Working"),
            Some(StatusIntent::InProgress)
        );
        assert_eq!(
            StatusIntent::from_keyword("progress"),
            Some(StatusIntent::InProgress)
        );
        assert_eq!(StatusIntent::from_keyword("blocked"), Some(StatusIntent::Blocked));
        assert_eq!(StatusIntent::from_keyword("fixed"), None);
    }

    #[test]
    fn test_intent_target_status() {
        assert_eq!(StatusIntent::Complete.target_status(), TaskStatus::Completed);
        assert_eq!(StatusIntent::InProgress.target_status(), TaskStatus::InProgress);
        assert_eq!(StatusIntent::Blocked.target_status(), TaskStatus::Blocked);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(Priority::default(), Priority::Medium);
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_due_date() {
        let date = parse_due_date("2026-03-01").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert!(parse_due_date("03/01/2026").is_err());
        assert!(parse_due_date("2026-02-30").is_err());
    }

    #[test]
    fn test_short_hash() {
        let commit = CommitInfo {
            hash: "0123456789abcdef".to_string(),
            branch: "main".to_string(),
            message: "msg".to_string(),
        };
        assert_eq!(commit.short_hash(), "01234567");

        let short = CommitInfo {
            hash: "abc".to_string(),
            ..commit
        };
        assert_eq!(short.short_hash(), "abc");
    }
}
