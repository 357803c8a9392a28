//! Post-commit hook pipeline.
//!
//! One cycle per commit: resolve the repository to a project, parse the
//! commit message for `pt:<id>` references, apply status intents, then append
//! exactly one activity record. Status updates and the activity record share
//! a transaction.
//!
//! Only store failures abort a cycle. Unknown tasks, ambiguous keywords,
//! untracked repositories and unreadable git state are logged and skipped so
//! tracking never gets in the way of committing.

pub mod git;
pub mod install;
pub mod parser;

pub use parser::{parse_commit_message, TaskReference};

use crate::models::{ActivityRecord, CommitInfo, Project, TaskStatus};
use crate::storage::Storage;
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;

/// Why a cycle finished without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No tracker database exists yet
    NotInitialized,
    /// The working directory is not inside a git repository
    NotARepository,
    /// No project is registered for this repository
    UntrackedRepository,
    /// HEAD could not be read
    NoCommit,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NotInitialized => "no tracker database",
            Self::NotARepository => "not a git repository",
            Self::UntrackedRepository => "repository is not tracked",
            Self::NoCommit => "could not read HEAD commit",
        }
    }
}

/// What happened to one `pt:<id>` reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReferenceOutcome {
    Transitioned {
        task_id: i64,
        title: String,
        from: TaskStatus,
        to: TaskStatus,
    },
    Logged {
        task_id: i64,
        title: String,
    },
    Ambiguous {
        task_id: i64,
        title: String,
    },
    NotFound {
        task_id: i64,
    },
}

/// Result of a processed commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub project: String,
    pub commit: String,
    pub references: Vec<ReferenceOutcome>,
    pub activity: ActivityRecord,
}

/// Result of one hook invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum HookOutcome {
    Skipped { reason: SkipReason },
    Processed(CycleReport),
}

/// Run a full post-commit cycle for the repository containing `repo_path`.
pub fn run_post_commit(repo_path: &Path, data_dir: &Path) -> Result<HookOutcome> {
    let Some(root) = git::find_git_root(repo_path) else {
        tracing::debug!(path = %repo_path.display(), "not inside a git repository");
        return Ok(skipped(SkipReason::NotARepository));
    };

    let storage = match Storage::open_existing_with_data_dir(data_dir) {
        Ok(storage) => storage,
        Err(Error::NotInitialized) => {
            tracing::debug!(data_dir = %data_dir.display(), "no tracker database");
            return Ok(skipped(SkipReason::NotInitialized));
        }
        Err(e) => return Err(e),
    };

    let Some(project) = storage.find_project_by_path(&root)? else {
        tracing::debug!(repo = %root.display(), "no project registered for repository");
        return Ok(skipped(SkipReason::UntrackedRepository));
    };

    let commit = match git::read_head_commit(&root) {
        Ok(commit) => commit,
        Err(e) => {
            tracing::warn!(error = %e, "could not read HEAD commit");
            return Ok(skipped(SkipReason::NoCommit));
        }
    };

    let report = process_commit(&storage, &project, &commit)?;
    Ok(HookOutcome::Processed(report))
}

/// Apply one commit to `project` and record it.
pub fn process_commit(
    storage: &Storage,
    project: &Project,
    commit: &CommitInfo,
) -> Result<CycleReport> {
    let tx = storage.begin()?;

    let mut references = Vec::new();
    let mut first_task: Option<i64> = None;

    for item in parse_commit_message(&commit.message) {
        let (task_id, intent, ambiguous) = match item {
            Ok(reference) => (reference.task_id, reference.intent, false),
            Err(Error::ParseAmbiguous { task_id }) => {
                tracing::warn!(task_id, "conflicting status keywords, logging commit only");
                (task_id, None, true)
            }
            Err(e) => return Err(e),
        };

        let Some(task) = storage.find_task(project.id, task_id)? else {
            tracing::warn!(task_id, project = %project.name, "task not found in project");
            references.push(ReferenceOutcome::NotFound { task_id });
            continue;
        };
        first_task.get_or_insert(task.id);

        let outcome = match intent {
            Some(intent) => {
                let updated = storage.update_task_status(task.id, intent.target_status())?;
                tracing::info!(
                    task_id,
                    from = %task.status,
                    to = %updated.status,
                    commit = commit.short_hash(),
                    "task status updated from commit"
                );
                ReferenceOutcome::Transitioned {
                    task_id,
                    title: task.title,
                    from: task.status,
                    to: updated.status,
                }
            }
            None if ambiguous => ReferenceOutcome::Ambiguous {
                task_id,
                title: task.title,
            },
            None => ReferenceOutcome::Logged {
                task_id,
                title: task.title,
            },
        };
        references.push(outcome);
    }

    let activity = storage.record_activity(project.id, first_task, commit, Utc::now())?;
    tx.commit()?;

    Ok(CycleReport {
        project: project.name.clone(),
        commit: commit.short_hash().to_string(),
        references,
        activity,
    })
}

fn skipped(reason: SkipReason) -> HookOutcome {
    HookOutcome::Skipped { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{add_task, TestEnv};

    fn commit(message: &str) -> CommitInfo {
        CommitInfo {
            hash: "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678".to_string(),
            branch: "feature/auth".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_message_without_marker_still_records_activity() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");
        let task = add_task(&storage, &project, "Add auth");

        let report = process_commit(&storage, &project, &commit("Refactor helpers")).unwrap();
        assert!(report.references.is_empty());
        assert_eq!(report.activity.task_id, None);
        assert_eq!(storage.count_activity(project.id).unwrap(), 1);
        assert_eq!(storage.get_task(task.id).unwrap(), task);
    }

    #[test]
    fn test_completed_keyword_transitions_task() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");
        let task = add_task(&storage, &project, "Add auth");
        let message = format!("Add auth pt:{} completed", task.id);

        let report = process_commit(&storage, &project, &commit(&message)).unwrap();

        let stored = storage.get_task(task.id).unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert!(stored.updated_at > task.updated_at);
        assert_eq!(report.activity.task_id, Some(task.id));
        assert_eq!(report.activity.message, message);
        assert_eq!(report.activity.commit_hash, commit("").hash);
        assert_eq!(report.activity.branch, "feature/auth");
        assert_eq!(
            report.references,
            vec![ReferenceOutcome::Transitioned {
                task_id: task.id,
                title: "Add auth".to_string(),
                from: TaskStatus::Pending,
                to: TaskStatus::Completed,
            }]
        );
    }

    #[test]
    fn test_marker_without_keyword_logs_only() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");
        let task = add_task(&storage, &project, "Add auth");

        let report =
            process_commit(&storage, &project, &commit(&format!("touch pt:{}", task.id)))
                .unwrap();

        assert_eq!(storage.get_task(task.id).unwrap(), task);
        assert_eq!(report.activity.task_id, Some(task.id));
        assert!(matches!(
            report.references[0],
            ReferenceOutcome::Logged { task_id, .. } if task_id == task.id
        ));
    }

    #[test]
    fn test_single_keyword_updates_every_referenced_task() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");
        let a = add_task(&storage, &project, "A");
        let b = add_task(&storage, &project, "B");

        let message = format!("wip pt:{} progress pt:{}", a.id, b.id);
        let report = process_commit(&storage, &project, &commit(&message)).unwrap();

        assert_eq!(storage.get_task(a.id).unwrap().status, TaskStatus::InProgress);
        assert_eq!(storage.get_task(b.id).unwrap().status, TaskStatus::InProgress);
        assert_eq!(report.activity.task_id, Some(a.id));
        assert_eq!(storage.count_activity(project.id).unwrap(), 1);
    }

    #[test]
    fn test_unknown_task_is_skipped_and_first_match_recorded() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");
        let task = add_task(&storage, &project, "Add auth");

        let message = format!("pt:999 pt:{} done", task.id);
        let report = process_commit(&storage, &project, &commit(&message)).unwrap();

        assert_eq!(report.references[0], ReferenceOutcome::NotFound { task_id: 999 });
        assert_eq!(report.activity.task_id, Some(task.id));
        assert_eq!(storage.get_task(task.id).unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn test_only_unknown_tasks_records_absent_reference() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");

        let report = process_commit(&storage, &project, &commit("pt:404 done")).unwrap();
        assert_eq!(report.activity.task_id, None);
        assert_eq!(storage.count_activity(project.id).unwrap(), 1);
    }

    #[test]
    fn test_task_from_other_project_is_not_touched() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");
        let other = storage.add_project("web", None, None).unwrap();
        let foreign = add_task(&storage, &other, "Foreign");

        let message = format!("pt:{} done", foreign.id);
        let report = process_commit(&storage, &project, &commit(&message)).unwrap();

        assert_eq!(storage.get_task(foreign.id).unwrap().status, TaskStatus::Pending);
        assert_eq!(report.activity.task_id, None);
    }

    #[test]
    fn test_ambiguous_marker_falls_back_to_log_only() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");
        let a = add_task(&storage, &project, "A");
        let b = add_task(&storage, &project, "B");

        let message = format!("pt:{} done, pt:{} blocked progress", a.id, b.id);
        let report = process_commit(&storage, &project, &commit(&message)).unwrap();

        assert_eq!(storage.get_task(a.id).unwrap().status, TaskStatus::Completed);
        assert_eq!(storage.get_task(b.id).unwrap().status, TaskStatus::Pending);
        assert!(matches!(
            report.references[1],
            ReferenceOutcome::Ambiguous { task_id, .. } if task_id == b.id
        ));
    }

    #[test]
    fn test_same_commit_twice_appends_twice_with_same_status() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");
        let task = add_task(&storage, &project, "Add auth");
        let c = commit(&format!("pt:{} blocked", task.id));

        process_commit(&storage, &project, &c).unwrap();
        let after_first = storage.get_task(task.id).unwrap().status;
        process_commit(&storage, &project, &c).unwrap();

        assert_eq!(storage.get_task(task.id).unwrap().status, after_first);
        assert_eq!(after_first, TaskStatus::Blocked);
        assert_eq!(storage.count_activity(project.id).unwrap(), 2);
    }

    #[test]
    fn test_equidistant_keyword_leaves_both_tasks_untouched() {
        let env = TestEnv::new();
        let storage = env.open_storage();
        let project = env.add_repo_project(&storage, "api");
        let a = add_task(&storage, &project, "A");
        let b = add_task(&storage, &project, "B");

        let message = format!("pt:{} done pt:{} blocked", a.id, b.id);
        let report = process_commit(&storage, &project, &commit(&message)).unwrap();

        assert_eq!(storage.get_task(a.id).unwrap(), a);
        assert_eq!(storage.get_task(b.id).unwrap(), b);
        assert!(report
            .references
            .iter()
            .all(|r| matches!(r, ReferenceOutcome::Ambiguous { .. })));
        assert_eq!(report.activity.task_id, Some(a.id));
    }
}
