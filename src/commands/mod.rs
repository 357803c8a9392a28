//! Command implementations for the `pt` CLI.
//!
//! Each command opens its own `Storage` for the data directory it is given
//! and returns a result that can be printed as JSON or as text:
//! - `project_*` - project registration, listing and archival
//! - `task_*` - task CRUD and explicit status changes
//! - `status_report` / `activity_list` - reporting
//! - `hooks_install` / `hook_post_commit` - git integration

use crate::hook::git::{self, RepoInfo};
use crate::hook::{self, HookOutcome, ReferenceOutcome};
use crate::models::{
    parse_due_date, ActivityRecord, Priority, Project, ProjectStatus, Task, TaskStatus,
};
use crate::storage::{StatusCounts, Storage};
use crate::Result;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

// === Project Commands ===

#[derive(Debug, Serialize)]
pub struct ProjectAdded {
    pub project: Project,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<RepoInfo>,
}

impl Output for ProjectAdded {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Added project '{}' (ID: {})",
            self.project.name, self.project.id
        )];
        if let Some(path) = &self.project.path {
            lines.push(format!("  Path: {}", path));
        }
        if let Some(info) = &self.git {
            lines.push(format!("  Git: {} ({})", info.branch, info.commit));
        }
        lines.join("\n")
    }
}

/// Repository state for a project with a path, if it is a git repository.
fn project_git(project: &Project) -> Option<RepoInfo> {
    project.path.as_deref().map(Path::new).and_then(git::repo_info)
}

/// Register a project.
pub fn project_add(
    data_dir: &Path,
    name: &str,
    path: Option<&Path>,
    description: Option<&str>,
) -> Result<ProjectAdded> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    let project = storage.add_project(name, path, description)?;
    let git = project_git(&project);
    Ok(ProjectAdded { project, git })
}

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<RepoInfo>,
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
    pub count: usize,
}

impl Output for ProjectList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found".to_string();
        }

        let mut lines = vec!["Projects".to_string(), "=".repeat(50)];
        for summary in &self.projects {
            let p = &summary.project;
            lines.push(format!("[{}] {} ({})", p.id, p.name, p.status));
            if let Some(desc) = &p.description {
                lines.push(format!("    {}", desc));
            }
            if let Some(path) = &p.path {
                lines.push(format!("    Path: {}", path));
            }
            lines.push(format!(
                "    Tasks: {}/{} completed",
                summary.completed_tasks, summary.total_tasks
            ));
            if let Some(info) = &summary.git {
                let changes = if info.has_changes {
                    " (uncommitted changes)"
                } else {
                    ""
                };
                lines.push(format!("    Git: {} ({}){}", info.branch, info.commit, changes));
            }
        }
        lines.join("\n")
    }
}

/// List projects with task totals.
pub fn project_list(data_dir: &Path, status: Option<&str>) -> Result<ProjectList> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    let status = status.map(str::parse::<ProjectStatus>).transpose()?;

    let mut projects = Vec::new();
    for project in storage.list_projects(status)? {
        let counts = storage.status_counts(Some(project.id))?;
        let git = project_git(&project);
        projects.push(ProjectSummary {
            project,
            total_tasks: counts.total(),
            completed_tasks: counts.completed,
            git,
        });
    }

    let count = projects.len();
    Ok(ProjectList { projects, count })
}

#[derive(Debug, Serialize)]
pub struct ProjectUpdated {
    pub project: Project,
}

impl Output for ProjectUpdated {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Project '{}' is now {}",
            self.project.name, self.project.status
        )
    }
}

/// Archive or reactivate a project. Its tasks are kept as they are.
pub fn project_set_status(
    data_dir: &Path,
    reference: &str,
    status: ProjectStatus,
) -> Result<ProjectUpdated> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    let project = storage.resolve_project(reference)?;
    let project = storage.set_project_status(project.id, status)?;
    Ok(ProjectUpdated { project })
}

// === Task Commands ===

#[derive(Debug, Serialize)]
pub struct TaskAdded {
    pub task: Task,
    pub project: String,
}

impl Output for TaskAdded {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!(
                "Added task '{}' to {} (ID: {})",
                self.task.title, self.project, self.task.id
            ),
            format!("  Priority: {}", self.task.priority.as_str().to_uppercase()),
        ];
        if let Some(due) = self.task.due_date {
            lines.push(format!("  Due: {}", due));
        }
        lines.join("\n")
    }
}

/// Add a task to a project.
pub fn task_add(
    data_dir: &Path,
    project_ref: &str,
    title: &str,
    description: Option<&str>,
    priority: &str,
    due: Option<&str>,
) -> Result<TaskAdded> {
    let priority: Priority = priority.parse()?;
    let due_date = due.map(parse_due_date).transpose()?;

    let storage = Storage::open_with_data_dir(data_dir)?;
    let project = storage.resolve_project(project_ref)?;
    let task = storage.add_task(project.id, title, description, priority, due_date)?;

    Ok(TaskAdded {
        task,
        project: project.name,
    })
}

#[derive(Debug, Serialize)]
pub struct TaskSummary {
    #[serde(flatten)]
    pub task: Task,
    pub project: String,
}

#[derive(Debug, Serialize)]
pub struct TaskList {
    pub tasks: Vec<TaskSummary>,
    pub count: usize,
}

impl Output for TaskList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks found".to_string();
        }

        let today = Local::now().date_naive();
        let mut lines = vec!["Tasks".to_string(), "=".repeat(60)];
        for summary in &self.tasks {
            let t = &summary.task;
            lines.push(format!(
                "[{}] {} ({}, {})",
                t.id, t.title, t.status, t.priority
            ));
            lines.push(format!("    Project: {}", summary.project));
            if let Some(desc) = &t.description {
                lines.push(format!("    {}", desc));
            }
            if let Some(due) = t.due_date {
                lines.push(format!("    Due: {} ({})", due, due_label(due, today)));
            }
        }
        lines.join("\n")
    }
}

/// Describe a due date relative to `today`.
pub fn due_label(due: NaiveDate, today: NaiveDate) -> String {
    let days = (due - today).num_days();
    match days {
        d if d < 0 => format!("OVERDUE by {} days", -d),
        0 => "TODAY".to_string(),
        1 => "1 day left".to_string(),
        d => format!("{} days left", d),
    }
}

/// List tasks, optionally filtered by project and status.
pub fn task_list(
    data_dir: &Path,
    project_ref: Option<&str>,
    status: Option<&str>,
) -> Result<TaskList> {
    let status = status.map(str::parse::<TaskStatus>).transpose()?;
    let storage = Storage::open_with_data_dir(data_dir)?;
    let project_id = project_ref
        .map(|r| storage.resolve_project(r))
        .transpose()?
        .map(|p| p.id);

    let mut tasks = Vec::new();
    for task in storage.list_tasks(project_id, status)? {
        let project = storage.get_project(task.project_id)?.name;
        tasks.push(TaskSummary { task, project });
    }

    let count = tasks.len();
    Ok(TaskList { tasks, count })
}

#[derive(Debug, Serialize)]
pub struct TaskDetail {
    pub task: Task,
    pub project: String,
    pub activity: Vec<ActivityRecord>,
}

impl Output for TaskDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let t = &self.task;
        let mut lines = vec![
            format!("[{}] {}", t.id, t.title),
            format!("  Project: {}", self.project),
            format!("  Status: {}", t.status.label()),
            format!("  Priority: {}", t.priority),
        ];
        if let Some(desc) = &t.description {
            lines.push(format!("  Description: {}", desc));
        }
        if let Some(due) = t.due_date {
            lines.push(format!("  Due: {}", due));
        }
        lines.push(format!("  Updated: {}", t.updated_at.format("%Y-%m-%d %H:%M")));
        if !self.activity.is_empty() {
            lines.push("  Commits:".to_string());
            for record in &self.activity {
                lines.push(format!("    {}", activity_line(record)));
            }
        }
        lines.join("\n")
    }
}

/// Show one task with the commits recorded against it.
pub fn task_show(data_dir: &Path, id: i64) -> Result<TaskDetail> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    let task = storage.get_task(id)?;
    let project = storage.get_project(task.project_id)?.name;
    let activity = storage
        .list_activity(Some(task.project_id), usize::MAX)?
        .into_iter()
        .filter(|r| r.task_id == Some(task.id))
        .collect();

    Ok(TaskDetail {
        task,
        project,
        activity,
    })
}

#[derive(Debug, Serialize)]
pub struct TaskStatusChanged {
    pub task: Task,
    pub previous: TaskStatus,
}

impl Output for TaskStatusChanged {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Updated '{}' from {} to {}",
            self.task.title, self.previous, self.task.status
        )
    }
}

/// Move a task to the status named by `token`.
pub fn task_status(data_dir: &Path, id: i64, token: &str) -> Result<TaskStatusChanged> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    let previous = storage.get_task(id)?.status;
    let task = storage.set_task_status(id, token)?;
    Ok(TaskStatusChanged { task, previous })
}

// === Reporting ===

#[derive(Debug, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum StatusReport {
    Project {
        project: Project,
        counts: StatusCounts,
        #[serde(skip_serializing_if = "Option::is_none")]
        git: Option<RepoInfo>,
    },
    Overall {
        active_projects: usize,
        total_projects: usize,
        counts: StatusCounts,
    },
}

impl Output for StatusReport {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match self {
            StatusReport::Project {
                project,
                counts,
                git,
            } => {
                lines.push(format!("{} - Detailed Status", project.name));
                lines.push("=".repeat(50));
                if let Some(desc) = &project.description {
                    lines.push(format!("Description: {}", desc));
                }
                if let Some(path) = &project.path {
                    lines.push(format!("Path: {}", path));
                }
                if let Some(info) = git {
                    lines.push(format!("Git Branch: {}", info.branch));
                    lines.push(format!("Latest Commit: {}", info.commit));
                    lines.push(if info.has_changes {
                        "Uncommitted changes present".to_string()
                    } else {
                        "Working directory clean".to_string()
                    });
                }
                if counts.total() == 0 {
                    lines.push("No tasks found for this project".to_string());
                } else {
                    lines.push(format!("Task Statistics (Total: {})", counts.total()));
                    push_breakdown(&mut lines, counts);
                }
            }
            StatusReport::Overall {
                active_projects,
                total_projects,
                counts,
            } => {
                lines.push("Overall Status".to_string());
                lines.push("=".repeat(40));
                lines.push(format!(
                    "Projects: {} active / {} total",
                    active_projects, total_projects
                ));
                if counts.total() == 0 {
                    lines.push("No tasks found".to_string());
                } else {
                    lines.push(format!("Tasks: {} total", counts.total()));
                    lines.push(format!("  Progress: {}", progress_bar(counts, 20)));
                    push_breakdown(&mut lines, counts);
                }
            }
        }
        lines.join("\n")
    }
}

fn push_breakdown(lines: &mut Vec<String>, counts: &StatusCounts) {
    let total = counts.total();
    for status in TaskStatus::ALL {
        let count = counts.get(status);
        if count > 0 {
            let pct = count as f64 / total as f64 * 100.0;
            lines.push(format!("  {}: {} ({:.1}%)", status.label(), count, pct));
        }
    }
}

/// Render `[████░░░░] 50.0% (2/4)` for the completed share.
pub fn progress_bar(counts: &StatusCounts, width: usize) -> String {
    let total = counts.total();
    let ratio = if total == 0 {
        0.0
    } else {
        counts.completed as f64 / total as f64
    };
    let filled = (ratio * width as f64) as usize;
    format!(
        "[{}{}] {:.1}% ({}/{})",
        "█".repeat(filled),
        "░".repeat(width - filled),
        ratio * 100.0,
        counts.completed,
        total
    )
}

/// Show statistics for one project, or across all projects.
pub fn status_report(data_dir: &Path, project_ref: Option<&str>) -> Result<StatusReport> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    match project_ref {
        Some(reference) => {
            let project = storage.resolve_project(reference)?;
            let counts = storage.status_counts(Some(project.id))?;
            let git = project_git(&project);
            Ok(StatusReport::Project {
                project,
                counts,
                git,
            })
        }
        None => {
            let (active_projects, total_projects) = storage.project_counts()?;
            let counts = storage.status_counts(None)?;
            Ok(StatusReport::Overall {
                active_projects,
                total_projects,
                counts,
            })
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityList {
    pub activity: Vec<ActivityRecord>,
    pub count: usize,
}

impl Output for ActivityList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.activity.is_empty() {
            return "No activity recorded".to_string();
        }
        self.activity
            .iter()
            .map(activity_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn activity_line(record: &ActivityRecord) -> String {
    let hash = record.commit_hash.get(..8).unwrap_or(&record.commit_hash);
    let subject = record.message.lines().next().unwrap_or_default();
    let task = record
        .task_id
        .map(|id| format!(" [task {}]", id))
        .unwrap_or_default();
    format!(
        "{} {} ({}){} {}",
        record.timestamp.format("%Y-%m-%d %H:%M"),
        hash,
        record.branch,
        task,
        subject
    )
}

/// Show recent commit activity.
pub fn activity_list(
    data_dir: &Path,
    project_ref: Option<&str>,
    limit: usize,
) -> Result<ActivityList> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    let project_id = project_ref
        .map(|r| storage.resolve_project(r))
        .transpose()?
        .map(|p| p.id);
    let activity = storage.list_activity(project_id, limit)?;
    let count = activity.len();
    Ok(ActivityList { activity, count })
}

// === Git Integration ===

#[derive(Debug, Serialize)]
pub struct HookInstall {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HookInstallReport {
    pub results: Vec<HookInstall>,
    pub installed: usize,
}

impl Output for HookInstallReport {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for r in &self.results {
            let path = r.path.as_deref().unwrap_or("-");
            match &r.error {
                None => lines.push(format!("✓ {} - Git hook installed ({})", r.project, path)),
                Some(e) => lines.push(format!("✗ {} - {}", r.project, e)),
            }
        }
        lines.push(format!(
            "{}/{} project(s) configured",
            self.installed,
            self.results.len()
        ));
        lines.join("\n")
    }
}

/// Install the post-commit hook for one project, or every project with a path.
///
/// Per-project failures are reported in the result rather than aborting the
/// batch. Naming a project without a path is an error.
pub fn hooks_install(
    data_dir: &Path,
    project_ref: Option<&str>,
    exe: &Path,
) -> Result<HookInstallReport> {
    let storage = Storage::open_with_data_dir(data_dir)?;

    let projects = match project_ref {
        Some(reference) => {
            let project = storage.resolve_project(reference)?;
            if project.path.is_none() {
                return Err(crate::Error::InvalidInput(format!(
                    "Project '{}' has no path configured",
                    project.name
                )));
            }
            vec![project]
        }
        None => {
            let projects: Vec<Project> = storage
                .list_projects(None)?
                .into_iter()
                .filter(|p| p.path.is_some())
                .collect();
            if projects.is_empty() {
                return Err(crate::Error::InvalidInput(
                    "No projects with paths found".to_string(),
                ));
            }
            projects
        }
    };

    let mut results = Vec::new();
    for project in projects {
        let Some(path) = project.path.clone() else {
            continue;
        };
        let outcome = hook::install::install_post_commit_hook(Path::new(&path), exe);
        results.push(match outcome {
            Ok(hook_path) => HookInstall {
                project: project.name,
                path: Some(path),
                installed: true,
                hook: Some(hook_path),
                error: None,
            },
            Err(e) => HookInstall {
                project: project.name,
                path: Some(path),
                installed: false,
                hook: None,
                error: Some(e.to_string()),
            },
        });
    }

    let installed = results.iter().filter(|r| r.installed).count();
    Ok(HookInstallReport { results, installed })
}

impl Output for HookOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self {
            HookOutcome::Skipped { reason } => {
                format!("Project Tracker: skipped ({})", reason.describe())
            }
            HookOutcome::Processed(report) => {
                let mut lines = Vec::new();
                if report.references.is_empty() {
                    lines.push(format!(
                        "Project Tracker: logged commit {} for '{}'",
                        report.commit, report.project
                    ));
                } else {
                    lines.push(format!(
                        "Project Tracker: processing {} task reference(s) for '{}'",
                        report.references.len(),
                        report.project
                    ));
                }
                for outcome in &report.references {
                    lines.push(match outcome {
                        ReferenceOutcome::Transitioned { title, to, .. } => {
                            format!("   ✓ Updated task '{}' -> {}", title, to)
                        }
                        ReferenceOutcome::Logged { title, .. } => {
                            format!("   ✓ Logged commit for '{}'", title)
                        }
                        ReferenceOutcome::Ambiguous { title, .. } => {
                            format!("   ✗ Ambiguous status keywords for '{}', logged only", title)
                        }
                        ReferenceOutcome::NotFound { task_id } => {
                            format!("   ✗ Task {} not found in this project", task_id)
                        }
                    });
                }
                lines.join("\n")
            }
        }
    }
}

/// Run the post-commit cycle for the repository at `repo_path`.
pub fn hook_post_commit(repo_path: &Path, data_dir: &Path) -> Result<HookOutcome> {
    hook::run_post_commit(repo_path, data_dir)
}
