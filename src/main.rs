//! Project Tracker CLI.

use clap::Parser;
use pt::cli::{Cli, Commands, HookCommands, HooksCommands, ProjectCommands, TaskCommands};
use pt::commands::{self, Output};
use pt::config;
use pt::models::{ProjectStatus, TaskStatus};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();

    let cli = Cli::parse();
    let human = cli.human_readable;

    let result = resolve_repo_path(cli.repo_path).and_then(|repo_path| {
        let data_dir = config::data_dir()?;
        tracing::debug!(repo = %repo_path.display(), data = %data_dir.display(), "resolved paths");
        run_command(cli.command, &repo_path, &data_dir, human)
    });

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Diagnostics go to stderr so stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_env(config::LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Priority: --repo flag > PT_REPO env var > current working directory.
fn resolve_repo_path(explicit_path: Option<PathBuf>) -> pt::Result<PathBuf> {
    match explicit_path {
        Some(path) if !path.exists() => Err(pt::Error::InvalidInput(format!(
            "Specified repo path does not exist: {}",
            path.display()
        ))),
        Some(path) => Ok(path),
        None => Ok(env::current_dir()?),
    }
}

fn run_command(
    command: Commands,
    repo_path: &Path,
    data_dir: &Path,
    human: bool,
) -> Result<(), pt::Error> {
    match command {
        Commands::Project { command } => match command {
            ProjectCommands::Add {
                name,
                path,
                description,
            } => {
                let result =
                    commands::project_add(data_dir, &name, path.as_deref(), description.as_deref())?;
                output(&result, human);
            }
            ProjectCommands::List { status } => {
                let result = commands::project_list(data_dir, status.as_deref())?;
                output(&result, human);
            }
            ProjectCommands::Archive { project } => {
                let result =
                    commands::project_set_status(data_dir, &project, ProjectStatus::Archived)?;
                output(&result, human);
            }
            ProjectCommands::Activate { project } => {
                let result =
                    commands::project_set_status(data_dir, &project, ProjectStatus::Active)?;
                output(&result, human);
            }
        },
        Commands::Task { command } => match command {
            TaskCommands::Add {
                project,
                title,
                description,
                priority,
                due,
            } => {
                let result = commands::task_add(
                    data_dir,
                    &project,
                    &title,
                    description.as_deref(),
                    &priority,
                    due.as_deref(),
                )?;
                output(&result, human);
            }
            TaskCommands::List { project, status } => {
                let result = commands::task_list(data_dir, project.as_deref(), status.as_deref())?;
                output(&result, human);
            }
            TaskCommands::Show { id } => {
                let result = commands::task_show(data_dir, id)?;
                output(&result, human);
            }
            TaskCommands::Status { id, status } => {
                let result = commands::task_status(data_dir, id, &status)?;
                output(&result, human);
            }
        },
        Commands::Complete { id } => {
            let result = commands::task_status(data_dir, id, TaskStatus::Completed.as_str())?;
            output(&result, human);
        }
        Commands::Start { id } => {
            let result = commands::task_status(data_dir, id, TaskStatus::InProgress.as_str())?;
            output(&result, human);
        }
        Commands::Block { id } => {
            let result = commands::task_status(data_dir, id, TaskStatus::Blocked.as_str())?;
            output(&result, human);
        }
        Commands::Status { project } => {
            let result = commands::status_report(data_dir, project.as_deref())?;
            output(&result, human);
        }
        Commands::Activity { project, limit } => {
            let result = commands::activity_list(data_dir, project.as_deref(), limit)?;
            output(&result, human);
        }
        Commands::Hook { command } => match command {
            HookCommands::PostCommit => {
                let result = commands::hook_post_commit(repo_path, data_dir)?;
                output(&result, human);
            }
        },
        Commands::Hooks { command } => match command {
            HooksCommands::Install { project } => {
                let exe = env::current_exe()?;
                let result = commands::hooks_install(data_dir, project.as_deref(), &exe)?;
                output(&result, human);
            }
        },
    }
    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
