//! CLI argument definitions for Project Tracker.

use clap::{Parser, Subcommand};

/// Project Tracker - track projects and tasks, updated from your git commits.
///
/// Reference a task in a commit message with `pt:<id>` and a status keyword
/// (`done`, `completed`, `progress`, `working`, `blocked`) to move it.
#[derive(Parser, Debug)]
#[command(name = "pt")]
#[command(author, version, about = "Track projects and tasks from the command line and from git commits", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if pt was started in <path> instead of the current directory.
    /// Can also be set via PT_REPO environment variable.
    #[arg(short = 'C', long = "repo", global = true, env = "PT_REPO")]
    pub repo_path: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Mark a task completed
    Complete {
        /// Task ID
        id: i64,
    },

    /// Mark a task in progress
    Start {
        /// Task ID
        id: i64,
    },

    /// Mark a task blocked
    Block {
        /// Task ID
        id: i64,
    },

    /// Show task statistics for one project or across all projects
    Status {
        /// Project ID or name
        project: Option<String>,
    },

    /// Show recent commit activity
    Activity {
        /// Project ID or name
        project: Option<String>,

        /// Maximum number of records to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Git hook entry points (invoked by git, not by hand)
    Hook {
        #[command(subcommand)]
        command: HookCommands,
    },

    /// Git hook installation
    Hooks {
        #[command(subcommand)]
        command: HooksCommands,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Register a new project
    Add {
        /// Unique project name
        name: String,

        /// Repository path of the project (defaults to none)
        #[arg(short, long)]
        path: Option<std::path::PathBuf>,

        /// Project description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List projects
    List {
        /// Filter by status (active, archived)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Archive a project
    Archive {
        /// Project ID or name
        project: String,
    },

    /// Reactivate an archived project
    Activate {
        /// Project ID or name
        project: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task to a project
    Add {
        /// Project ID or name
        project: String,

        /// Task title
        title: String,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority (high, medium, low)
        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// List tasks
    List {
        /// Project ID or name
        #[arg(short, long)]
        project: Option<String>,

        /// Filter by status (pending, in_progress, completed, blocked)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show a task and the commits recorded against it
    Show {
        /// Task ID
        id: i64,
    },

    /// Set a task's status
    Status {
        /// Task ID
        id: i64,

        /// New status (pending, in_progress, completed, blocked)
        status: String,
    },
}

/// Hook entry points
#[derive(Subcommand, Debug)]
pub enum HookCommands {
    /// Process the commit at HEAD (run from .git/hooks/post-commit)
    PostCommit,
}

/// Hook installation subcommands
#[derive(Subcommand, Debug)]
pub enum HooksCommands {
    /// Install the post-commit hook for one project, or for every project with a path
    Install {
        /// Project ID or name
        project: Option<String>,
    },
}
