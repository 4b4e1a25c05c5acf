use std::path::PathBuf;

use clap::{value_parser, Args, Parser, Subcommand};
use url::Url;

use crate::model::{TaskFilter, TaskId};

pub const DEFAULT_ORIGIN: &str = "http://localhost:8080/";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tasklight",
    version,
    about = "An offline-first task list with reminders.",
    after_help = "Examples:\n  tasklight               Launch the TUI (same as `tasklight tui`)\n  tasklight add Buy milk\n  tasklight list --filter active\n  tasklight cache install --origin https://todo.example/"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter (e.g. "info", "tasklight_offline=debug"); RUST_LOG is honoured too
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Launch the keyboard-first terminal UI (default command)
    Tui(TuiArgs),
    /// Add a task
    Add(AddArgs),
    /// List tasks
    List(ListArgs),
    /// Flip a task between active and completed
    Toggle(ToggleArgs),
    /// Delete one or more tasks by id
    Delete(DeleteArgs),
    /// Inspect or change notification permission
    Notify(NotifyArgs),
    /// Install the application launcher
    Install,
    /// Manage the offline asset cache
    Cache(CacheArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct TuiArgs {
    /// Seconds between unfinished-task reminders
    #[arg(long = "reminder-interval", value_name = "SECONDS", value_parser = value_parser!(u64).range(1..))]
    pub reminder_interval: Option<u64>,

    /// Application origin whose offline cache backs background notifications
    /// (falls back to TASKLIGHT_ORIGIN)
    #[arg(long, value_name = "URL")]
    pub origin: Option<Url>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task text
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,
}

impl AddArgs {
    pub fn joined(&self) -> String {
        self.text.join(" ")
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Which tasks to show
    #[arg(long, value_enum, default_value_t = TaskFilter::All)]
    pub filter: TaskFilter,

    /// Print the tasks as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ToggleArgs {
    #[arg(value_name = "ID")]
    pub id: TaskId,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete (shown by `tasklight list`)
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<TaskId>,
}

#[derive(Args, Debug, Clone)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub action: NotifyAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    /// Show the current permission
    Status,
    /// Grant notification permission
    Enable,
    /// Block notifications
    Disable,
    /// Deliver a reminder for the current unfinished tasks
    Test,
}

#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    /// Application origin the asset manifest is resolved against
    #[arg(long, value_name = "URL", env = "TASKLIGHT_ORIGIN", default_value = DEFAULT_ORIGIN, global = true)]
    pub origin: Url,

    /// Cache generation to work with
    #[arg(long = "cache-version", value_name = "N", global = true)]
    pub cache_version: Option<u32>,

    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Pre-fetch the asset manifest into a fresh generation and activate it
    Install,
    /// Evict every generation except the current one
    Activate,
    /// Serve a path cache-first
    Fetch {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// List generations and the entries of the current one
    List,
    /// Relay a push payload ({"title": .., "body": ..}) to the notification display
    Push {
        #[arg(value_name = "JSON")]
        payload: String,
    },
}
