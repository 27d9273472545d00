//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Jenkins Deck - a terminal dashboard for Jenkins
///
/// Browses jobs, builds, pipeline stages, the queue and agents, answers
/// pending input steps, and watches the server for finished builds.
#[derive(Parser, Debug)]
#[command(name = "deck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DECK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List jobs with their last result
    Jobs(JobsArgs),

    /// Show the build history of a job
    Builds(BuildsArgs),

    /// Show the pipeline stages of a build
    Stages(BuildRefArgs),

    /// Print the console output of a build
    Console(ConsoleArgs),

    /// Show the build queue
    Queue(FormatArgs),

    /// Show build agents
    Nodes(FormatArgs),

    /// Show builds currently executing
    Running(FormatArgs),

    /// Trigger a build
    Trigger(TriggerArgs),

    /// Abort a running build
    Stop(StopArgs),

    /// Remove an item from the build queue
    Cancel(CancelArgs),

    /// List or answer pending input steps
    Input(InputArgs),

    /// Watch the server and report finished builds and pending inputs
    Watch(WatchArgs),

    /// Show recent notifications
    History(HistoryArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Output format selection shared by listing commands
#[derive(Parser, Debug)]
pub struct FormatArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the jobs command
#[derive(Parser, Debug)]
pub struct JobsArgs {
    /// Only show jobs whose full name contains this text
    pub filter: Option<String>,

    /// Only show jobs that are building right now
    #[arg(short, long)]
    pub running: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the builds command
#[derive(Parser, Debug)]
pub struct BuildsArgs {
    /// Job full name (e.g. team/app/main)
    pub job: String,

    /// Number of builds to show
    #[arg(short, long, default_value = "20")]
    pub limit: u32,

    /// Keep refreshing, faster while a build is running
    #[arg(short, long)]
    pub watch: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// A job and one of its builds
#[derive(Parser, Debug)]
pub struct BuildRefArgs {
    /// Job full name
    pub job: String,

    /// Build number
    pub build: u64,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the console command
#[derive(Parser, Debug)]
pub struct ConsoleArgs {
    /// Job full name
    pub job: String,

    /// Build number
    pub build: u64,

    /// Keep printing output until the build finishes
    #[arg(short, long)]
    pub follow: bool,

    /// Seconds between reads when following
    #[arg(long, default_value = "2")]
    pub poll_secs: u64,
}

/// Arguments for the trigger command
#[derive(Parser, Debug)]
pub struct TriggerArgs {
    /// Job full name
    pub job: String,

    /// Build parameter (KEY=VALUE), repeatable
    #[arg(short, long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

/// Arguments for the stop command
#[derive(Parser, Debug)]
pub struct StopArgs {
    /// Job full name
    pub job: String,

    /// Build number
    pub build: u64,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the cancel command
#[derive(Parser, Debug)]
pub struct CancelArgs {
    /// Queue item id (see `deck queue`)
    pub id: u64,
}

/// Arguments for the input command
#[derive(Parser, Debug)]
pub struct InputArgs {
    #[command(subcommand)]
    pub action: InputAction,
}

/// Input subcommands
#[derive(Subcommand, Debug)]
pub enum InputAction {
    /// List input steps a build is waiting on
    List {
        /// Job full name
        job: String,
        /// Build number
        build: u64,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Approve an input step
    Submit {
        /// Job full name
        job: String,
        /// Build number
        build: u64,
        /// Input id (see `deck input list`)
        input_id: String,
        /// Input parameter (KEY=VALUE), repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Reject an input step, aborting the build
    Abort {
        /// Job full name
        job: String,
        /// Build number
        build: u64,
        /// Input id (see `deck input list`)
        input_id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Seconds between detector cycles (default: from config)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Do not record notifications in the history file
    #[arg(long)]
    pub no_history: bool,

    /// Stop after this many seconds
    #[arg(long, hide = true)]
    pub duration: Option<u64>,
}

/// Arguments for the history command
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Number of entries to show
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (API token redacted)
    Show,

    /// Show configuration file path
    Path,

    /// Create the configuration file
    Init {
        /// Jenkins URL
        #[arg(long)]
        url: Option<String>,

        /// Jenkins user name
        #[arg(long)]
        username: Option<String>,

        /// Jenkins API token
        #[arg(long, env = "DECK_API_TOKEN", hide_env_values = true)]
        api_token: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., server.url)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Parse a build or input parameter in KEY=VALUE format
fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE format: no '=' found in '{s}'"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE format: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
