//! Jenkins Deck - terminal dashboard for Jenkins
//!
//! CLI entry point that dispatches to subcommands.

use clap::{CommandFactory, Parser};
use console::style;
use jenkins_deck::cli::{commands, Cli, Commands};
use jenkins_deck::config::{Config, ConfigManager};
use jenkins_deck::error::{DeckError, DeckResult};
use jenkins_deck::ui::{self, UiContext};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DeckResult<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "deck", &mut std::io::stdout());
        return Ok(());
    }

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // A broken file must not lock the user out of `deck config`
    let config = match manager.load().await {
        Ok(config) => config,
        Err(e @ DeckError::ConfigInvalid { .. }) if matches!(cli.command, Commands::Config(_)) => {
            ui::step_warn_hint(&UiContext::detect(), &e.to_string(), "using defaults");
            Config::default()
        }
        Err(e) => return Err(e),
    };

    init_logging(cli.verbose, &config.general.log_format);
    ui::init_theme();

    match cli.command {
        Commands::Completions { .. } => Ok(()),
        Commands::Jobs(args) => commands::list::jobs(args, &config).await,
        Commands::Builds(args) => commands::list::builds(args, &config).await,
        Commands::Stages(args) => commands::list::stages(args, &config).await,
        Commands::Queue(args) => commands::list::queue(args, &config).await,
        Commands::Nodes(args) => commands::list::nodes(args, &config).await,
        Commands::Running(args) => commands::list::running(args, &config).await,
        Commands::Console(args) => commands::console(args, &config).await,
        Commands::Trigger(args) => commands::trigger(args, &config).await,
        Commands::Stop(args) => commands::stop(args, &config).await,
        Commands::Cancel(args) => commands::cancel(args, &config).await,
        Commands::Input(args) => commands::input(args, &config).await,
        Commands::Watch(args) => commands::watch(args, &config).await,
        Commands::History(args) => commands::history(args, &config).await,
        Commands::Config(args) => commands::config(args, &manager, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `DECK_LOG` overrides with a full filter
fn init_logging(verbose: u8, format: &str) {
    let default = match verbose {
        0 => "jenkins_deck=warn",
        1 => "jenkins_deck=info",
        _ => "jenkins_deck=debug",
    };
    let filter = EnvFilter::try_from_env("DECK_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
