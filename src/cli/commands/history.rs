//! History command - show recent notifications

use crate::cli::args::{HistoryArgs, OutputFormat};
use crate::cli::commands::print_json;
use crate::config::Config;
use crate::error::{DeckError, DeckResult};
use crate::history::NotificationHistory;
use crate::monitor::Notification;
use crate::ui::{self, UiContext};
use chrono::Local;
use console::style;

/// Execute the history command
pub async fn execute(args: HistoryArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect().with_format(args.format);
    let history = NotificationHistory::new(config);
    let entries = history
        .recent(args.limit)
        .await
        .map_err(|e| DeckError::io(format!("reading {}", history.path().display()), e))?;

    if args.format == OutputFormat::Json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        ui::step_info(&ctx, "No notifications recorded yet");
        if !config.general.history {
            ui::remark(&ctx, "History is disabled: deck config set general.history true");
        }
        return Ok(());
    }

    for entry in &entries {
        let at = entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        let text = match &entry.notification {
            Notification::BuildFinished(n) => n.title(),
            Notification::InputRequired(n) => {
                format!("{} #{} waiting for input: {}", n.job, n.build, n.message)
            }
            Notification::StatusChanged { status } => format!("status -> {}", status),
        };
        if args.format == OutputFormat::Plain {
            println!("{} {}", at, text);
        } else {
            println!("{} {}", style(at).dim(), text);
        }
    }
    Ok(())
}
