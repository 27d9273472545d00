//! Trigger command - queue a build

use crate::cli::args::TriggerArgs;
use crate::cli::commands::service;
use crate::config::Config;
use crate::error::DeckResult;
use crate::ui::{self, UiContext};
use console::style;
use tracing::debug;

/// Execute the trigger command
pub async fn execute(args: TriggerArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect();
    debug!("Triggering {} with {} parameter(s)", args.job, args.params.len());

    let queued = service(config).trigger_build(&args.job, &args.params).await?;

    let job = style(&args.job).cyan().to_string();
    match queued {
        Some(id) => ui::step_ok_detail(&ctx, &format!("Triggered {}", job), &format!("queue item {}", id)),
        None => ui::step_ok(&ctx, &format!("Triggered {}", job)),
    }
    Ok(())
}
