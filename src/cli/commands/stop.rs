//! Stop and cancel commands

use crate::cli::args::{CancelArgs, StopArgs};
use crate::cli::commands::service;
use crate::config::Config;
use crate::ui::{self, UiContext};
use crate::error::DeckResult;
use console::style;

/// Execute the stop command
pub async fn execute(args: StopArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let target = format!("{} #{}", args.job, args.build);

    let proceed = ui::confirm(&ctx, &format!("Abort {}?", target), true).await?;
    if !proceed {
        ui::remark(&ctx, "Cancelled");
        return Ok(());
    }

    service(config).stop_build(&args.job, args.build).await?;
    ui::step_ok(&ctx, &format!("Abort requested for {}", style(&target).cyan()));
    Ok(())
}

/// Execute the cancel command
pub async fn cancel(args: CancelArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect();
    service(config).cancel_queue_item(args.id).await?;
    ui::step_ok(&ctx, &format!("Queue item {} cancelled", args.id));
    Ok(())
}
