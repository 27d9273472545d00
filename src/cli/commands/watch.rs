//! Watch command - run the change detector in the foreground

use crate::cli::args::WatchArgs;
use crate::config::Config;
use crate::context::DeckContext;
use crate::error::DeckResult;
use crate::history::NotificationHistory;
use crate::monitor::{
    BuildMonitor, BuildOutcome, ChangeDetector, EventBus, GlobalStatus, InputNotification,
    TerminalNotification,
};
use crate::poll::{secs, PollOptions, PollScheduler};
use crate::service::DeckService;
use crate::ui::{self, StatusLine, UiContext};
use chrono::Local;
use console::style;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Execute the watch command
pub async fn execute(args: WatchArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect();
    let context = Arc::new(DeckContext::new(config.clone()));
    context.api()?;
    if !config.monitor.enabled {
        ui::step_warn_hint(
            &ctx,
            "Build monitor is disabled",
            "Run: deck config set monitor.enabled true",
        );
        return Ok(());
    }
    let service = DeckService::new(Arc::clone(&context));

    let mut monitor_config = config.monitor.clone();
    if let Some(interval) = args.interval {
        monitor_config.interval_secs = interval;
    }

    ui::intro(&ctx, &format!("Watching {}", config.server.url));
    ui::remark(
        &ctx,
        &format!("Checking every {}s, Ctrl-C to stop", monitor_config.interval().as_secs()),
    );

    let line = Arc::new(StatusLine::new(&ctx));
    let events = Arc::new(EventBus::new());
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();

    let sink = Arc::clone(&line);
    events.on_terminal_notification(move |n| sink.println(&describe_terminal(n)));
    let sink = Arc::clone(&line);
    events.on_pending_input_notification(move |n| sink.println(&describe_input(n)));
    events.on_build_state_change(move |status| {
        let _ = status_tx.send(*status);
    });

    let history = (!args.no_history).then(|| NotificationHistory::new(config));
    let detector = Arc::new(ChangeDetector::new(Arc::clone(&context), events));
    let monitor = BuildMonitor::spawn(detector, &monitor_config, history);

    // The job list is polled through the cache for the job count on the status line
    let scheduler = PollScheduler::default();
    let jobs_service = service.clone();
    let mut jobs = scheduler.subscribe(PollOptions::new(
        "jobs",
        secs(config.polling.jobs_secs),
        move || {
            let service = jobs_service.clone();
            async move { service.jobs().await }
        },
    ));

    let deadline = args.duration.map(|s| tokio::time::Instant::now() + Duration::from_secs(s));
    let mut status = GlobalStatus::Neutral;
    let mut job_count = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = until(deadline) => break,
            Some(next) = status_rx.recv() => {
                status = next;
                line.set_status(status, job_count);
            }
            changed = jobs.changed() => {
                if !changed {
                    break;
                }
                if let Some(list) = jobs.data() {
                    if list.len() != job_count {
                        job_count = list.len();
                        line.set_status(status, job_count);
                    }
                }
                if let Some(e) = jobs.error() {
                    debug!("Job poll failed: {}", e);
                }
            }
        }
    }

    drop(jobs);
    monitor.shutdown().await;
    line.finish();
    ui::outro(&ctx, "Stopped watching");
    Ok(())
}

async fn until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn describe_terminal(n: &TerminalNotification) -> String {
    let outcome = match n.outcome {
        BuildOutcome::Success => style(n.outcome.label()).green(),
        BuildOutcome::Failed => style(n.outcome.label()).red().bold(),
        BuildOutcome::Unstable => style(n.outcome.label()).yellow(),
        BuildOutcome::Aborted => style(n.outcome.label()).dim(),
    };
    let build = n.build.map(|b| format!(" #{}", b)).unwrap_or_default();
    format!(
        "{} {}{} {}",
        style(Local::now().format("%H:%M:%S")).dim(),
        style(&n.job).cyan(),
        build,
        outcome
    )
}

fn describe_input(n: &InputNotification) -> String {
    format!(
        "{} {} #{} {} {}\n         {}",
        style(Local::now().format("%H:%M:%S")).dim(),
        style(&n.job).cyan(),
        n.build,
        style("waiting for input:").magenta().bold(),
        n.message,
        style(format!("deck input submit {} {} {}", n.job, n.build, n.input_id)).dim()
    )
}
