//! One detection cycle: fetch, diff, announce

use crate::api::{CiApi, Job, PendingInput};
use crate::context::DeckContext;
use crate::error::DeckResult;
use crate::monitor::events::{BuildOutcome, EventBus, InputNotification, TerminalNotification};
use crate::monitor::status::GlobalStatus;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a cycle announced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub terminal: Vec<TerminalNotification>,
    pub inputs: Vec<InputNotification>,
    /// Set when the aggregate status changed this cycle
    pub status: Option<GlobalStatus>,
    /// The server changed mid-cycle and the results were discarded
    pub stale: bool,
}

impl CycleReport {
    fn stale() -> Self {
        Self {
            stale: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terminal.is_empty() && self.inputs.is_empty() && self.status.is_none()
    }
}

/// Compares each fresh inventory with the previous one and dispatches events
pub struct ChangeDetector {
    context: Arc<DeckContext>,
    events: Arc<EventBus>,
}

impl ChangeDetector {
    pub fn new(context: Arc<DeckContext>, events: Arc<EventBus>) -> Self {
        Self { context, events }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Run one cycle.
    ///
    /// Reads the API directly rather than through the response cache, so
    /// every cycle sees the server's current state. The inventory and the
    /// pending-input pass use the same snapshot.
    pub async fn run_cycle(&self) -> DeckResult<CycleReport> {
        let generation = self.context.monitor_state().generation();
        let api = self.context.api()?;
        let notify_success = self.context.config().monitor.notify_success;

        let jobs = api.jobs().await?;
        debug!("Detector cycle: {} jobs", jobs.len());

        let mut terminal = {
            let mut state = self.context.monitor_state();
            if state.generation() != generation {
                return Ok(CycleReport::stale());
            }
            state.observe_inventory(&jobs)
        };
        if !notify_success {
            terminal.retain(|n| n.outcome != BuildOutcome::Success);
        }

        let lookups = pending_input_lookups(&api, &jobs).await;
        let status = GlobalStatus::from_colors(jobs.iter().map(|job| job.color));

        let (inputs, status_changed) = {
            let mut state = self.context.monitor_state();
            if state.generation() != generation {
                return Ok(CycleReport::stale());
            }

            let mut inputs = Vec::new();
            for (job, build, pending) in &lookups {
                inputs.extend(state.observe_inputs(job, *build, pending));
            }
            (inputs, state.update_status(status))
        };

        let report = CycleReport {
            terminal,
            inputs,
            status: status_changed.then_some(status),
            stale: false,
        };
        self.dispatch(&report);
        Ok(report)
    }

    fn dispatch(&self, report: &CycleReport) {
        for notification in &report.terminal {
            debug!("Build finished: {}", notification.title());
            self.events.emit_terminal(notification);
        }
        for notification in &report.inputs {
            debug!("Input required: {}", notification.key());
            self.events.emit_input(notification);
        }
        if let Some(status) = report.status {
            debug!("Status changed to {}", status);
            self.events.emit_status(status);
        }
    }
}

/// Query pending inputs of every running build concurrently.
///
/// A failed lookup only skips that build for this cycle.
async fn pending_input_lookups(
    api: &Arc<dyn CiApi>,
    jobs: &[Job],
) -> Vec<(String, u64, Vec<PendingInput>)> {
    let running = jobs
        .iter()
        .filter(|job| job.is_running())
        .filter_map(|job| job.last_build_number().map(|build| (job.fullname.as_str(), build)));

    let lookups = running.map(|(job, build)| async move {
        match api.pending_inputs(job, build).await {
            Ok(pending) => Some((job.to_string(), build, pending)),
            Err(e) => {
                warn!("Failed to check pending input for {} #{}: {}", job, build, e);
                None
            }
        }
    });

    join_all(lookups).await.into_iter().flatten().collect()
}
