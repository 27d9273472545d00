//! Background detector task

use crate::config::MonitorConfig;
use crate::history::NotificationHistory;
use crate::monitor::detector::{ChangeDetector, CycleReport};
use crate::monitor::events::Notification;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Handle to a running detector; dropping it stops the task
pub struct BuildMonitor {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl BuildMonitor {
    /// Start the detector loop: wait `initial_delay`, then run a cycle every `interval`.
    ///
    /// A failing cycle is logged and the loop carries on.
    pub fn spawn(
        detector: Arc<ChangeDetector>,
        config: &MonitorConfig,
        history: Option<NotificationHistory>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let initial_delay = config.initial_delay();
        let period = config.interval();

        let task = tokio::spawn(run(detector, initial_delay, period, history, shutdown_rx));
        info!("Build monitor started (every {}s)", period.as_secs());

        Self {
            shutdown,
            task: Some(task),
        }
    }

    /// Stop the loop and wait for the current cycle to finish
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Build monitor task failed: {}", e);
            }
        }
    }
}

impl Drop for BuildMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    detector: Arc<ChangeDetector>,
    initial_delay: Duration,
    period: Duration,
    history: Option<NotificationHistory>,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = sleep(initial_delay) => {}
        _ = shutdown.changed() => return,
    }

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        match detector.run_cycle().await {
            Ok(report) => {
                if let Some(history) = &history {
                    record(history, &report).await;
                }
            }
            Err(e) if e.is_not_configured() => debug!("Build monitor idle: no server configured"),
            Err(e) if e.is_retryable() => info!("Build monitor cycle failed, retrying next tick: {}", e),
            Err(e) => warn!("Build monitor cycle failed: {}", e),
        }
    }

    debug!("Build monitor stopped");
}

async fn record(history: &NotificationHistory, report: &CycleReport) {
    for notification in &report.terminal {
        history
            .record(&Notification::BuildFinished(notification.clone()))
            .await;
    }
    for notification in &report.inputs {
        history
            .record(&Notification::InputRequired(notification.clone()))
            .await;
    }
    if let Some(status) = report.status {
        history.record(&Notification::StatusChanged { status }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{job, FakeApi};
    use crate::context::tests::{configured, fake_context};
    use crate::error::DeckError;
    use crate::monitor::EventBus;
    use tempfile::TempDir;

    fn monitor_config() -> MonitorConfig {
        MonitorConfig {
            initial_delay_secs: 5,
            interval_secs: 30,
            ..MonitorConfig::default()
        }
    }

    fn detector(api: &Arc<FakeApi>) -> Arc<ChangeDetector> {
        let context = fake_context(configured("https://ci.example.com"), Arc::clone(api));
        Arc::new(ChangeDetector::new(Arc::new(context), Arc::new(EventBus::new())))
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_follow_initial_delay_then_interval() {
        let api = Arc::new(FakeApi::new());
        let monitor = BuildMonitor::spawn(detector(&api), &monitor_config(), None);

        sleep(Duration::from_secs(4)).await;
        assert_eq!(api.job_calls(), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(api.job_calls(), 1);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(api.job_calls(), 2);

        monitor.shutdown().await;
        sleep(Duration::from_secs(120)).await;
        assert_eq!(api.job_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_do_not_stop_the_loop() {
        let api = Arc::new(FakeApi::new());
        api.fail_jobs_with(Some(DeckError::http("https://ci.example.com/api/json", "connection refused")));
        let _monitor = BuildMonitor::spawn(detector(&api), &monitor_config(), None);

        sleep(Duration::from_secs(66)).await;
        assert_eq!(api.job_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_do_not_stop_the_loop() {
        let api = Arc::new(FakeApi::new());
        let denied = DeckError::Status {
            code: 401,
            url: "https://ci.example.com/api/json".to_string(),
        };
        assert!(!denied.is_retryable());
        api.fail_jobs_with(Some(denied));
        let _monitor = BuildMonitor::spawn(detector(&api), &monitor_config(), None);

        sleep(Duration::from_secs(36)).await;
        assert_eq!(api.job_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_task() {
        let api = Arc::new(FakeApi::new());
        let monitor = BuildMonitor::spawn(detector(&api), &monitor_config(), None);
        drop(monitor);

        sleep(Duration::from_secs(120)).await;
        assert_eq!(api.job_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_written_to_history() {
        let dir = TempDir::new().unwrap();
        let history = NotificationHistory::with_path(dir.path().join("notifications.log"), true);
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("A", "blue_anime", Some(3))]);

        let monitor = BuildMonitor::spawn(detector(&api), &monitor_config(), Some(history.clone()));
        sleep(Duration::from_secs(6)).await;
        api.set_jobs(vec![job("A", "red", Some(3))]);
        sleep(Duration::from_secs(30)).await;
        monitor.shutdown().await;

        let entries = history.recent(10).await.unwrap();
        let kinds: Vec<_> = entries
            .iter()
            .map(|e| match &e.notification {
                Notification::BuildFinished(_) => "finished",
                Notification::InputRequired(_) => "input",
                Notification::StatusChanged { .. } => "status",
            })
            .collect();
        assert_eq!(kinds, vec!["status", "finished", "status"]);
    }
}
