//! Visibility-aware polling
//!
//! Each subscription owns one task and at most one timer. While the host
//! is visible and the subscription enabled, the task fetches immediately
//! and then once per interval; when either turns false the timer is
//! dropped. Becoming active again fetches right away.

use crate::error::{DeckError, DeckResult};
use crate::poll::visibility::{should_run, Visibility};
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, DeckResult<T>> + Send + Sync>;
type AdaptFn<T> = Arc<dyn Fn(&T) -> Duration + Send + Sync>;

/// What to poll and how often
pub struct PollOptions<T> {
    name: String,
    fetch: FetchFn<T>,
    interval: Duration,
    enabled: bool,
    adapt: Option<AdaptFn<T>>,
}

impl<T> PollOptions<T> {
    pub fn new<F, Fut>(name: impl Into<String>, interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DeckResult<T>> + Send + 'static,
    {
        Self {
            name: name.into(),
            fetch: Arc::new(move || fetch().boxed()),
            interval,
            enabled: true,
            adapt: None,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Pick the next interval from each successful result
    pub fn adaptive<A>(mut self, adapt: A) -> Self
    where
        A: Fn(&T) -> Duration + Send + Sync + 'static,
    {
        self.adapt = Some(Arc::new(adapt));
        self
    }
}

/// Latest result of a subscription
#[derive(Debug, Clone)]
pub struct PollState<T> {
    /// Last successful result; kept when a later fetch fails
    pub data: Option<T>,
    pub loading: bool,
    /// Error of the most recent fetch, cleared by the next success
    pub error: Option<DeckError>,
    pub updated_at: Option<Instant>,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            updated_at: None,
        }
    }
}

enum Control {
    Refresh,
    SetInterval(Duration),
    SetEnabled(bool),
}

/// Creates subscriptions that share one visibility signal
#[derive(Clone, Default)]
pub struct PollScheduler {
    visibility: Visibility,
}

impl PollScheduler {
    pub fn new(visibility: Visibility) -> Self {
        Self { visibility }
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Start polling; stops when the returned handle is dropped
    pub fn subscribe<T>(&self, options: PollOptions<T>) -> Subscription<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let (state_tx, state_rx) = watch::channel(PollState::default());
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let poller = Poller {
            name: options.name,
            fetch: options.fetch,
            adapt: options.adapt,
            interval: options.interval,
            enabled: options.enabled,
            state: state_tx,
        };
        let task = tokio::spawn(poller.run(self.visibility.watch(), control_rx));

        Subscription {
            state: state_rx,
            control: control_tx,
            task,
        }
    }
}

/// Handle to one polled resource
pub struct Subscription<T> {
    state: watch::Receiver<PollState<T>>,
    control: mpsc::UnboundedSender<Control>,
    task: JoinHandle<()>,
}

impl<T: Clone> Subscription<T> {
    pub fn state(&self) -> PollState<T> {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.state.borrow().data.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<DeckError> {
        self.state.borrow().error.clone()
    }

    /// Fetch now, if enabled
    pub fn refresh(&self) {
        let _ = self.control.send(Control::Refresh);
    }

    /// Replace the interval; the running timer is restarted, never duplicated
    pub fn set_interval(&self, interval: Duration) {
        let _ = self.control.send(Control::SetInterval(interval));
    }

    pub fn set_enabled(&self, enabled: bool) {
        let _ = self.control.send(Control::SetEnabled(enabled));
    }

    /// Wait for the next state change; false once the subscription has stopped
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Poller<T> {
    name: String,
    fetch: FetchFn<T>,
    adapt: Option<AdaptFn<T>>,
    interval: Duration,
    enabled: bool,
    state: watch::Sender<PollState<T>>,
}

impl<T: Send + Sync + 'static> Poller<T> {
    async fn run(
        mut self,
        mut visible: watch::Receiver<bool>,
        mut control: mpsc::UnboundedReceiver<Control>,
    ) {
        let mut ticker: Option<Interval> = None;
        let mut visibility_open = true;

        loop {
            let active = should_run(self.enabled, *visible.borrow_and_update());
            match (active, ticker.is_some()) {
                (true, false) => {
                    debug!("Polling {} every {}s", self.name, self.interval.as_secs());
                    self.fetch_once().await;
                    ticker = Some(self.ticker());
                }
                (false, true) => {
                    debug!("Polling {} paused", self.name);
                    ticker = None;
                }
                _ => {}
            }

            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    if self.fetch_once().await {
                        ticker = Some(self.ticker());
                    }
                }
                changed = visible.changed(), if visibility_open => {
                    if changed.is_err() {
                        visibility_open = false;
                    }
                }
                message = control.recv() => match message {
                    None => break,
                    Some(Control::Refresh) => {
                        if should_run(self.enabled, *visible.borrow()) {
                            self.fetch_once().await;
                            if ticker.is_some() {
                                ticker = Some(self.ticker());
                            }
                        }
                    }
                    Some(Control::SetInterval(period)) => {
                        if period != self.interval {
                            self.interval = period;
                            if ticker.is_some() {
                                ticker = Some(self.ticker());
                            }
                        }
                    }
                    Some(Control::SetEnabled(enabled)) => self.enabled = enabled,
                },
            }
        }
    }

    /// First tick one full interval from now
    fn ticker(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Fetch and publish; returns true when the adaptive policy changed the interval
    async fn fetch_once(&mut self) -> bool {
        self.state.send_modify(|state| state.loading = true);
        let result = (self.fetch)().await;

        let mut retuned = false;
        match result {
            Ok(value) => {
                if let Some(adapt) = &self.adapt {
                    let next = adapt(&value);
                    if next != self.interval {
                        debug!("Polling {} now every {}s", self.name, next.as_secs());
                        self.interval = next;
                        retuned = true;
                    }
                }
                self.state.send_modify(|state| {
                    state.data = Some(value);
                    state.error = None;
                    state.loading = false;
                    state.updated_at = Some(Instant::now());
                });
            }
            Err(e) => {
                debug!("Polling {} failed: {}", self.name, e);
                self.state.send_modify(|state| {
                    state.error = Some(e);
                    state.loading = false;
                });
            }
        }
        retuned
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
