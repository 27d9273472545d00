//! Notifications and the listener registry that delivers them

use crate::api::{ColorBase, InputParameter};
use crate::monitor::status::GlobalStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// How a build ended, as far as notifications are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildOutcome {
    Success,
    Failed,
    Unstable,
    Aborted,
}

impl BuildOutcome {
    /// Outcome for a settled color; `None` for colors that are not worth announcing
    pub fn from_base(base: ColorBase) -> Option<Self> {
        match base {
            ColorBase::Success => Some(Self::Success),
            ColorBase::Failure => Some(Self::Failed),
            ColorBase::Unstable => Some(Self::Unstable),
            ColorBase::Aborted => Some(Self::Aborted),
            ColorBase::Disabled | ColorBase::NotBuilt | ColorBase::Unknown => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Unstable => "UNSTABLE",
            Self::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A job finished a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalNotification {
    pub id: Uuid,
    pub job: String,
    pub build: Option<u64>,
    pub outcome: BuildOutcome,
    pub url: String,
}

impl TerminalNotification {
    pub fn title(&self) -> String {
        match self.build {
            Some(number) => format!("{} #{} {}", self.job, number, self.outcome),
            None => format!("{} {}", self.job, self.outcome),
        }
    }
}

/// A running build stopped at an input step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputNotification {
    pub id: Uuid,
    pub job: String,
    pub build: u64,
    pub input_id: String,
    pub message: String,
    pub proceed_text: String,
    pub parameters: Vec<InputParameter>,
}

impl InputNotification {
    /// Identity used to announce each input only once
    pub fn key(&self) -> String {
        input_key(&self.job, self.build, &self.input_id)
    }
}

pub(crate) fn input_key(job: &str, build: u64, input_id: &str) -> String {
    format!("{}:{}:{}", job, build, input_id)
}

/// Anything the detector announces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    BuildFinished(TerminalNotification),
    InputRequired(InputNotification),
    StatusChanged { status: GlobalStatus },
}

/// Handle returned by listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry {
    next_id: u64,
    status: Vec<(ListenerId, Listener<GlobalStatus>)>,
    terminal: Vec<(ListenerId, Listener<TerminalNotification>)>,
    input: Vec<(ListenerId, Listener<InputNotification>)>,
}

impl Registry {
    fn next_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }
}

/// Listener registry with synchronous dispatch
///
/// Listeners run on the detector's task, outside the registry lock, so a
/// listener may register or remove listeners itself.
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                status: Vec::new(),
                terminal: Vec::new(),
                input: Vec::new(),
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called whenever the aggregate status changes
    pub fn on_build_state_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&GlobalStatus) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = registry.next_id();
        registry.status.push((id, Arc::new(listener)));
        id
    }

    pub fn on_terminal_notification<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&TerminalNotification) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = registry.next_id();
        registry.terminal.push((id, Arc::new(listener)));
        id
    }

    pub fn on_pending_input_notification<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&InputNotification) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = registry.next_id();
        registry.input.push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener; returns false if it was already gone
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut registry = self.registry();
        let before = registry.status.len() + registry.terminal.len() + registry.input.len();
        registry.status.retain(|(lid, _)| *lid != id);
        registry.terminal.retain(|(lid, _)| *lid != id);
        registry.input.retain(|(lid, _)| *lid != id);
        let after = registry.status.len() + registry.terminal.len() + registry.input.len();
        after < before
    }

    pub fn emit_status(&self, status: GlobalStatus) {
        let listeners = snapshot(&self.registry().status);
        for listener in listeners {
            listener(&status);
        }
    }

    pub fn emit_terminal(&self, notification: &TerminalNotification) {
        let listeners = snapshot(&self.registry().terminal);
        for listener in listeners {
            listener(notification);
        }
    }

    pub fn emit_input(&self, notification: &InputNotification) {
        let listeners = snapshot(&self.registry().input);
        for listener in listeners {
            listener(notification);
        }
    }
}

fn snapshot<T: ?Sized>(listeners: &[(ListenerId, Arc<T>)]) -> Vec<Arc<T>> {
    listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
}
