//! Change detection and notification
//!
//! A detector cycle fetches the job inventory, compares it with what the
//! previous cycle saw, and announces:
//!
//! - builds that reached a terminal state (success, failure, unstable, aborted)
//! - running builds that are waiting on an input step, once per input
//! - changes of the aggregate tray status
//!
//! The first time a job is seen nothing is announced for it.

pub mod detector;
pub mod events;
pub mod runner;
pub mod state;
pub mod status;

pub use detector::{ChangeDetector, CycleReport};
pub use events::{
    BuildOutcome, EventBus, InputNotification, ListenerId, Notification, TerminalNotification,
};
pub use runner::BuildMonitor;
pub use state::{JobState, MonitorState};
pub use status::GlobalStatus;
