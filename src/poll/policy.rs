//! Interval policies layered on top of the scheduler

use crate::api::Build;
use crate::config::PollingConfig;
use std::time::Duration;

/// Poll build history fast while something is running, slowly otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildsInterval {
    pub running: Duration,
    pub idle: Duration,
}

impl BuildsInterval {
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            running: secs(config.builds_running_secs),
            idle: secs(config.builds_idle_secs),
        }
    }

    pub fn for_builds(&self, builds: &[Build]) -> Duration {
        if builds.iter().any(|b| b.building) {
            self.running
        } else {
            self.idle
        }
    }
}

/// Poll intervals are at least one second
pub fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}
