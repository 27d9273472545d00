//! Per-resource TTLs
//!
//! Console output has no entry here: it is never cached.

use crate::api::{stages_complete, Stage};
use crate::config::schema::CacheConfig;
use std::time::Duration;

/// Freshness window for each cached resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    pub jobs: Duration,
    pub nodes: Duration,
    pub queue: Duration,
    pub builds: Duration,
    pub running: Duration,
    pub stages_running: Duration,
    pub stages_complete: Duration,
    pub inputs: Duration,
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            jobs: Duration::from_secs(config.jobs_ttl_secs),
            nodes: Duration::from_secs(config.nodes_ttl_secs),
            queue: Duration::from_secs(config.queue_ttl_secs),
            builds: Duration::from_secs(config.builds_ttl_secs),
            running: Duration::from_secs(config.running_ttl_secs),
            stages_running: Duration::from_secs(config.stages_running_ttl_secs),
            stages_complete: Duration::from_secs(config.stages_complete_ttl_secs),
            inputs: Duration::from_secs(config.inputs_ttl_secs),
        }
    }

    /// A finished build's stages never change, so they are kept for a long time
    pub fn stages(&self, stages: &[Stage]) -> Duration {
        if stages_complete(stages) {
            self.stages_complete
        } else {
            self.stages_running
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StageStatus;

    fn stage(status: StageStatus) -> Stage {
        Stage {
            id: String::new(),
            name: "s".into(),
            status,
            start_time_millis: 0,
            duration_millis: 0,
        }
    }

    #[test]
    fn defaults_follow_resource_volatility() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.jobs, Duration::from_secs(30));
        assert_eq!(policy.nodes, Duration::from_secs(15));
        assert_eq!(policy.queue, Duration::from_secs(10));
        assert_eq!(policy.builds, Duration::from_secs(20));
    }

    #[test]
    fn terminal_stages_get_long_ttl() {
        let policy = TtlPolicy::default();
        let done = [stage(StageStatus::Success), stage(StageStatus::Failed)];
        assert_eq!(policy.stages(&done), Duration::from_secs(24 * 60 * 60));

        let running = [stage(StageStatus::Success), stage(StageStatus::InProgress)];
        assert_eq!(policy.stages(&running), Duration::from_secs(10));

        let paused = [stage(StageStatus::PausedPendingInput)];
        assert_eq!(policy.stages(&paused), Duration::from_secs(10));
    }
}
