//! Cache key layout
//!
//! Keys are `resource:scope[:detail]` so a mutation can drop everything it
//! affects with one prefix, e.g. `builds:<job>` covers every history limit.

pub const JOBS: &str = "jobs:all";
pub const NODES: &str = "nodes:all";
pub const QUEUE: &str = "queue:all";
pub const RUNNING: &str = "running:all";

/// Queue keys; the queue is a single resource today
pub const QUEUE_PREFIX: &str = "queue:";

pub fn builds(job: &str, limit: u32) -> String {
    format!("{}{}", builds_prefix(job), limit)
}

/// Every cached build history of `job`
pub fn builds_prefix(job: &str) -> String {
    format!("builds:{}:", job)
}

pub fn stages(job: &str, build: u64) -> String {
    format!("{}{}", stages_prefix(job), build)
}

/// Every cached stage list of `job`
pub fn stages_prefix(job: &str) -> String {
    format!("stages:{}:", job)
}

pub fn inputs(job: &str, build: u64) -> String {
    format!("inputs:{}:{}", job, build)
}
