//! Jenkins remote API
//!
//! `CiApi` is the seam between the data layer and the network. The
//! production implementation is [`JenkinsClient`]; tests substitute a
//! scripted fake.

mod client;
pub mod color;
#[cfg(test)]
pub(crate) mod fake;
pub mod path;
pub mod types;

pub use client::JenkinsClient;
pub use color::{Color, ColorBase};
pub use types::{
    stages_complete, Build, BuildResult, BuildSummary, ConsoleChunk, InputParameter, Job, Node,
    Parameters, PendingInput, QueueItem, RunningBuild, Stage, StageStatus,
};

use crate::error::DeckResult;
use async_trait::async_trait;

/// Operations against a Jenkins server
///
/// Reads are idempotent. The mutating calls return once Jenkins accepted
/// the request; callers are responsible for invalidating cached views.
#[async_trait]
pub trait CiApi: Send + Sync {
    /// Every leaf job on the server, folders flattened
    async fn jobs(&self) -> DeckResult<Vec<Job>>;

    /// Most recent builds of a job, newest first
    async fn builds(&self, job: &str, limit: u32) -> DeckResult<Vec<Build>>;

    /// Pipeline stages of a build; empty for non-pipeline jobs
    async fn stages(&self, job: &str, build: u64) -> DeckResult<Vec<Stage>>;

    /// Input steps the build is waiting on; empty when none
    async fn pending_inputs(&self, job: &str, build: u64) -> DeckResult<Vec<PendingInput>>;

    /// Build agents
    async fn nodes(&self) -> DeckResult<Vec<Node>>;

    /// Build queue
    async fn queue(&self) -> DeckResult<Vec<QueueItem>>;

    /// Builds currently executing on any executor
    async fn running_builds(&self) -> DeckResult<Vec<RunningBuild>>;

    /// Console output starting at byte `offset`
    async fn console_text(&self, job: &str, build: u64, offset: u64) -> DeckResult<ConsoleChunk>;

    /// Queue a build; returns the queue item id when Jenkins reports it
    async fn trigger_build(&self, job: &str, params: &[(String, String)]) -> DeckResult<Option<u64>>;

    /// Abort a running build
    async fn stop_build(&self, job: &str, build: u64) -> DeckResult<()>;

    /// Remove an item from the queue
    async fn cancel_queue_item(&self, id: u64) -> DeckResult<()>;

    /// Approve a pending input, optionally with parameter values
    async fn submit_input(
        &self,
        job: &str,
        build: u64,
        input_id: &str,
        params: &[(String, String)],
    ) -> DeckResult<()>;

    /// Reject a pending input, aborting the build
    async fn abort_input(&self, job: &str, build: u64, input_id: &str) -> DeckResult<()>;
}
