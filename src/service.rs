//! Cached data access
//!
//! Reads go through the request coordinator with the TTL for their
//! resource; mutations go straight to the server and then drop the cached
//! views they affect. Console output is never cached.

use crate::api::{
    Build, CiApi, ConsoleChunk, Job, Node, PendingInput, QueueItem, RunningBuild, Stage,
};
use crate::cache::keys;
use crate::context::DeckContext;
use crate::error::DeckResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What the dashboard calls
#[derive(Clone)]
pub struct DeckService {
    context: Arc<DeckContext>,
}

impl DeckService {
    pub fn new(context: Arc<DeckContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<DeckContext> {
        &self.context
    }

    /// Cached read against the client current at call time
    async fn read<T, L, F, Fut>(&self, key: &str, ttl_for: L, fetch: F) -> DeckResult<T>
    where
        T: Clone + Send + Sync + 'static,
        L: FnOnce(&T) -> Duration + Send + 'static,
        F: FnOnce(Arc<dyn CiApi>) -> Fut,
        Fut: Future<Output = DeckResult<T>> + Send + 'static,
    {
        let (api, epoch) = self.context.api_with_epoch()?;
        self.context
            .coordinator()
            .cached_fetch_since(epoch, key, ttl_for, move || fetch(api))
            .await
    }

    pub async fn jobs(&self) -> DeckResult<Vec<Job>> {
        let ttl = self.context.ttl().jobs;
        self.read(keys::JOBS, move |_: &Vec<Job>| ttl, |api| async move { api.jobs().await })
            .await
    }

    pub async fn builds(&self, job: &str, limit: u32) -> DeckResult<Vec<Build>> {
        let ttl = self.context.ttl().builds;
        let owned = job.to_string();
        self.read(&keys::builds(job, limit), move |_: &Vec<Build>| ttl, move |api| async move {
            api.builds(&owned, limit).await
        })
        .await
    }

    /// Stage lists of finished builds are kept much longer than running ones
    pub async fn stages(&self, job: &str, build: u64) -> DeckResult<Vec<Stage>> {
        let ttl = self.context.ttl();
        let owned = job.to_string();
        self.read(
            &keys::stages(job, build),
            move |stages: &Vec<Stage>| ttl.stages(stages),
            move |api| async move { api.stages(&owned, build).await },
        )
        .await
    }

    pub async fn pending_inputs(&self, job: &str, build: u64) -> DeckResult<Vec<PendingInput>> {
        let ttl = self.context.ttl().inputs;
        let owned = job.to_string();
        self.read(
            &keys::inputs(job, build),
            move |_: &Vec<PendingInput>| ttl,
            move |api| async move { api.pending_inputs(&owned, build).await },
        )
        .await
    }

    pub async fn nodes(&self) -> DeckResult<Vec<Node>> {
        let ttl = self.context.ttl().nodes;
        self.read(keys::NODES, move |_: &Vec<Node>| ttl, |api| async move { api.nodes().await })
            .await
    }

    pub async fn queue(&self) -> DeckResult<Vec<QueueItem>> {
        let ttl = self.context.ttl().queue;
        self.read(keys::QUEUE, move |_: &Vec<QueueItem>| ttl, |api| async move { api.queue().await })
            .await
    }

    pub async fn running_builds(&self) -> DeckResult<Vec<RunningBuild>> {
        let ttl = self.context.ttl().running;
        self.read(keys::RUNNING, move |_: &Vec<RunningBuild>| ttl, |api| async move {
            api.running_builds().await
        })
        .await
    }

    pub async fn console_text(&self, job: &str, build: u64, offset: u64) -> DeckResult<ConsoleChunk> {
        self.context.api()?.console_text(job, build, offset).await
    }

    /// Queue a build; returns the queue item id when the server reports one
    pub async fn trigger_build(&self, job: &str, params: &[(String, String)]) -> DeckResult<Option<u64>> {
        let result = self.context.api()?.trigger_build(job, params).await;
        self.invalidate(&[keys::JOBS, keys::builds_prefix(job).as_str(), keys::RUNNING, keys::QUEUE_PREFIX]);
        result
    }

    pub async fn stop_build(&self, job: &str, build: u64) -> DeckResult<()> {
        let result = self.context.api()?.stop_build(job, build).await;
        self.invalidate(&[keys::builds_prefix(job).as_str(), keys::RUNNING]);
        result
    }

    pub async fn cancel_queue_item(&self, id: u64) -> DeckResult<()> {
        let result = self.context.api()?.cancel_queue_item(id).await;
        self.invalidate(&[keys::QUEUE_PREFIX]);
        result
    }

    pub async fn submit_input(
        &self,
        job: &str,
        build: u64,
        input_id: &str,
        params: &[(String, String)],
    ) -> DeckResult<()> {
        let result = self
            .context
            .api()?
            .submit_input(job, build, input_id, params)
            .await;
        self.invalidate_after_input(job, build);
        result
    }

    pub async fn abort_input(&self, job: &str, build: u64, input_id: &str) -> DeckResult<()> {
        let result = self.context.api()?.abort_input(job, build, input_id).await;
        self.invalidate_after_input(job, build);
        result
    }

    fn invalidate_after_input(&self, job: &str, build: u64) {
        self.invalidate(&[
            keys::builds_prefix(job).as_str(),
            keys::stages_prefix(job).as_str(),
            keys::inputs(job, build).as_str(),
            keys::RUNNING,
        ]);
    }

    /// Drop cached views a mutation may have changed, whether or not it succeeded
    fn invalidate(&self, keys: &[&str]) {
        let coordinator = self.context.coordinator();
        for key in keys {
            debug!("Invalidating {}", key);
            coordinator.invalidate(key);
        }
    }
}
