//! Scripted `CiApi` for unit tests

use crate::api::color::Color;
use crate::api::types::{
    Build, BuildSummary, ConsoleChunk, Job, Node, PendingInput, QueueItem, RunningBuild, Stage,
};
use crate::api::CiApi;
use crate::error::{DeckError, DeckResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub(crate) struct FakeApi {
    pub jobs: Mutex<Vec<Job>>,
    pub builds: Mutex<Vec<Build>>,
    pub stages: Mutex<Vec<Stage>>,
    pub inputs: Mutex<HashMap<(String, u64), Vec<PendingInput>>>,
    pub fail_jobs: Mutex<Option<DeckError>>,
    pub delay: Option<Duration>,
    pub job_calls: AtomicUsize,
    pub input_calls: AtomicUsize,
    pub mutations: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_jobs(&self, jobs: Vec<Job>) {
        *self.jobs.lock().unwrap() = jobs;
    }

    pub fn set_inputs(&self, job: &str, build: u64, inputs: Vec<PendingInput>) {
        self.inputs
            .lock()
            .unwrap()
            .insert((job.to_string(), build), inputs);
    }

    pub fn fail_jobs_with(&self, err: Option<DeckError>) {
        *self.fail_jobs.lock().unwrap() = err;
    }

    pub fn job_calls(&self) -> usize {
        self.job_calls.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, what: String) {
        self.mutations.lock().unwrap().push(what);
    }
}

/// Inventory entry with the given raw color and last build
pub(crate) fn job(fullname: &str, color: &str, last_build: Option<u64>) -> Job {
    Job {
        name: fullname.rsplit('/').next().unwrap_or(fullname).to_string(),
        fullname: fullname.to_string(),
        url: format!("https://ci.example.com/job/{}/", fullname),
        color: Color::parse(Some(color)),
        last_build: last_build.map(|number| BuildSummary {
            number,
            result: None,
            timestamp: 0,
            duration: 0,
        }),
    }
}

pub(crate) fn input(id: &str) -> PendingInput {
    PendingInput {
        id: id.to_string(),
        message: format!("Proceed with {}?", id),
        proceed_text: "Proceed".to_string(),
        inputs: Vec::new(),
    }
}

#[async_trait]
impl CiApi for FakeApi {
    async fn jobs(&self) -> DeckResult<Vec<Job>> {
        self.job_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(err) = self.fail_jobs.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.jobs.lock().unwrap().clone())
    }

    async fn builds(&self, _job: &str, limit: u32) -> DeckResult<Vec<Build>> {
        self.pause().await;
        let builds = self.builds.lock().unwrap();
        Ok(builds.iter().take(limit as usize).cloned().collect())
    }

    async fn stages(&self, _job: &str, _build: u64) -> DeckResult<Vec<Stage>> {
        self.pause().await;
        Ok(self.stages.lock().unwrap().clone())
    }

    async fn pending_inputs(&self, job: &str, build: u64) -> DeckResult<Vec<PendingInput>> {
        self.input_calls.fetch_add(1, Ordering::SeqCst);
        let inputs = self.inputs.lock().unwrap();
        Ok(inputs
            .get(&(job.to_string(), build))
            .cloned()
            .unwrap_or_default())
    }

    async fn nodes(&self) -> DeckResult<Vec<Node>> {
        Ok(Vec::new())
    }

    async fn queue(&self) -> DeckResult<Vec<QueueItem>> {
        Ok(Vec::new())
    }

    async fn running_builds(&self) -> DeckResult<Vec<RunningBuild>> {
        Ok(Vec::new())
    }

    async fn console_text(&self, _job: &str, _build: u64, offset: u64) -> DeckResult<ConsoleChunk> {
        Ok(ConsoleChunk {
            text: String::new(),
            next_offset: offset,
            more_data: false,
        })
    }

    async fn trigger_build(&self, job: &str, _params: &[(String, String)]) -> DeckResult<Option<u64>> {
        self.record(format!("trigger {}", job));
        Ok(Some(1))
    }

    async fn stop_build(&self, job: &str, build: u64) -> DeckResult<()> {
        self.record(format!("stop {} #{}", job, build));
        Ok(())
    }

    async fn cancel_queue_item(&self, id: u64) -> DeckResult<()> {
        self.record(format!("cancel {}", id));
        Ok(())
    }

    async fn submit_input(
        &self,
        job: &str,
        build: u64,
        input_id: &str,
        _params: &[(String, String)],
    ) -> DeckResult<()> {
        self.record(format!("submit {} #{} {}", job, build, input_id));
        Ok(())
    }

    async fn abort_input(&self, job: &str, build: u64, input_id: &str) -> DeckResult<()> {
        self.record(format!("abort {} #{} {}", job, build, input_id));
        Ok(())
    }
}
