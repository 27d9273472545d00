//! HTTP client for the Jenkins JSON API
//!
//! Uses a blocking `ureq` agent; every call is moved onto tokio's blocking
//! pool so the async callers never stall the runtime.

use crate::api::color::Color;
use crate::api::path;
use crate::api::types::{
    Build, BuildSummary, ConsoleChunk, Job, Node, PendingInput, QueueItem, RunningBuild, Stage,
};
use crate::api::CiApi;
use crate::config::ServerConfig;
use crate::error::{DeckError, DeckResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use ureq::http::Response;
use ureq::Body;
use url::Url;

/// How many folder levels the inventory query descends
const FOLDER_DEPTH: usize = 4;

/// Console output above this size is truncated by the agent
const CONSOLE_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

/// Jenkins API client
#[derive(Clone)]
pub struct JenkinsClient {
    inner: Arc<Inner>,
}

struct Inner {
    base: Url,
    agent: ureq::Agent,
    auth: Option<String>,
    use_crumb: bool,
    /// `None` = not fetched yet, `Some(None)` = crumbs disabled on the server
    crumb: Mutex<Option<Option<Crumb>>>,
}

#[derive(Debug, Clone)]
struct Crumb {
    field: String,
    value: String,
}

impl JenkinsClient {
    /// Build a client for the configured server
    pub fn new(server: &ServerConfig) -> DeckResult<Self> {
        if !server.is_configured() {
            return Err(DeckError::NotConfigured);
        }

        let base = path::base_url(&server.url)?;
        let config = ureq::Agent::config_builder()
            .timeout_global(server.timeout())
            .redirect_auth_headers(ureq::config::RedirectAuthHeaders::SameHost)
            .build();
        let agent = ureq::Agent::new_with_config(config);

        let auth = (!server.username.is_empty()).then(|| {
            let raw = format!("{}:{}", server.username, server.api_token);
            format!("Basic {}", BASE64.encode(raw))
        });

        debug!(url = %base, user = %server.username, "Created Jenkins client");
        Ok(Self {
            inner: Arc::new(Inner {
                base,
                agent,
                auth,
                use_crumb: server.use_crumb,
                crumb: Mutex::new(None),
            }),
        })
    }

    /// Server base URL
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    async fn blocking<T, F>(&self, f: F) -> DeckResult<T>
    where
        F: FnOnce(&Inner) -> DeckResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| DeckError::Internal(format!("request task failed: {}", e)))?
    }

    async fn get_json<T>(&self, url: Url) -> DeckResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.blocking(move |inner| inner.get_json(&url)).await
    }

    /// Like `get_json`, but a 404 means "nothing there" rather than an error
    async fn get_json_or_default<T>(&self, url: Url) -> DeckResult<T>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        match self.get_json(url).await {
            Err(e) if e.is_not_found() => Ok(T::default()),
            other => other,
        }
    }

    async fn post(&self, url: Url, form: Vec<(String, String)>) -> DeckResult<Response<Body>> {
        self.blocking(move |inner| inner.post(&url, &form)).await
    }

    fn job_url(&self, job: &str, tail: &[&str]) -> DeckResult<Url> {
        path::job_url(&self.inner.base, job, tail)
    }

    fn root_url(&self, tail: &[&str]) -> DeckResult<Url> {
        path::root_url(&self.inner.base, tail)
    }
}

impl Inner {
    fn authorize<B>(&self, mut request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth.as_str());
        }
        request
    }

    fn get(&self, url: &Url) -> DeckResult<Response<Body>> {
        self.authorize(self.agent.get(url.as_str()))
            .call()
            .map_err(|e| request_error(url, e))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &Url) -> DeckResult<T> {
        let mut response = self.get(url)?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| request_error(url, e))?;
        serde_json::from_str(&body).map_err(|e| DeckError::decode(url.as_str(), e))
    }

    fn post(&self, url: &Url, form: &[(String, String)]) -> DeckResult<Response<Body>> {
        match self.post_once(url, form) {
            // A stale crumb is rejected with 403; fetch a fresh one and retry once
            Err(DeckError::Status { code: 403, .. }) if self.has_crumb() => {
                debug!(url = %url, "Crumb rejected, refreshing");
                self.reset_crumb();
                self.post_once(url, form)
            }
            other => other,
        }
    }

    fn post_once(&self, url: &Url, form: &[(String, String)]) -> DeckResult<Response<Body>> {
        let crumb = self.crumb()?;
        let mut request = self.authorize(self.agent.post(url.as_str()));
        if let Some(crumb) = &crumb {
            request = request.header(crumb.field.as_str(), crumb.value.as_str());
        }

        let result = if form.is_empty() {
            request.send_empty()
        } else {
            request.send_form(form.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        };
        result.map_err(|e| request_error(url, e))
    }

    fn crumb(&self) -> DeckResult<Option<Crumb>> {
        if !self.use_crumb {
            return Ok(None);
        }

        let mut cached = self.crumb.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        let url = path::root_url(&self.base, &["crumbIssuer", "api", "json"])?;
        let fetched = match self.get_json::<RawCrumb>(&url) {
            Ok(raw) => Some(Crumb {
                field: raw.crumb_request_field,
                value: raw.crumb,
            }),
            Err(e) if e.is_not_found() => {
                debug!("Crumb issuer not available, sending requests without crumb");
                None
            }
            Err(e) => return Err(e),
        };

        *cached = Some(fetched.clone());
        Ok(fetched)
    }

    fn has_crumb(&self) -> bool {
        let cached = self.crumb.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(cached.as_ref(), Some(Some(_)))
    }

    fn reset_crumb(&self) {
        *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

fn request_error(url: &Url, err: ureq::Error) -> DeckError {
    match err {
        ureq::Error::StatusCode(code) => DeckError::Status {
            code,
            url: url.to_string(),
        },
        other => DeckError::http(url.as_str(), other),
    }
}

fn header_str<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// `.../queue/item/123/` -> 123
fn queue_id_from_location(location: &str) -> Option<u64> {
    let trimmed = location.trim_end_matches('/');
    let (prefix, id) = trimmed.rsplit_once('/')?;
    if !prefix.ends_with("queue/item") {
        return None;
    }
    id.parse().ok()
}

fn jobs_tree(depth: usize) -> String {
    let fields = "name,fullName,url,color,lastBuild[number,result,timestamp,duration]";
    if depth == 0 {
        fields.to_string()
    } else {
        format!("{},jobs[{}]", fields, jobs_tree(depth - 1))
    }
}

fn flatten_jobs(raw: Vec<RawJob>, parent: Option<&str>, out: &mut Vec<Job>) {
    for job in raw {
        let fullname = job.full_name.clone().unwrap_or_else(|| match parent {
            Some(parent) => format!("{}/{}", parent, job.name),
            None => job.name.clone(),
        });

        match job.jobs {
            Some(children) => flatten_jobs(children, Some(&fullname), out),
            None => out.push(Job {
                name: job.name,
                fullname,
                url: job.url,
                color: Color::parse(job.color.as_deref()),
                last_build: job.last_build,
            }),
        }
    }
}

#[async_trait]
impl CiApi for JenkinsClient {
    async fn jobs(&self) -> DeckResult<Vec<Job>> {
        let mut url = self.root_url(&["api", "json"])?;
        url.set_query(Some(&format!("tree=jobs[{}]", jobs_tree(FOLDER_DEPTH))));

        let raw: RawJobList = self.get_json(url).await?;
        let mut jobs = Vec::new();
        flatten_jobs(raw.jobs, None, &mut jobs);
        debug!(count = jobs.len(), "Fetched job inventory");
        Ok(jobs)
    }

    async fn builds(&self, job: &str, limit: u32) -> DeckResult<Vec<Build>> {
        let mut url = self.job_url(job, &["api", "json"])?;
        url.set_query(Some(&format!(
            "tree=builds[number,displayName,url,result,building,timestamp,duration]{{0,{}}}",
            limit
        )));

        let raw: RawBuilds = self.get_json(url).await?;
        Ok(raw.builds)
    }

    async fn stages(&self, job: &str, build: u64) -> DeckResult<Vec<Stage>> {
        let number = build.to_string();
        let url = self.job_url(job, &[&number, "wfapi", "describe"])?;
        let raw: RawDescribe = self.get_json_or_default(url).await?;
        Ok(raw.stages)
    }

    async fn pending_inputs(&self, job: &str, build: u64) -> DeckResult<Vec<PendingInput>> {
        let number = build.to_string();
        let url = self.job_url(job, &[&number, "wfapi", "pendingInputActions"])?;
        self.get_json_or_default(url).await
    }

    async fn nodes(&self) -> DeckResult<Vec<Node>> {
        let mut url = self.root_url(&["computer", "api", "json"])?;
        url.set_query(Some(
            "tree=computer[displayName,offline,temporarilyOffline,idle,numExecutors,offlineCauseReason]",
        ));

        let raw: RawComputers<Node> = self.get_json(url).await?;
        Ok(raw.computer)
    }

    async fn queue(&self) -> DeckResult<Vec<QueueItem>> {
        let mut url = self.root_url(&["queue", "api", "json"])?;
        url.set_query(Some(
            "tree=items[id,why,inQueueSince,stuck,blocked,task[name,url]]",
        ));

        let raw: RawQueue = self.get_json(url).await?;
        Ok(raw
            .items
            .into_iter()
            .map(|item| {
                let task = item.task.unwrap_or_default();
                QueueItem {
                    id: item.id,
                    task_name: task.name,
                    task_url: task.url,
                    why: item.why,
                    in_queue_since: item.in_queue_since,
                    stuck: item.stuck,
                    blocked: item.blocked,
                }
            })
            .collect())
    }

    async fn running_builds(&self) -> DeckResult<Vec<RunningBuild>> {
        let executable = "currentExecutable[number,url,fullDisplayName,timestamp,estimatedDuration]";
        let mut url = self.root_url(&["computer", "api", "json"])?;
        url.set_query(Some(&format!(
            "tree=computer[displayName,executors[{0}],oneOffExecutors[{0}]]",
            executable
        )));

        let raw: RawComputers<RawExecutorHost> = self.get_json(url).await?;

        // Pipeline builds show up on a flyweight executor and again on the agent
        let mut seen = HashSet::new();
        let mut running = Vec::new();
        for computer in raw.computer {
            let executors = computer.executors.into_iter().chain(computer.one_off_executors);
            for executable in executors.filter_map(|e| e.current_executable) {
                if !seen.insert(executable.url.clone()) {
                    continue;
                }
                running.push(RunningBuild {
                    job: path::fullname_from_build_url(&executable.url),
                    number: executable.number,
                    display_name: executable.full_display_name,
                    url: executable.url,
                    node: computer.display_name.clone(),
                    timestamp: executable.timestamp,
                    estimated_duration: executable.estimated_duration,
                });
            }
        }
        Ok(running)
    }

    async fn console_text(&self, job: &str, build: u64, offset: u64) -> DeckResult<ConsoleChunk> {
        let number = build.to_string();
        let mut url = self.job_url(job, &[&number, "logText", "progressiveText"])?;
        url.set_query(Some(&format!("start={}", offset)));

        self.blocking(move |inner| {
            let mut response = inner.get(&url)?;
            let next_offset = header_str(&response, "X-Text-Size")
                .and_then(|v| v.parse().ok());
            let more_data = header_str(&response, "X-More-Data") == Some("true");
            let text = response
                .body_mut()
                .with_config()
                .limit(CONSOLE_LIMIT_BYTES)
                .read_to_string()
                .map_err(|e| request_error(&url, e))?;
            let next_offset = next_offset.unwrap_or(offset + text.len() as u64);
            Ok(ConsoleChunk {
                text,
                next_offset,
                more_data,
            })
        })
        .await
    }

    async fn trigger_build(&self, job: &str, params: &[(String, String)]) -> DeckResult<Option<u64>> {
        let endpoint = if params.is_empty() {
            "build"
        } else {
            "buildWithParameters"
        };
        let url = self.job_url(job, &[endpoint])?;
        let response = self.post(url, params.to_vec()).await?;
        let queue_id = header_str(&response, "Location").and_then(queue_id_from_location);
        debug!(job, ?queue_id, "Triggered build");
        Ok(queue_id)
    }

    async fn stop_build(&self, job: &str, build: u64) -> DeckResult<()> {
        let number = build.to_string();
        let url = self.job_url(job, &[&number, "stop"])?;
        self.post(url, Vec::new()).await?;
        Ok(())
    }

    async fn cancel_queue_item(&self, id: u64) -> DeckResult<()> {
        let mut url = self.root_url(&["queue", "cancelItem"])?;
        url.set_query(Some(&format!("id={}", id)));
        self.post(url, Vec::new()).await?;
        Ok(())
    }

    async fn submit_input(
        &self,
        job: &str,
        build: u64,
        input_id: &str,
        params: &[(String, String)],
    ) -> DeckResult<()> {
        let number = build.to_string();
        if params.is_empty() {
            let url = self.job_url(job, &[&number, "input", input_id, "proceedEmpty"])?;
            self.post(url, Vec::new()).await?;
            return Ok(());
        }

        let parameter: Vec<serde_json::Value> = params
            .iter()
            .map(|(name, value)| serde_json::json!({ "name": name, "value": value }))
            .collect();
        let json = serde_json::json!({ "parameter": parameter }).to_string();

        // `proceed` only has to be present; its value is the button label
        let url = self.job_url(job, &[&number, "input", input_id, "submit"])?;
        let form = vec![
            ("json".to_string(), json),
            ("proceed".to_string(), "Proceed".to_string()),
        ];
        self.post(url, form).await?;
        Ok(())
    }

    async fn abort_input(&self, job: &str, build: u64, input_id: &str) -> DeckResult<()> {
        let number = build.to_string();
        let url = self.job_url(job, &[&number, "input", input_id, "abort"])?;
        self.post(url, Vec::new()).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCrumb {
    crumb: String,
    crumb_request_field: String,
}

#[derive(Deserialize)]
struct RawJobList {
    #[serde(default)]
    jobs: Vec<RawJob>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJob {
    name: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    last_build: Option<BuildSummary>,
    /// Present only on folders
    #[serde(default)]
    jobs: Option<Vec<RawJob>>,
}

#[derive(Deserialize)]
struct RawBuilds {
    #[serde(default)]
    builds: Vec<Build>,
}

#[derive(Default, Deserialize)]
struct RawDescribe {
    #[serde(default)]
    stages: Vec<Stage>,
}

#[derive(Deserialize)]
struct RawComputers<T> {
    #[serde(default = "Vec::new")]
    computer: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExecutorHost {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    executors: Vec<RawExecutor>,
    #[serde(default)]
    one_off_executors: Vec<RawExecutor>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExecutor {
    #[serde(default)]
    current_executable: Option<RawExecutable>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExecutable {
    number: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    full_display_name: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    estimated_duration: i64,
}

#[derive(Deserialize)]
struct RawQueue {
    #[serde(default)]
    items: Vec<RawQueueItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQueueItem {
    id: u64,
    #[serde(default)]
    why: Option<String>,
    #[serde(default)]
    in_queue_since: i64,
    #[serde(default)]
    stuck: bool,
    #[serde(default)]
    blocked: bool,
    #[serde(default)]
    task: Option<RawTask>,
}

#[derive(Default, Deserialize)]
struct RawTask {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
}
