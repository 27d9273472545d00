//! Domain records returned by the Jenkins API
//!
//! Every optional field defaults so that partial responses (a freestyle job
//! with no pipeline data, a node without an offline cause) still decode.

use crate::api::color::Color;
use serde::{Deserialize, Serialize};

/// Leaf job from the flattened inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Short name
    pub name: String,

    /// Slash-separated path through folders
    pub fullname: String,

    pub url: String,

    pub color: Color,

    /// Most recent build, if any
    pub last_build: Option<BuildSummary>,
}

impl Job {
    pub fn last_build_number(&self) -> Option<u64> {
        self.last_build.as_ref().map(|b| b.number)
    }

    pub fn is_running(&self) -> bool {
        self.color.running
    }
}

/// Minimal build reference carried in the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    pub number: u64,
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub duration: u64,
}

/// Final result of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    #[serde(other)]
    Unknown,
}

/// Entry of a job's build history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub number: u64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub duration: u64,
}

/// Status of a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Success,
    Failed,
    Unstable,
    Aborted,
    NotExecuted,
    InProgress,
    PausedPendingInput,
    Queued,
    #[serde(other)]
    Unknown,
}

impl StageStatus {
    /// The stage will not change any more
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Unstable | Self::Aborted | Self::NotExecuted
        )
    }
}

/// One pipeline stage of a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub status: StageStatus,
    #[serde(default)]
    pub start_time_millis: i64,
    #[serde(default)]
    pub duration_millis: u64,
}

/// Every stage is finished; an empty list is not proof of completion
pub fn stages_complete(stages: &[Stage]) -> bool {
    !stages.is_empty() && stages.iter().all(|s| s.status.is_terminal())
}

/// Parameter requested by a pipeline input step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputParameter {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

/// Pipeline paused waiting for a human
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInput {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub proceed_text: String,
    #[serde(default)]
    pub inputs: Vec<InputParameter>,
}

/// Build agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub display_name: String,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub temporarily_offline: bool,
    #[serde(default)]
    pub idle: bool,
    #[serde(default)]
    pub num_executors: u32,
    #[serde(default)]
    pub offline_cause_reason: Option<String>,
}

/// Waiting item in the build queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: u64,
    pub task_name: String,
    pub task_url: String,
    pub why: Option<String>,
    pub in_queue_since: i64,
    pub stuck: bool,
    pub blocked: bool,
}

/// Build currently occupying an executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningBuild {
    /// Job fullname, when it can be derived from the build URL
    pub job: Option<String>,
    pub number: u64,
    pub display_name: String,
    pub url: String,
    pub node: String,
    pub timestamp: i64,
    pub estimated_duration: i64,
}

/// Slice of console output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleChunk {
    pub text: String,
    /// Offset to pass for the next slice
    pub next_offset: u64,
    /// The build is still producing output
    pub more_data: bool,
}

/// `KEY=VALUE` pairs for parameterised builds and inputs
pub type Parameters = Vec<(String, String)>;
