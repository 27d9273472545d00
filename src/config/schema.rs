//! Configuration schema for jenkins-deck
//!
//! Configuration is stored at `~/.config/jenkins-deck/config.toml`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Jenkins server connection
    pub server: ServerConfig,

    /// Response cache TTLs
    pub cache: CacheConfig,

    /// Background build monitor
    pub monitor: MonitorConfig,

    /// Foreground polling intervals
    pub polling: PollingConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record emitted notifications to the history log
    pub history: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            history: true,
        }
    }
}

/// Jenkins server connection settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. `https://ci.example.com/`
    pub url: String,

    /// Jenkins user name
    pub username: String,

    /// Jenkins API token
    pub api_token: String,

    /// Per-request timeout in seconds (0 = no timeout)
    pub timeout_secs: u64,

    /// Send a CSRF crumb with mutating requests
    pub use_crumb: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("use_crumb", &self.use_crumb)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            api_token: String::new(),
            timeout_secs: 30,
            use_crumb: true,
        }
    }
}

impl ServerConfig {
    /// A server is configured once it has a URL
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Request timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Fingerprint of everything that decides which server we talk to and as whom
    pub fn identity(&self) -> ServerIdentity {
        let mut hasher = Sha256::new();
        hasher.update(self.url.trim().trim_end_matches('/').as_bytes());
        hasher.update([0u8]);
        hasher.update(self.username.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.api_token.as_bytes());
        ServerIdentity(hex::encode(hasher.finalize()))
    }
}

/// Opaque server identity; a change means every cached view is stale
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerIdentity(String);

impl ServerIdentity {
    /// Short form for log lines
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

/// Response cache TTLs, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Full job inventory
    pub jobs_ttl_secs: u64,

    /// Node / executor list
    pub nodes_ttl_secs: u64,

    /// Queue contents
    pub queue_ttl_secs: u64,

    /// Build history of one job
    pub builds_ttl_secs: u64,

    /// Builds currently executing on any node
    pub running_ttl_secs: u64,

    /// Stage list while the build is still in progress
    pub stages_running_ttl_secs: u64,

    /// Stage list once every stage is terminal
    pub stages_complete_ttl_secs: u64,

    /// Pending input list of one build
    pub inputs_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            jobs_ttl_secs: 30,
            nodes_ttl_secs: 15,
            queue_ttl_secs: 10,
            builds_ttl_secs: 20,
            running_ttl_secs: 10,
            stages_running_ttl_secs: 10,
            stages_complete_ttl_secs: 24 * 60 * 60,
            inputs_ttl_secs: 5,
        }
    }
}

/// Background build monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Run the monitor at all
    pub enabled: bool,

    /// Delay before the first poll
    pub initial_delay_secs: u64,

    /// Interval between polls
    pub interval_secs: u64,

    /// Also notify when a build succeeds
    pub notify_success: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_secs: 5,
            interval_secs: 30,
            notify_success: true,
        }
    }
}

impl MonitorConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Foreground polling intervals, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Dashboard job list
    pub jobs_secs: u64,

    /// Build history while a build is running
    pub builds_running_secs: u64,

    /// Build history once every build is finished
    pub builds_idle_secs: u64,

    /// Queue view
    pub queue_secs: u64,

    /// Node view
    pub nodes_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            jobs_secs: 30,
            builds_running_secs: 5,
            builds_idle_secs: 30,
            queue_secs: 10,
            nodes_secs: 15,
        }
    }
}
