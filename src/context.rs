//! Composition root
//!
//! One `DeckContext` per configured server connection. It owns the API
//! client, the response cache with its request coordinator, and the change
//! detector's memory, and keeps all of them consistent when the server
//! configuration changes.

use crate::api::{CiApi, JenkinsClient};
use crate::cache::{RequestCoordinator, ResponseCache, TtlPolicy};
use crate::config::{Config, ServerConfig, ServerIdentity};
use crate::error::DeckResult;
use crate::monitor::MonitorState;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Builds the API client for a server configuration
pub type ApiFactory = Arc<dyn Fn(&ServerConfig) -> DeckResult<Arc<dyn CiApi>> + Send + Sync>;

struct Connection {
    config: Config,
    identity: ServerIdentity,
    client: Option<Arc<dyn CiApi>>,
}

pub struct DeckContext {
    connection: Mutex<Connection>,
    coordinator: RequestCoordinator,
    monitor: Mutex<MonitorState>,
    factory: ApiFactory,
}

impl DeckContext {
    /// Context talking to Jenkins over HTTP
    pub fn new(config: Config) -> Self {
        Self::with_factory(config, Arc::new(jenkins_factory))
    }

    /// Context with a custom client factory
    pub fn with_factory(config: Config, factory: ApiFactory) -> Self {
        let identity = config.server.identity();
        Self {
            connection: Mutex::new(Connection {
                config,
                identity,
                client: None,
            }),
            coordinator: RequestCoordinator::new(Arc::new(ResponseCache::new())),
            monitor: Mutex::new(MonitorState::new()),
            factory,
        }
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Detector memory; never hold the guard across an await
    pub(crate) fn monitor_state(&self) -> MutexGuard<'_, MonitorState> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> Config {
        self.connection().config.clone()
    }

    pub fn ttl(&self) -> TtlPolicy {
        TtlPolicy::from_config(&self.connection().config.cache)
    }

    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    /// The API client, built on first use.
    ///
    /// Fails with `NotConfigured` until a server URL is set.
    pub fn api(&self) -> DeckResult<Arc<dyn CiApi>> {
        self.api_with_epoch().map(|(client, _)| client)
    }

    /// The API client together with the coordinator epoch it belongs to.
    ///
    /// Both are read under the connection lock, so a fetch prepared from the
    /// pair can never be cached against a different server.
    pub fn api_with_epoch(&self) -> DeckResult<(Arc<dyn CiApi>, u64)> {
        let mut connection = self.connection();
        let epoch = self.coordinator.epoch();
        let client = match &connection.client {
            Some(client) => Arc::clone(client),
            None => {
                let client = (self.factory)(&connection.config.server)?;
                debug!("API client created for server {}", connection.identity.short());
                connection.client = Some(Arc::clone(&client));
                client
            }
        };
        Ok((client, epoch))
    }

    /// Apply a new configuration.
    ///
    /// When the server identity changes, the client, every cached response,
    /// every in-flight fetch and the detector's memory are dropped together.
    /// Returns whether the identity changed.
    pub fn reconfigure(&self, config: Config) -> bool {
        let identity = config.server.identity();
        let mut connection = self.connection();
        let changed = connection.identity != identity;

        if changed {
            let mut monitor = self.monitor_state();
            connection.client = None;
            self.coordinator.clear();
            monitor.reset();
            info!(
                "Server changed ({} -> {}), cleared cached state",
                connection.identity.short(),
                identity.short()
            );
        }

        connection.identity = identity;
        connection.config = config;
        changed
    }
}

fn jenkins_factory(server: &ServerConfig) -> DeckResult<Arc<dyn CiApi>> {
    Ok(Arc::new(JenkinsClient::new(server)?))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::fake::{input, job, FakeApi};
    use crate::error::DeckError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub(crate) fn configured(url: &str) -> Config {
        let mut config = Config::default();
        config.server.url = url.to_string();
        config
    }

    /// Context whose every client is the given fake
    pub(crate) fn fake_context(config: Config, api: Arc<FakeApi>) -> DeckContext {
        DeckContext::with_factory(
            config,
            Arc::new(move |server: &ServerConfig| {
                if !server.is_configured() {
                    return Err(DeckError::NotConfigured);
                }
                Ok(Arc::clone(&api) as Arc<dyn CiApi>)
            }),
        )
    }

    #[test]
    fn unconfigured_server_fails_fast() {
        let context = fake_context(Config::default(), Arc::new(FakeApi::new()));
        assert!(context.api().err().is_some_and(|e| e.is_not_configured()));
    }

    #[test]
    fn client_built_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let context = DeckContext::with_factory(
            configured("https://ci.example.com"),
            Arc::new(move |_: &ServerConfig| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(FakeApi::new()) as Arc<dyn CiApi>)
            }),
        );

        context.api().unwrap();
        context.api().unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn same_server_keeps_cache() {
        let context = fake_context(configured("https://ci.example.com"), Arc::new(FakeApi::new()));
        context
            .coordinator()
            .cache()
            .set("jobs:all", 1u8, Duration::from_secs(60));

        let mut config = configured("https://ci.example.com/");
        config.cache.jobs_ttl_secs = 5;
        assert!(!context.reconfigure(config));

        assert_eq!(context.coordinator().cache().get::<u8>("jobs:all"), Some(1));
        assert_eq!(context.ttl().jobs, Duration::from_secs(5));
    }

    #[test]
    fn server_change_clears_cache_and_detector() {
        let context = fake_context(configured("https://ci-a.example.com"), Arc::new(FakeApi::new()));
        context
            .coordinator()
            .cache()
            .set("jobs:all", 1u8, Duration::from_secs(60));
        {
            let mut monitor = context.monitor_state();
            monitor.observe_inventory(&[job("A", "blue_anime", Some(1))]);
            monitor.observe_inputs("A", 1, &[input("go")]);
        }

        assert!(context.reconfigure(configured("https://ci-b.example.com")));

        assert!(context.coordinator().cache().is_empty());
        let mut monitor = context.monitor_state();
        assert!(monitor.job("A").is_none());
        assert_eq!(monitor.observe_inputs("A", 1, &[input("go")]).len(), 1);
    }

    #[tokio::test]
    async fn client_taken_before_server_change_never_fills_cache() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("old-server-job", "blue", Some(1))]);
        let context = fake_context(configured("https://ci-a.example.com"), Arc::clone(&api));

        let (client, epoch) = context.api_with_epoch().unwrap();
        assert!(context.reconfigure(configured("https://ci-b.example.com")));

        let jobs = context
            .coordinator()
            .cached_fetch_since(
                epoch,
                "jobs:all",
                |_: &Vec<crate::api::Job>| Duration::from_secs(60),
                move || async move { client.jobs().await },
            )
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(context.coordinator().cache().is_empty());
    }

    #[test]
    fn token_change_counts_as_new_server() {
        let context = fake_context(configured("https://ci.example.com"), Arc::new(FakeApi::new()));
        let mut config = configured("https://ci.example.com");
        config.server.username = "deploy".to_string();
        config.server.api_token = "t0k3n".to_string();
        assert!(context.reconfigure(config));
    }
}
