//! Configuration management for jenkins-deck

pub mod schema;

pub use schema::{Config, MonitorConfig, PollingConfig, ServerConfig, ServerIdentity};

use crate::error::{DeckError, DeckResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jenkins-deck")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jenkins-deck")
    }

    /// Get the notification history path
    pub fn history_path() -> PathBuf {
        Self::state_dir().join("notifications.log")
    }

    /// Load configuration, falling back to defaults if the file does not exist
    pub async fn load(&self) -> DeckResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> DeckResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| DeckError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| DeckError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> DeckResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        self.write(&content).await?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Set a single dotted key (e.g. `server.url`), keeping comments and layout intact
    pub async fn set_value(&self, key: &str, value: &str) -> DeckResult<Config> {
        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| DeckError::ConfigKey(key.to_string()))?;

        let existing = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)
                .await
                .map_err(|e| DeckError::io("reading config for edit", e))?
        } else {
            String::new()
        };

        let mut doc: toml_edit::DocumentMut = existing.parse()?;
        if doc.get(section).is_none() {
            doc[section] = toml_edit::table();
        }

        // "8080" may be meant as a string field; fall back to a plain string
        doc[section][field] = typed_value(value);
        let mut rendered = doc.to_string();
        let parsed = match toml::from_str::<Config>(&rendered) {
            Ok(config) => config,
            Err(_) => {
                doc[section][field] = toml_edit::value(value);
                rendered = doc.to_string();
                toml::from_str(&rendered).map_err(|e| DeckError::ConfigInvalid {
                    path: self.config_path.clone(),
                    reason: e.to_string(),
                })?
            }
        };

        // Reject keys the schema does not know about before touching the file
        if !known_key(&parsed, section, field)? {
            return Err(DeckError::ConfigKey(key.to_string()));
        }

        self.ensure_config_dir().await?;
        self.write(&rendered).await?;
        debug!(key, "Updated configuration value");
        Ok(parsed)
    }

    async fn write(&self, content: &str) -> DeckResult<()> {
        fs::write(&self.config_path, content).await.map_err(|e| {
            DeckError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        // Config holds the API token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, perms)
                .map_err(|e| DeckError::io("setting config file permissions", e))?;
        }

        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> DeckResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DeckError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: std::sync::Arc::new(e),
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpret a CLI string as bool, integer or string
fn typed_value(raw: &str) -> toml_edit::Item {
    if let Ok(b) = raw.parse::<bool>() {
        return toml_edit::value(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return toml_edit::value(n);
    }
    toml_edit::value(raw)
}

fn known_key(config: &Config, section: &str, field: &str) -> DeckResult<bool> {
    let value = toml::Value::try_from(config)?;
    Ok(value
        .get(section)
        .and_then(|s| s.get(field))
        .is_some())
}
