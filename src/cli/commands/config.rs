//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{DeckError, DeckResult};
use crate::ui::{self, UiContext};

const REDACTED: &str = "********";

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> DeckResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init {
            url,
            username,
            api_token,
            force,
        }) => init_config(manager, url, username, api_token, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> DeckResult<()> {
    println!("{}", toml::to_string_pretty(&redacted(config))?);
    Ok(())
}

fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if !shown.server.api_token.is_empty() {
        shown.server.api_token = REDACTED.to_string();
    }
    shown
}

async fn init_config(
    manager: &ConfigManager,
    url: Option<String>,
    username: Option<String>,
    api_token: Option<String>,
    force: bool,
) -> DeckResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    ui::intro(&ctx, "Jenkins Deck setup");

    let mut config = Config::default();
    config.server.url = match url {
        Some(url) => url,
        None => ui::text(&ctx, "Jenkins URL", "https://jenkins.example.com", false)
            .await?
            .unwrap_or_default(),
    };
    if !config.server.url.is_empty() {
        crate::api::path::base_url(&config.server.url)?;
    }
    config.server.username = match username {
        Some(username) => username,
        None => ui::text(&ctx, "User name (empty for anonymous)", "", false)
            .await?
            .unwrap_or_default(),
    };
    config.server.api_token = match api_token {
        Some(token) => token,
        None if !config.server.username.is_empty() => ui::text(&ctx, "API token", "", true)
            .await?
            .unwrap_or_default(),
        None => String::new(),
    };

    manager.save(&config).await?;

    ui::step_ok_detail(&ctx, "Configuration written", &path.display().to_string());
    if !config.server.is_configured() {
        ui::remark(&ctx, "No server yet: deck config set server.url <url>");
    }
    Ok(())
}

async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> DeckResult<()> {
    let ctx = UiContext::detect();

    match manager.set_value(key, value).await {
        Ok(_) => {
            let shown = if key == "server.api_token" { REDACTED } else { value };
            ui::step_ok(&ctx, &format!("Set {} = {}", key, shown));
            Ok(())
        }
        Err(DeckError::ConfigKey(_)) => {
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for valid in valid_keys() {
                eprintln!("  {}", valid);
            }
            Err(DeckError::ConfigKey(key.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Every settable `section.field`, read off the default configuration
fn valid_keys() -> Vec<String> {
    let Ok(toml::Value::Table(sections)) = toml::Value::try_from(Config::default()) else {
        return Vec::new();
    };

    let mut keys = Vec::new();
    for (section, fields) in sections {
        if let toml::Value::Table(fields) = fields {
            keys.extend(fields.keys().map(|field| format!("{}.{}", section, field)));
        }
    }
    keys
}
