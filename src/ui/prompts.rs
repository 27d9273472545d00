//! Interactive prompts with non-interactive fallback

use super::context::UiContext;
use crate::error::{DeckError, DeckResult};

/// Ask for confirmation.
///
/// Auto-yes approves; a non-interactive session gets `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> DeckResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || cliclack::confirm(&message).initial_value(default).interact())
        .await
        .map_err(|e| DeckError::User(format!("Prompt task failed: {}", e)))?
        .map_err(|e| DeckError::User(format!("Prompt failed: {}", e)))
}

/// Ask for a line of text; `None` when the session is not interactive
pub async fn text(
    ctx: &UiContext,
    message: &str,
    placeholder: &str,
    secret: bool,
) -> DeckResult<Option<String>> {
    if !ctx.is_interactive() {
        return Ok(None);
    }

    let message = message.to_string();
    let placeholder = placeholder.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        if secret {
            cliclack::password(&message).mask('*').interact()
        } else {
            cliclack::input(&message)
                .placeholder(&placeholder)
                .required(false)
                .interact::<String>()
        }
    })
    .await
    .map_err(|e| DeckError::User(format!("Prompt task failed: {}", e)))?
    .map_err(|e| DeckError::User(format!("Prompt failed: {}", e)))?;

    let answer = answer.trim().to_string();
    Ok((!answer.is_empty()).then_some(answer))
}
