//! Terminal output
//!
//! Uses `cliclack` for framed output and prompts, `indicatif` for the live
//! status line of `deck watch`, and falls back to plain lines in CI or
//! when stdout is not a terminal.

mod context;
pub mod format;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, outro, remark, step_error_detail, step_info, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::{StatusLine, TaskSpinner};
pub use prompts::{confirm, text};
pub use theme::{init_theme, DeckTheme};
