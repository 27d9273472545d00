//! Spinners and the live status line

use super::context::UiContext;
use crate::monitor::GlobalStatus;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner; silent in plain mode
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        }
    }

    /// Remove the spinner without leaving a line behind
    pub fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.clear();
        }
    }
}

/// Bottom line of `deck watch`: tray status plus a ticking spinner.
///
/// Notification lines are printed above it. In plain mode the status is
/// printed as a line whenever it changes.
pub struct StatusLine {
    bar: Option<ProgressBar>,
}

impl StatusLine {
    pub fn new(ctx: &UiContext) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::new_spinner();
            let template = ProgressStyle::with_template("  {spinner:.blue} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
            bar.set_style(template);
            bar.set_message("Waiting for first check...");
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Self { bar }
    }

    /// Print a notification line above the status line
    pub fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }

    pub fn set_status(&self, status: GlobalStatus, jobs: usize) {
        let label = status_label(status);
        match &self.bar {
            Some(bar) => bar.set_message(format!("{} across {} job(s)", label, jobs)),
            None => println!("status: {} ({} jobs)", status.token(), jobs),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

fn status_label(status: GlobalStatus) -> String {
    let text = format!("[{}]", status.token());
    match status {
        GlobalStatus::Failure => style(text).red().bold().to_string(),
        GlobalStatus::Running => style(text).blue().to_string(),
        GlobalStatus::Unstable => style(text).yellow().to_string(),
        GlobalStatus::Success => style(text).green().to_string(),
        GlobalStatus::Neutral => style(text).dim().to_string(),
    }
}
