//! Decide between fancy and plain terminal output

use crate::cli::args::OutputFormat;
use std::io::IsTerminal;

/// Environment variables set by common CI systems, Jenkins agents included
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "JENKINS_URL",
    "BUILD_NUMBER",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// Output behavior for one command invocation
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
    auto_yes: bool,
    format: OutputFormat,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: detect_interactive(),
            auto_yes: false,
            format: OutputFormat::Table,
        }
    }

    /// Plain output, no prompts (tests, pipes)
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
            format: OutputFormat::Table,
        }
    }

    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    /// Machine-readable formats switch off spinners and decorations
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Spinners, colors and cliclack framing
    pub fn use_fancy_output(&self) -> bool {
        self.interactive && self.format == OutputFormat::Table
    }
}

fn detect_interactive() -> bool {
    if !std::io::stdout().is_terminal() || !std::io::stdin().is_terminal() {
        return false;
    }
    !CI_VARS.iter().any(|var| std::env::var_os(var).is_some())
}
