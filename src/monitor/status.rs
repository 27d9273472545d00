//! Aggregate tray status

use crate::api::{Color, ColorBase};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One status summarizing every job on the server
///
/// Ordered by priority: a single failing job outranks any number of
/// running, unstable or green ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalStatus {
    Failure,
    Running,
    Unstable,
    Success,
    Neutral,
}

impl GlobalStatus {
    /// Reduce job colors to the highest-priority status
    pub fn from_colors<I>(colors: I) -> Self
    where
        I: IntoIterator<Item = Color>,
    {
        let mut failed = false;
        let mut running = false;
        let mut unstable = false;
        let mut success = false;

        for color in colors {
            running |= color.running;
            match color.base {
                ColorBase::Failure => failed = true,
                ColorBase::Unstable => unstable = true,
                ColorBase::Success => success = true,
                _ => {}
            }
        }

        if failed {
            Self::Failure
        } else if running {
            Self::Running
        } else if unstable {
            Self::Unstable
        } else if success {
            Self::Success
        } else {
            Self::Neutral
        }
    }

    /// Icon token understood by the tray
    pub fn token(self) -> &'static str {
        match self {
            Self::Failure => "red",
            Self::Running => "blue",
            Self::Unstable => "yellow",
            Self::Success => "green",
            Self::Neutral => "grey",
        }
    }
}

impl fmt::Display for GlobalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(colors: &[&str]) -> GlobalStatus {
        GlobalStatus::from_colors(colors.iter().map(|c| Color::parse(Some(c))))
    }

    #[test]
    fn failure_outranks_everything() {
        assert_eq!(status(&["red", "blue_anime", "blue"]).token(), "red");
        assert_eq!(status(&["red_anime", "yellow"]), GlobalStatus::Failure);
    }

    #[test]
    fn running_outranks_unstable_and_success() {
        assert_eq!(status(&["blue_anime", "blue"]).token(), "blue");
        assert_eq!(status(&["yellow", "notbuilt_anime"]), GlobalStatus::Running);
    }

    #[test]
    fn unstable_then_success() {
        assert_eq!(status(&["yellow", "blue"]).token(), "yellow");
        assert_eq!(status(&["blue", "disabled"]).token(), "green");
    }

    #[test]
    fn nothing_meaningful_is_neutral() {
        assert_eq!(status(&[]).token(), "grey");
        assert_eq!(status(&["disabled", "notbuilt", "aborted"]).token(), "grey");
    }
}
