//! Formatting of Jenkins values for tables

use crate::api::{BuildResult, Color, ColorBase, StageStatus};
use chrono::{DateTime, Local, TimeZone, Utc};
use console::{style, StyledObject};

/// Job state as a short styled word
pub fn color(color: Color) -> StyledObject<String> {
    let word = match color.base {
        ColorBase::Success => "success",
        ColorBase::Failure => "failed",
        ColorBase::Unstable => "unstable",
        ColorBase::Aborted => "aborted",
        ColorBase::Disabled => "disabled",
        ColorBase::NotBuilt => "not built",
        ColorBase::Unknown => "unknown",
    };
    let text = if color.running {
        format!("{}*", word)
    } else {
        word.to_string()
    };

    let styled = match color.base {
        ColorBase::Success => style(text).green(),
        ColorBase::Failure => style(text).red(),
        ColorBase::Unstable => style(text).yellow(),
        _ => style(text).dim(),
    };
    if color.running {
        styled.bold()
    } else {
        styled
    }
}

pub fn result(result: Option<BuildResult>, building: bool) -> StyledObject<String> {
    if building {
        return style("building".to_string()).blue().bold();
    }
    match result {
        Some(BuildResult::Success) => style("SUCCESS".to_string()).green(),
        Some(BuildResult::Failure) => style("FAILURE".to_string()).red(),
        Some(BuildResult::Unstable) => style("UNSTABLE".to_string()).yellow(),
        Some(BuildResult::Aborted) => style("ABORTED".to_string()).dim(),
        Some(BuildResult::NotBuilt) => style("NOT_BUILT".to_string()).dim(),
        Some(BuildResult::Unknown) | None => style("-".to_string()).dim(),
    }
}

pub fn stage_status(status: StageStatus) -> StyledObject<String> {
    let text = format!("{:?}", status);
    match status {
        StageStatus::Success => style(text).green(),
        StageStatus::Failed => style(text).red(),
        StageStatus::Unstable => style(text).yellow(),
        StageStatus::InProgress | StageStatus::Queued => style(text).blue(),
        StageStatus::PausedPendingInput => style(text).magenta().bold(),
        _ => style(text).dim(),
    }
}

/// `1h 02m`, `3m 15s`, `42s`
pub fn duration_ms(millis: u64) -> String {
    let secs = millis / 1000;
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{}s", s),
        (0, m, s) => format!("{}m {:02}s", m, s),
        (h, m, _) => format!("{}h {:02}m", h, m),
    }
}

/// Local wall-clock time of a Jenkins epoch-millis timestamp
pub fn timestamp(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(at) if millis > 0 => DateTime::<Local>::from(at).format("%Y-%m-%d %H:%M").to_string(),
        _ => "-".to_string(),
    }
}

/// How long ago, relative to `now`
pub fn age(millis: i64, now: DateTime<Utc>) -> String {
    let elapsed = now.timestamp_millis().saturating_sub(millis).max(0);
    format!("{} ago", duration_ms(elapsed as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(duration_ms(42_000), "42s");
        assert_eq!(duration_ms(195_000), "3m 15s");
        assert_eq!(duration_ms(3_720_000), "1h 02m");
    }

    #[test]
    fn age_is_relative() {
        let now = Utc.timestamp_millis_opt(1_700_000_060_000).single().unwrap();
        assert_eq!(age(1_700_000_000_000, now), "1m 00s ago");
        assert_eq!(age(1_700_000_090_000, now), "0s ago");
    }

    #[test]
    fn missing_timestamp() {
        assert_eq!(timestamp(0), "-");
    }

    #[test]
    fn running_color_is_marked() {
        let text = color(Color::parse(Some("red_anime"))).force_styling(false).to_string();
        assert_eq!(text, "failed*");
    }
}
