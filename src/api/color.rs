//! Jenkins color codes
//!
//! Jenkins encodes job state as a color string: a base token for the last
//! completed result, suffixed with `_anime` while a build is executing.
//! The string is parsed once here; nothing else in the crate looks at it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const RUNNING_SUFFIX: &str = "_anime";

/// Result of the last completed build, as carried by the color code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorBase {
    Success,
    Failure,
    Unstable,
    Aborted,
    Disabled,
    NotBuilt,
    /// Any token we do not recognise
    Unknown,
}

impl ColorBase {
    fn parse(token: &str) -> Self {
        match token {
            "blue" | "green" => Self::Success,
            "red" => Self::Failure,
            "yellow" => Self::Unstable,
            "aborted" => Self::Aborted,
            "disabled" => Self::Disabled,
            "" | "notbuilt" | "nobuilt" | "grey" => Self::NotBuilt,
            _ => Self::Unknown,
        }
    }

    fn token(self) -> &'static str {
        match self {
            Self::Success => "blue",
            Self::Failure => "red",
            Self::Unstable => "yellow",
            Self::Aborted => "aborted",
            Self::Disabled => "disabled",
            Self::NotBuilt | Self::Unknown => "notbuilt",
        }
    }
}

/// Parsed color code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Result of the last completed build
    pub base: ColorBase,
    /// A build is executing right now
    pub running: bool,
}

impl Color {
    pub const NOT_BUILT: Color = Color {
        base: ColorBase::NotBuilt,
        running: false,
    };

    pub fn new(base: ColorBase, running: bool) -> Self {
        Self { base, running }
    }

    /// Parse a raw Jenkins color string; `None` means "never built"
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::NOT_BUILT;
        };
        let raw = raw.trim().to_ascii_lowercase();
        match raw.strip_suffix(RUNNING_SUFFIX) {
            Some(base) => Self::new(ColorBase::parse(base), true),
            None => Self::new(ColorBase::parse(&raw), false),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::NOT_BUILT
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.token())?;
        if self.running {
            f.write_str(RUNNING_SUFFIX)?;
        }
        Ok(())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Color::parse(raw.as_deref()))
    }
}
