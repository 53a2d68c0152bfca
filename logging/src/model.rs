use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing::Level;
use tracing_core::metadata::LevelFilter;

/// Level names accepted by both the minimum-level filter and the report severity.
pub const SUPPORTED_LEVELS: &[&str] = &["debug", "info", "warn", "error"];

/// The four recognized severities, least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
  Debug,
  Info,
  Warn,
  Error,
}

impl Severity {
  /// Parses a level name. Matching is case-sensitive: `"INFO"` is not a level.
  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "debug" => Some(Severity::Debug),
      "info" => Some(Severity::Info),
      "warn" => Some(Severity::Warn),
      "error" => Some(Severity::Error),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Severity::Debug => "debug",
      Severity::Info => "info",
      Severity::Warn => "warn",
      Severity::Error => "error",
    }
  }

  pub(crate) fn as_level(&self) -> Level {
    match self {
      Severity::Debug => Level::DEBUG,
      Severity::Info => Level::INFO,
      Severity::Warn => Level::WARN,
      Severity::Error => Level::ERROR,
    }
  }

  /// The minimum-level filter that admits this severity and everything above it.
  pub fn as_level_filter(&self) -> LevelFilter {
    LevelFilter::from_level(self.as_level())
  }
}

impl FromStr for Severity {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Severity::parse(s).ok_or_else(|| Error::InvalidLevel {
      value: s.to_string(),
      supported: SUPPORTED_LEVELS,
    })
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
