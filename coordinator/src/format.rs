use chrono::{DateTime, Local};
use std::error::Error as StdError;
use std::fmt::{self, Write};

/// Width the module name is truncated and padded to.
pub const MODULE_WIDTH: usize = 10;

const HIGHLIGHT: &str = "\x1b[97;104m";
const RESET: &str = "\x1b[0m";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The module name as displayed: at most `MODULE_WIDTH` characters.
pub fn display_module(module: &str) -> &str {
  match module.char_indices().nth(MODULE_WIDTH) {
    Some((end, _)) => &module[..end],
    None => module,
  }
}

/// Iterates an error and its `source()` chain, outermost first.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
  next: Option<&'a (dyn StdError + 'static)>,
}

impl<'a> Chain<'a> {
  pub fn new(err: &'a (dyn StdError + 'static)) -> Self {
    Self { next: Some(err) }
  }
}

impl<'a> Iterator for Chain<'a> {
  type Item = &'a (dyn StdError + 'static);

  fn next(&mut self) -> Option<Self::Item> {
    let current = self.next?;
    self.next = current.source();
    Some(current)
  }
}

/// The innermost error of the chain.
pub fn root_cause<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
  Chain::new(err).last().unwrap_or(err)
}

/// Formats report lines. `highlight` draws the module band used on terminals.
#[derive(Debug, Clone, Copy)]
pub struct LineFormatter {
  highlight: bool,
}

impl LineFormatter {
  pub fn new(highlight: bool) -> Self {
    Self { highlight }
  }

  fn prefix(&self, module: &str, now: DateTime<Local>) -> String {
    let timestamp = now.format(TIMESTAMP_FORMAT);
    let module = display_module(module);
    if self.highlight {
      format!(
        "{} {} {:<width$} {}",
        timestamp,
        HIGHLIGHT,
        module,
        RESET,
        width = MODULE_WIDTH
      )
    } else {
      format!("{} {:<width$}", timestamp, module, width = MODULE_WIDTH)
    }
  }

  /// `<timestamp> <module> <text>` on one line.
  pub fn message(&self, module: &str, text: impl fmt::Display, now: DateTime<Local>) -> String {
    format!("{} {}", self.prefix(module, now), text)
  }

  /// `<timestamp> <module> <root cause>` on one line.
  pub fn condensed(&self, module: &str, err: &(dyn StdError + 'static), now: DateTime<Local>) -> String {
    self.message(module, root_cause(err), now)
  }

  /// The prefix line, then every layer of the chain on its own line.
  pub fn full_chain(&self, module: &str, err: &(dyn StdError + 'static), now: DateTime<Local>) -> String {
    let mut out = self.prefix(module, now);
    for layer in Chain::new(err) {
      let _ = write!(out, "\n{}", layer);
    }
    out
  }

  /// A condensed line tagged with the severity nobody recognized.
  pub fn unsupported(
    &self,
    severity: &str,
    module: &str,
    err: &(dyn StdError + 'static),
    now: DateTime<Local>,
  ) -> String {
    format!(
      "[unsupported severity: {}] {}",
      severity,
      self.condensed(module, err, now)
    )
  }
}
