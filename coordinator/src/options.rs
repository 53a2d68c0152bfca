use crate::error::BoxError;
use bulwark_logging::{LogTarget, SinkConfig};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_LOG_LEVEL: &str = "debug";
pub const DEFAULT_LOG_PATH: &str = "./project.log";
pub const DEFAULT_MAX_FILE_NUM: usize = 10;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_ERR_CHAN_LEN: usize = 20;

/// Invoked once during shutdown to release application resources.
pub type ReleaseFn = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Ends the process. Receives the exit status.
pub type ExitFn = Arc<dyn Fn(i32) + Send + Sync>;

/// A single option mutator. Mutators are applied in the order given.
pub type OptionFn = Box<dyn FnOnce(&mut Options) + Send>;

/// The configuration a coordinator is built from.
///
/// Nothing is validated here; the level and output are checked when the log
/// sink is bound during [`Coordinator::new`](crate::Coordinator::new).
pub struct Options {
  pub log_level: String,
  pub log_output: LogTarget,
  pub log_path: PathBuf,
  pub log_max_file_num: usize,
  pub log_max_file_size: u64,
  /// Capacity hint for a queued design. The coordinator reports synchronously and ignores it.
  pub err_chan_len: usize,
  pub release_fn: Option<ReleaseFn>,
  pub exit_fn: ExitFn,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      log_level: DEFAULT_LOG_LEVEL.to_string(),
      log_output: LogTarget::Stdout,
      log_path: PathBuf::from(DEFAULT_LOG_PATH),
      log_max_file_num: DEFAULT_MAX_FILE_NUM,
      log_max_file_size: DEFAULT_MAX_FILE_SIZE,
      err_chan_len: DEFAULT_ERR_CHAN_LEN,
      release_fn: None,
      exit_fn: Arc::new(|code| std::process::exit(code)),
    }
  }
}

impl Options {
  /// Defaults overlaid with `option_fns`, applied in order.
  pub fn build<I>(option_fns: I) -> Self
  where
    I: IntoIterator<Item = OptionFn>,
  {
    let mut options = Options::default();
    for option_fn in option_fns {
      option_fn(&mut options);
    }
    options
  }

  /// Splits the options into what the sink needs and what the coordinator keeps.
  pub(crate) fn into_parts(self) -> (SinkConfig, Snapshot, Option<ReleaseFn>, ExitFn) {
    let snapshot = Snapshot {
      log_level: self.log_level.clone(),
      log_path: self.log_path.clone(),
      log_max_file_num: self.log_max_file_num,
      log_max_file_size: self.log_max_file_size,
      err_chan_len: self.err_chan_len,
      has_release_fn: self.release_fn.is_some(),
    };
    let sink_config = SinkConfig {
      level: self.log_level,
      target: self.log_output,
      path: self.log_path,
      max_files: self.log_max_file_num,
      max_file_size: self.log_max_file_size,
    };
    (sink_config, snapshot, self.release_fn, self.exit_fn)
  }
}

impl fmt::Debug for Options {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Options")
      .field("log_level", &self.log_level)
      .field("log_output", &self.log_output)
      .field("log_path", &self.log_path)
      .field("log_max_file_num", &self.log_max_file_num)
      .field("log_max_file_size", &self.log_max_file_size)
      .field("err_chan_len", &self.err_chan_len)
      .field("release_fn", &self.release_fn.as_ref().map(|_| ".."))
      .finish_non_exhaustive()
  }
}

/// Read-only view of the options a coordinator was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
  pub log_level: String,
  pub log_path: PathBuf,
  pub log_max_file_num: usize,
  pub log_max_file_size: u64,
  pub err_chan_len: usize,
  pub has_release_fn: bool,
}

pub fn with_log_level(level: impl Into<String>) -> OptionFn {
  let level = level.into();
  Box::new(move |o| o.log_level = level)
}

pub fn with_log_output(target: LogTarget) -> OptionFn {
  Box::new(move |o| o.log_output = target)
}

pub fn with_log_path(path: impl AsRef<Path>) -> OptionFn {
  let path = path.as_ref().to_path_buf();
  Box::new(move |o| o.log_path = path)
}

/// Maximum number of log files kept on disk. Zero keeps every file.
pub fn with_log_max_file_num(num: usize) -> OptionFn {
  Box::new(move |o| o.log_max_file_num = num)
}

/// Size in bytes at which the active log file is rolled. Zero never rolls.
pub fn with_log_max_file_size(size: u64) -> OptionFn {
  Box::new(move |o| o.log_max_file_size = size)
}

pub fn with_release_fn<F>(release: F) -> OptionFn
where
  F: FnOnce() -> Result<(), BoxError> + Send + 'static,
{
  Box::new(move |o| o.release_fn = Some(Box::new(release)))
}

pub fn with_err_chan_len(len: usize) -> OptionFn {
  Box::new(move |o| o.err_chan_len = len)
}

/// Replaces `std::process::exit` as the final step of a terminal report.
///
/// If the handler returns, the terminal report returns to its caller after
/// the lifecycle is marked terminated.
pub fn with_exit_handler<F>(exit: F) -> OptionFn
where
  F: Fn(i32) + Send + Sync + 'static,
{
  Box::new(move |o| o.exit_fn = Arc::new(exit))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn build_without_options_yields_defaults() {
    let options = Options::build(Vec::new());
    assert_eq!(options.log_level, "debug");
    assert!(matches!(options.log_output, LogTarget::Stdout));
    assert_eq!(options.log_path, PathBuf::from("./project.log"));
    assert_eq!(options.log_max_file_num, 10);
    assert_eq!(options.log_max_file_size, 10_485_760);
    assert_eq!(options.err_chan_len, 20);
    assert!(options.release_fn.is_none());
  }

  #[test]
  fn build_applies_mutators_in_order() {
    let options = Options::build(vec![
      with_log_level("info"),
      with_log_max_file_num(3),
      with_log_level("warn"),
      with_log_output(LogTarget::RollingFile),
      with_log_path("/tmp/app/run.log"),
      with_log_max_file_size(512),
      with_err_chan_len(64),
    ]);
    assert_eq!(options.log_level, "warn");
    assert!(matches!(options.log_output, LogTarget::RollingFile));
    assert_eq!(options.log_path, PathBuf::from("/tmp/app/run.log"));
    assert_eq!(options.log_max_file_num, 3);
    assert_eq!(options.log_max_file_size, 512);
    assert_eq!(options.err_chan_len, 64);
  }

  #[test]
  fn build_does_not_validate() {
    let options = Options::build(vec![with_log_level("nonsense")]);
    assert_eq!(options.log_level, "nonsense");
  }

  #[test]
  fn into_parts_carries_every_field() {
    let options = Options::build(vec![
      with_log_level("error"),
      with_log_path("app.log"),
      with_log_max_file_num(4),
      with_log_max_file_size(99),
      with_release_fn(|| Ok(())),
    ]);
    let (sink_config, snapshot, release_fn, _exit_fn) = options.into_parts();

    assert_eq!(sink_config.level, "error");
    assert_eq!(sink_config.path, PathBuf::from("app.log"));
    assert_eq!(sink_config.max_files, 4);
    assert_eq!(sink_config.max_file_size, 99);
    assert!(release_fn.is_some());
    assert_eq!(
      snapshot,
      Snapshot {
        log_level: "error".to_string(),
        log_path: PathBuf::from("app.log"),
        log_max_file_num: 4,
        log_max_file_size: 99,
        err_chan_len: DEFAULT_ERR_CHAN_LEN,
        has_release_fn: true,
      }
    );
  }
}
