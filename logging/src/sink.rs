use crate::{
  error::{Error, Result},
  model::Severity,
  roller::{RollingPolicy, RollingWriter},
  writer::SharedWriter,
};

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::Dispatch;

/// Where log lines go.
pub enum LogTarget {
  /// The process's standard output.
  Stdout,
  /// A size and count bounded rolling file at `SinkConfig::path`.
  RollingFile,
  /// A caller-supplied writer.
  Writer(SharedWriter),
  /// A target name that is not recognized. The sink falls back to stdout.
  Unrecognized(String),
}

impl LogTarget {
  pub fn writer<W>(writer: W) -> Self
  where
    W: std::io::Write + Send + 'static,
  {
    LogTarget::Writer(SharedWriter::new(writer))
  }

  /// Maps a target name from configuration. Never fails; unknown names are kept.
  pub fn parse(name: &str) -> Self {
    match name {
      "stdout" | "standard-stream" => LogTarget::Stdout,
      "file" | "rotating-file" => LogTarget::RollingFile,
      other => LogTarget::Unrecognized(other.to_string()),
    }
  }
}

impl FromStr for LogTarget {
  type Err = Infallible;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    Ok(LogTarget::parse(s))
  }
}

impl fmt::Debug for LogTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LogTarget::Stdout => write!(f, "Stdout"),
      LogTarget::RollingFile => write!(f, "RollingFile"),
      LogTarget::Writer(_) => write!(f, "Writer(..)"),
      LogTarget::Unrecognized(name) => write!(f, "Unrecognized({:?})", name),
    }
  }
}

/// Everything needed to bind a sink.
#[derive(Debug)]
pub struct SinkConfig {
  pub level: String,
  pub target: LogTarget,
  pub path: PathBuf,
  pub max_files: usize,
  pub max_file_size: u64,
}

/// What the sink ended up bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
  Stdout,
  RollingFile,
  Writer,
}

impl SinkKind {
  /// Whether output goes to an interactive standard stream.
  pub fn is_stream(&self) -> bool {
    matches!(self, SinkKind::Stdout)
  }
}

/// An owned `tracing` dispatcher plus its writer.
///
/// The dispatcher is never installed as the global default; each write enters
/// it with `dispatcher::with_default`, so several sinks can coexist in one
/// process without fighting over global logging state.
pub struct LogSink {
  dispatch: Dispatch,
  writer: SharedWriter,
  kind: SinkKind,
  level: Severity,
  closed: AtomicBool,
}

impl LogSink {
  /// Binds the output, then validates the level.
  ///
  /// Fails if the rolling file cannot be opened or the level is not one of
  /// `debug|info|warn|error`. An unrecognized target falls back to stdout
  /// with a warning.
  pub fn init(config: SinkConfig) -> Result<Self> {
    let mut unrecognized_target = None;
    let (writer, kind) = match config.target {
      LogTarget::Stdout => (SharedWriter::stdout(), SinkKind::Stdout),
      LogTarget::RollingFile => {
        let policy =
          RollingPolicy::from_path(&config.path, config.max_files, config.max_file_size);
        let roller = RollingWriter::new(policy)?;
        (SharedWriter::new(roller), SinkKind::RollingFile)
      }
      LogTarget::Writer(writer) => (writer, SinkKind::Writer),
      LogTarget::Unrecognized(name) => {
        unrecognized_target = Some(name);
        (SharedWriter::stdout(), SinkKind::Stdout)
      }
    };

    let level: Severity = config.level.parse()?;

    let subscriber = tracing_subscriber::fmt()
      .with_writer(writer.clone())
      .with_max_level(level.as_level_filter())
      .with_ansi(false)
      .with_target(false)
      .without_time()
      .finish();

    let sink = Self {
      dispatch: Dispatch::new(subscriber),
      writer,
      kind,
      level,
      closed: AtomicBool::new(false),
    };

    if let Some(name) = unrecognized_target {
      let _ = sink.warn(&format!(
        "unsupported log output {:?}, falling back to stdout",
        name
      ));
    }

    Ok(sink)
  }

  pub fn kind(&self) -> SinkKind {
    self.kind
  }

  pub fn level(&self) -> Severity {
    self.level
  }

  /// Whether a line at `severity` passes the minimum-level filter.
  pub fn enabled(&self, severity: Severity) -> bool {
    severity >= self.level
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  /// Emits `text` at `severity`. The line is flushed before this returns.
  ///
  /// Fails with `Error::Io` if the underlying writer rejected the line.
  pub fn write(&self, severity: Severity, text: &str) -> Result<()> {
    if self.is_closed() {
      return Err(Error::SinkClosed);
    }

    tracing::dispatcher::with_default(&self.dispatch, || match severity {
      Severity::Debug => tracing::debug!(target: "bulwark", "{}", text),
      Severity::Info => tracing::info!(target: "bulwark", "{}", text),
      Severity::Warn => tracing::warn!(target: "bulwark", "{}", text),
      Severity::Error => tracing::error!(target: "bulwark", "{}", text),
    });
    match self.writer.take_failure() {
      Some(e) => Err(Error::Io(e)),
      None => Ok(()),
    }
  }

  pub fn debug(&self, text: &str) -> Result<()> {
    self.write(Severity::Debug, text)
  }

  pub fn info(&self, text: &str) -> Result<()> {
    self.write(Severity::Info, text)
  }

  pub fn warn(&self, text: &str) -> Result<()> {
    self.write(Severity::Warn, text)
  }

  pub fn error(&self, text: &str) -> Result<()> {
    self.write(Severity::Error, text)
  }

  /// Flushes and closes the sink. Later writes fail with `Error::SinkClosed`.
  /// Closing twice is a no-op.
  pub fn close(&self) -> Result<()> {
    if self.closed.swap(true, Ordering::AcqRel) {
      return Ok(());
    }
    self.writer.flush()?;
    Ok(())
  }
}

impl fmt::Debug for LogSink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LogSink")
      .field("kind", &self.kind)
      .field("level", &self.level)
      .field("closed", &self.is_closed())
      .finish_non_exhaustive()
  }
}
