use crate::{
  context::{ExitRole, InflightGuard, Phase, ShutdownContext},
  error::Result,
  format::LineFormatter,
  options::{ExitFn, OptionFn, Options, ReleaseFn, Snapshot},
};

use bulwark_logging::{LogSink, Severity, SinkKind};
use chrono::Local;
use parking_lot::Mutex;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Exit status of every terminal report.
pub const EXIT_STATUS: i32 = 1;

/// Module name the coordinator uses for its own lines.
const SELF_MODULE: &str = "bulwark";

/// One call to [`Coordinator::error_transmit`], consumed by formatting.
#[derive(Debug, Clone, Copy)]
struct Report<'a> {
  module: &'a str,
  severity: &'a str,
  err: &'a (dyn StdError + 'static),
  print_stack: bool,
}

/// Centralized error reporting with an ordered, at-most-once shutdown.
///
/// Reports are handled on the calling thread. Every call registers itself as
/// in-flight work for its duration, so a terminal report can wait for all
/// concurrently started reports before tearing the process down.
pub struct Coordinator {
  sink: LogSink,
  formatter: LineFormatter,
  ctx: Arc<ShutdownContext>,
  release_fn: Mutex<Option<ReleaseFn>>,
  exit_fn: ExitFn,
  snapshot: Snapshot,
}

impl Coordinator {
  /// Builds a coordinator from defaults overlaid with `option_fns`.
  ///
  /// `parent` cancels the worker lifecycle token when it is cancelled. Fails if
  /// the log level is not recognized or the rolling log file cannot be opened.
  pub fn new<I>(parent: Option<&CancellationToken>, option_fns: I) -> Result<Self>
  where
    I: IntoIterator<Item = OptionFn>,
  {
    Self::with_options(parent, Options::build(option_fns))
  }

  pub fn with_options(parent: Option<&CancellationToken>, options: Options) -> Result<Self> {
    let (sink_config, snapshot, release_fn, exit_fn) = options.into_parts();
    let sink = LogSink::init(sink_config)?;
    let formatter = LineFormatter::new(sink.kind().is_stream());

    Ok(Self {
      sink,
      formatter,
      ctx: ShutdownContext::new(parent),
      release_fn: Mutex::new(release_fn),
      exit_fn,
      snapshot,
    })
  }

  /// Reports `err` from `module` at `severity`.
  ///
  /// * `severity` is one of `debug|info|warn|error`; anything else is logged at
  ///   error level, tagged as unsupported.
  /// * `None` is ignored entirely, even when `exit_after_print` is set.
  /// * `print_stack` prints every layer of the `source()` chain instead of the
  ///   root cause only.
  /// * `exit_after_print` makes the call terminal: after the line is written
  ///   the release callback runs, the worker token is cancelled, in-flight work
  ///   drains and the process exits with [`EXIT_STATUS`].
  ///
  /// A terminal call waits for every [`track_worker`](Self::track_worker)
  /// guard, so it must not be made while the calling thread holds one. Use
  /// [`error_transmit_tracked`](Self::error_transmit_tracked) there instead.
  pub fn error_transmit(
    &self,
    module: &str,
    severity: &str,
    err: Option<&(dyn StdError + 'static)>,
    exit_after_print: bool,
    print_stack: bool,
  ) {
    let Some(err) = err else {
      return;
    };

    self.transmit(&Report {
      module,
      severity,
      err,
      print_stack,
    });

    if exit_after_print {
      self.terminate();
    }
  }

  /// [`error_transmit`](Self::error_transmit) for a thread that holds a
  /// [`track_worker`](Self::track_worker) guard.
  ///
  /// The report is written while `guard` is still registered. A terminal call
  /// then gives the guard up before shutting down, so the drain does not wait
  /// on the caller itself, and returns `None`. Otherwise the guard is handed
  /// back.
  pub fn error_transmit_tracked(
    &self,
    guard: InflightGuard,
    module: &str,
    severity: &str,
    err: Option<&(dyn StdError + 'static)>,
    exit_after_print: bool,
    print_stack: bool,
  ) -> Option<InflightGuard> {
    let Some(err) = err else {
      return Some(guard);
    };

    self.transmit(&Report {
      module,
      severity,
      err,
      print_stack,
    });

    if !exit_after_print {
      return Some(guard);
    }
    drop(guard);
    self.terminate();
    None
  }

  /// Application-initiated graceful shutdown.
  ///
  /// Runs the release callback, cancels the worker token, waits for in-flight
  /// work and closes the sink. Only the first call (or terminal report) does
  /// anything; the process keeps running.
  pub fn resource_release(&self) {
    if self.ctx.begin_release() {
      self.release_resources();
    }
  }

  /// Token cancelled when application background work should stop.
  pub fn worker_token(&self) -> CancellationToken {
    self.ctx.worker_token().clone()
  }

  /// Token cancelled as soon as teardown starts.
  pub fn teardown_token(&self) -> CancellationToken {
    self.ctx.teardown_token().clone()
  }

  /// Registers application work that teardown must wait for.
  ///
  /// Hold the guard until the work finishes. Returns `None` once the
  /// coordinator has been released. A thread holding the guard reports
  /// terminal errors through
  /// [`error_transmit_tracked`](Self::error_transmit_tracked); a plain terminal
  /// [`error_transmit`](Self::error_transmit) would wait on its own guard.
  pub fn track_worker(&self) -> Option<InflightGuard> {
    self.ctx.enter()
  }

  pub fn phase(&self) -> Phase {
    self.ctx.phase()
  }

  pub fn options(&self) -> &Snapshot {
    &self.snapshot
  }

  pub fn sink_kind(&self) -> SinkKind {
    self.sink.kind()
  }

  fn render(&self, report: &Report<'_>) -> Option<(Severity, String)> {
    let now = Local::now();
    match Severity::parse(report.severity) {
      Some(severity) => {
        if !self.sink.enabled(severity) {
          return None;
        }
        let text = if report.print_stack {
          self.formatter.full_chain(report.module, report.err, now)
        } else {
          self.formatter.condensed(report.module, report.err, now)
        };
        Some((severity, text))
      }
      None => Some((
        Severity::Error,
        self
          .formatter
          .unsupported(report.severity, report.module, report.err, now),
      )),
    }
  }

  fn transmit(&self, report: &Report<'_>) {
    match self.ctx.enter() {
      Some(guard) => {
        self.log_report(report);
        drop(guard);
      }
      None => diagnostic(format_args!(
        "log sink already released, report from {:?} dropped: {}",
        report.module, report.err
      )),
    }
  }

  fn log_report(&self, report: &Report<'_>) {
    let Some((severity, text)) = self.render(report) else {
      return;
    };
    if let Err(e) = self.sink.write(severity, &text) {
      diagnostic(format_args!(
        "failed to log report from {:?}: {}",
        report.module, e
      ));
    }
  }

  fn log_own(&self, severity: Severity, text: impl fmt::Display) {
    let line = self.formatter.message(SELF_MODULE, text, Local::now());
    if let Err(e) = self.sink.write(severity, &line) {
      diagnostic(format_args!("failed to log: {}", e));
    }
  }

  fn terminate(&self) {
    match self.ctx.begin_exit() {
      ExitRole::Owner => {
        self.release_resources();
        self.exit();
      }
      ExitRole::ExitOnly => self.exit(),
      ExitRole::Wait => self.ctx.wait_terminated(),
    }
  }

  /// Steps shared by terminal and manual teardown. Callers hold the gate.
  fn release_resources(&self) {
    self.run_release_fn();
    self.ctx.cancel_workers();
    self.ctx.drain();

    self.log_own(Severity::Info, "coordinator stopped");
    if let Err(e) = self.sink.close() {
      diagnostic(format_args!("failed to flush log sink: {}", e));
    }
    self.ctx.mark_released();
  }

  /// Runs the release callback once. A failure or a panic is logged and
  /// teardown carries on.
  fn run_release_fn(&self) {
    let Some(release) = self.release_fn.lock().take() else {
      return;
    };
    match panic::catch_unwind(AssertUnwindSafe(release)) {
      Ok(Ok(())) => {}
      Ok(Err(e)) => self.log_own(Severity::Error, format_args!("resource release failed: {}", e)),
      Err(payload) => self.log_own(
        Severity::Error,
        format_args!("resource release panicked: {}", panic_message(&*payload)),
      ),
    }
  }

  fn exit(&self) {
    (self.exit_fn)(EXIT_STATUS);
    // Only reached when an injected exit handler returns.
    self.ctx.mark_terminated();
  }
}

impl fmt::Debug for Coordinator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Coordinator")
      .field("sink", &self.sink)
      .field("ctx", &self.ctx)
      .field("snapshot", &self.snapshot)
      .finish_non_exhaustive()
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message
  } else {
    "non-string panic payload"
  }
}

/// Last-resort channel for failures the sink itself cannot report.
fn diagnostic(args: fmt::Arguments<'_>) {
  eprintln!("[bulwark:WARN] {}", args);
}
