use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where the coordinator is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
  /// Accepting reports.
  Running,
  /// Teardown started. Reports are still accepted until in-flight work drains.
  Draining,
  /// Release callback ran, workers cancelled, in-flight work drained, sink closed.
  Released,
  /// The exit hook has been called.
  Terminated,
}

/// What a terminal caller has to do once its own report is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitRole {
  /// Run the whole teardown and exit.
  Owner,
  /// A manual release already tore things down; only the exit is left.
  ExitOnly,
  /// Another terminal caller owns the exit; wait for it.
  Wait,
}

#[derive(Debug)]
struct Lifecycle {
  phase: Phase,
  inflight: usize,
  // Set once drained; no new work may register after that.
  sealed: bool,
  exiting: bool,
}

/// Two cancellation tokens and a drainable in-flight counter.
///
/// `teardown` is cancelled the moment teardown starts. `workers` is a child of
/// the parent token handed to the coordinator and is the only signal offered to
/// application background work.
pub struct ShutdownContext {
  teardown: CancellationToken,
  workers: CancellationToken,
  lifecycle: Mutex<Lifecycle>,
  changed: Condvar,
}

impl ShutdownContext {
  pub(crate) fn new(parent: Option<&CancellationToken>) -> Arc<Self> {
    Arc::new(Self {
      teardown: CancellationToken::new(),
      workers: parent.map(CancellationToken::child_token).unwrap_or_default(),
      lifecycle: Mutex::new(Lifecycle {
        phase: Phase::Running,
        inflight: 0,
        sealed: false,
        exiting: false,
      }),
      changed: Condvar::new(),
    })
  }

  pub fn teardown_token(&self) -> &CancellationToken {
    &self.teardown
  }

  pub fn worker_token(&self) -> &CancellationToken {
    &self.workers
  }

  pub fn phase(&self) -> Phase {
    self.lifecycle.lock().phase
  }

  pub fn inflight(&self) -> usize {
    self.lifecycle.lock().inflight
  }

  /// Registers one unit of in-flight work. `None` once teardown has drained.
  pub fn enter(self: &Arc<Self>) -> Option<InflightGuard> {
    let mut lifecycle = self.lifecycle.lock();
    if lifecycle.sealed {
      return None;
    }
    lifecycle.inflight += 1;
    Some(InflightGuard {
      ctx: Arc::clone(self),
    })
  }

  fn leave(&self) {
    let mut lifecycle = self.lifecycle.lock();
    lifecycle.inflight -= 1;
    if lifecycle.inflight == 0 {
      self.changed.notify_all();
    }
  }

  /// Gate for an application-initiated release. Only the first caller wins.
  pub(crate) fn begin_release(&self) -> bool {
    let mut lifecycle = self.lifecycle.lock();
    if lifecycle.phase != Phase::Running {
      return false;
    }
    lifecycle.phase = Phase::Draining;
    drop(lifecycle);
    self.teardown.cancel();
    true
  }

  /// Gate for terminal reports. Exactly one caller ever gets `Owner` or `ExitOnly`.
  pub(crate) fn begin_exit(&self) -> ExitRole {
    let mut lifecycle = self.lifecycle.lock();
    if lifecycle.exiting {
      return ExitRole::Wait;
    }
    lifecycle.exiting = true;

    if lifecycle.phase == Phase::Running {
      lifecycle.phase = Phase::Draining;
      drop(lifecycle);
      self.teardown.cancel();
      return ExitRole::Owner;
    }

    // A manual release owns the teardown; let it finish first.
    while lifecycle.phase < Phase::Released {
      self.changed.wait(&mut lifecycle);
    }
    ExitRole::ExitOnly
  }

  pub(crate) fn cancel_workers(&self) {
    self.workers.cancel();
  }

  /// Blocks until every in-flight guard has been dropped, then refuses new work.
  pub(crate) fn drain(&self) {
    let mut lifecycle = self.lifecycle.lock();
    while lifecycle.inflight > 0 {
      self.changed.wait(&mut lifecycle);
    }
    lifecycle.sealed = true;
  }

  pub(crate) fn mark_released(&self) {
    self.advance(Phase::Released);
  }

  pub(crate) fn mark_terminated(&self) {
    self.advance(Phase::Terminated);
  }

  fn advance(&self, phase: Phase) {
    let mut lifecycle = self.lifecycle.lock();
    if lifecycle.phase < phase {
      lifecycle.phase = phase;
    }
    self.changed.notify_all();
  }

  /// Blocks until the exit hook has returned. With the default hook this never returns.
  pub(crate) fn wait_terminated(&self) {
    let mut lifecycle = self.lifecycle.lock();
    while lifecycle.phase != Phase::Terminated {
      self.changed.wait(&mut lifecycle);
    }
  }
}

impl fmt::Debug for ShutdownContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let lifecycle = self.lifecycle.lock();
    f.debug_struct("ShutdownContext")
      .field("phase", &lifecycle.phase)
      .field("inflight", &lifecycle.inflight)
      .field("sealed", &lifecycle.sealed)
      .field("exiting", &lifecycle.exiting)
      .field("teardown_cancelled", &self.teardown.is_cancelled())
      .field("workers_cancelled", &self.workers.is_cancelled())
      .finish()
  }
}

/// Deregisters its unit of in-flight work on drop.
#[must_use = "in-flight work is deregistered as soon as the guard is dropped"]
pub struct InflightGuard {
  ctx: Arc<ShutdownContext>,
}

impl Drop for InflightGuard {
  fn drop(&mut self) {
    self.ctx.leave();
  }
}

impl fmt::Debug for InflightGuard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InflightGuard").finish_non_exhaustive()
  }
}
