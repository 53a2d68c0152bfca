#![allow(dead_code)]

use bulwark::{options::*, Coordinator, LogTarget, OptionFn};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SHORT_DELAY: Duration = Duration::from_millis(50);
pub const CONCURRENT_REPORTERS: usize = 100;

// --- Test Fixtures ---

#[derive(Debug, thiserror::Error)]
#[error("first")]
pub struct First;

#[derive(Debug, thiserror::Error)]
#[error("second")]
pub struct Second(#[source] pub First);

#[derive(Debug, thiserror::Error)]
#[error("report #{0}")]
pub struct Numbered(pub usize);

/// Ordered record of everything observable during a test: log writes,
/// release callback runs and exit calls.
#[derive(Clone, Default)]
pub struct Journal {
  entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
  pub fn push(&self, entry: impl Into<String>) {
    self.entries.lock().push(entry.into());
  }

  pub fn entries(&self) -> Vec<String> {
    self.entries.lock().clone()
  }

  /// Every log write, in order, without the `log:` tag.
  pub fn logs(&self) -> Vec<String> {
    self
      .entries()
      .into_iter()
      .filter_map(|e| e.strip_prefix("log:").map(str::to_string))
      .collect()
  }

  /// Log writes that mention `needle`.
  pub fn logs_containing(&self, needle: &str) -> Vec<String> {
    self.logs().into_iter().filter(|l| l.contains(needle)).collect()
  }

  pub fn position(&self, predicate: impl Fn(&str) -> bool) -> Option<usize> {
    self.entries().iter().position(|e| predicate(e))
  }

  pub fn writer(&self) -> JournalWriter {
    JournalWriter {
      journal: self.clone(),
    }
  }
}

/// Sink writer: one `write` call per log event becomes one journal entry.
pub struct JournalWriter {
  journal: Journal,
}

impl Write for JournalWriter {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self
      .journal
      .push(format!("log:{}", String::from_utf8_lossy(buf)));
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

/// Sink writer that rejects every write.
pub struct FailingWriter;

impl Write for FailingWriter {
  fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
    Err(io::Error::new(io::ErrorKind::Other, "device unavailable"))
  }

  fn flush(&mut self) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Other, "device unavailable"))
  }
}

/// Counts calls and journals them under `name`.
#[derive(Clone)]
pub struct Probe {
  name: &'static str,
  journal: Journal,
  calls: Arc<AtomicUsize>,
}

impl Probe {
  pub fn new(name: &'static str, journal: &Journal) -> Self {
    Self {
      name,
      journal: journal.clone(),
      calls: Arc::new(AtomicUsize::new(0)),
    }
  }

  pub fn hit(&self, detail: impl std::fmt::Display) {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.journal.push(format!("{}:{}", self.name, detail));
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

/// A coordinator logging into `journal` at `level`, with an exit handler that
/// journals and returns instead of ending the test process.
pub fn journaled(
  journal: &Journal,
  level: &str,
  extra: Vec<OptionFn>,
) -> (Coordinator, Probe) {
  let exit_probe = Probe::new("exit", journal);
  let exit_hook = exit_probe.clone();

  let mut option_fns = vec![
    with_log_level(level),
    with_log_output(LogTarget::writer(journal.writer())),
    with_exit_handler(move |code| exit_hook.hit(code)),
  ];
  option_fns.extend(extra);

  let coordinator = Coordinator::new(None, option_fns).expect("coordinator should build");
  (coordinator, exit_probe)
}

/// A release callback that journals each run.
pub fn release_probe(journal: &Journal) -> (OptionFn, Probe) {
  let probe = Probe::new("release", journal);
  let hook = probe.clone();
  (
    with_release_fn(move || {
      hook.hit("ok");
      Ok(())
    }),
    probe,
  )
}
