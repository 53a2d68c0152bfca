use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

type BoxedWriter = Box<dyn Write + Send>;

/// A cloneable handle to one underlying writer.
///
/// Every `make_writer` call locks the writer for the duration of a single
/// formatted event and flushes when the guard drops, so one event is one
/// uninterrupted, durable write even with many concurrent producers.
///
/// The formatting layer discards I/O errors, so the guard parks the most recent
/// one here for the sink to pick up with [`SharedWriter::take_failure`].
#[derive(Clone)]
pub struct SharedWriter {
  inner: Arc<Mutex<BoxedWriter>>,
  failure: Arc<Mutex<Option<io::Error>>>,
}

impl SharedWriter {
  pub fn new<W>(writer: W) -> Self
  where
    W: Write + Send + 'static,
  {
    Self {
      inner: Arc::new(Mutex::new(Box::new(writer))),
      failure: Arc::new(Mutex::new(None)),
    }
  }

  pub fn stdout() -> Self {
    Self::new(io::stdout())
  }

  pub fn flush(&self) -> io::Result<()> {
    self.inner.lock().flush()
  }

  /// The last write or flush error seen by an event guard, if any. Clears it.
  pub fn take_failure(&self) -> Option<io::Error> {
    self.failure.lock().take()
  }
}

impl fmt::Debug for SharedWriter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SharedWriter").finish_non_exhaustive()
  }
}

/// Exclusive access to the shared writer for one event.
pub struct SharedWriterGuard<'a> {
  guard: MutexGuard<'a, BoxedWriter>,
  failure: &'a Mutex<Option<io::Error>>,
}

impl SharedWriterGuard<'_> {
  fn record<T>(&self, result: io::Result<T>) -> io::Result<T> {
    if let Err(e) = &result {
      *self.failure.lock() = Some(io::Error::new(e.kind(), e.to_string()));
    }
    result
  }
}

impl Write for SharedWriterGuard<'_> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    let result = self.guard.write(buf);
    self.record(result)
  }

  fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
    let result = self.guard.write_all(buf);
    self.record(result)
  }

  fn flush(&mut self) -> io::Result<()> {
    let result = self.guard.flush();
    self.record(result)
  }
}

impl Drop for SharedWriterGuard<'_> {
  fn drop(&mut self) {
    let result = self.guard.flush();
    let _ = self.record(result);
  }
}

impl<'a> MakeWriter<'a> for SharedWriter {
  type Writer = SharedWriterGuard<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    SharedWriterGuard {
      guard: self.inner.lock(),
      failure: &self.failure,
    }
  }
}
