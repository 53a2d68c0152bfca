//! `bulwark_logging` - the log sink behind the bulwark error coordinator.
//!
//! A sink is an owned `tracing` dispatcher bound to exactly one output: the
//! process's standard output, a size and count bounded rolling file, or a
//! caller-supplied writer. Lines are filtered by a minimum [`Severity`] and
//! flushed before a write returns.

pub mod error;
pub mod model;
pub mod roller;
pub mod sink;
pub mod writer;

// Re-export key public types for easier use by library consumers.
pub use error::{Error, Result};
pub use model::{Severity, SUPPORTED_LEVELS};
pub use sink::{LogSink, LogTarget, SinkConfig, SinkKind};
pub use writer::SharedWriter;
