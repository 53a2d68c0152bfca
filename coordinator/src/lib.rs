//! `bulwark` - centralized error reporting and ordered graceful shutdown.
//!
//! Application code builds one [`Coordinator`] at startup and reports errors
//! through [`Coordinator::error_transmit`] from any thread. A report is tagged
//! with a module name and a severity and is written to the log sink either as
//! its root cause or as its whole `source()` chain. A report may also be
//! terminal: once its line is written, the coordinator runs the release
//! callback, cancels the worker token, waits for in-flight work and exits the
//! process with status 1. That teardown runs at most once no matter how many
//! terminal reports race.
//!
//! ```no_run
//! use bulwark::{options::*, Coordinator};
//!
//! let coordinator = Coordinator::new(
//!   None,
//!   vec![
//!     with_log_level("info"),
//!     with_release_fn(|| {
//!       println!("closing connections");
//!       Ok(())
//!     }),
//!   ],
//! )
//! .expect("valid options");
//!
//! let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config missing");
//! coordinator.error_transmit("main", "warn", Some(&err), false, false);
//! coordinator.error_transmit("main", "error", Some(&err), true, true); // never returns
//! ```

pub mod config;
pub mod context;
mod coordinator;
pub mod error;
pub mod format;
pub mod options;

// Re-export key public types for easier use by library consumers.
pub use config::OptionsRaw;
pub use context::{InflightGuard, Phase};
pub use coordinator::{Coordinator, EXIT_STATUS};
pub use error::{BoxError, Error, Result};
pub use options::{ExitFn, OptionFn, Options, ReleaseFn, Snapshot};

pub use bulwark_logging::{LogTarget, Severity, SinkKind};
pub use tokio_util::sync::CancellationToken;
