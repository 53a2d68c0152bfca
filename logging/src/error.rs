use thiserror::Error;

/// The main error type for the `bulwark_logging` library.
#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid log level {value}, valid values are {supported:?}")]
  InvalidLevel {
    value: String,
    supported: &'static [&'static str],
  },

  #[error("Appender setup failed for '{appender_name}': {reason}")]
  AppenderSetup {
    appender_name: String,
    reason: String,
  },

  #[error("Log sink is closed; write rejected")]
  SinkClosed,

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error), // Allows easy conversion from io::Error
}

/// A specialized `Result` type for `bulwark_logging` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
