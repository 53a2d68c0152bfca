use thiserror::Error;

/// Boxed error returned by a release callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced while constructing a [`Coordinator`](crate::Coordinator).
///
/// Everything that can go wrong after construction is absorbed by the
/// coordinator and only ever reaches the log or stderr.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Logging(#[from] bulwark_logging::Error),

  #[error("Failed to read options document: {0}")]
  ConfigRead(#[from] std::io::Error),

  #[error("Failed to parse options document: {0}")]
  ConfigParse(String),
}

/// A specialized `Result` type for `bulwark` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
