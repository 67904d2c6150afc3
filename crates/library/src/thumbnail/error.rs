//! Error types for the [`thumbnail`](super) module.

use derive_more::{Display, Error};

/// A thumbnail error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for thumbnail operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Reading the source or writing the thumbnail failed.
    #[display("thumbnail storage error")]
    Storage,
    /// The source bytes are not an image we can read.
    #[display("could not decode source image")]
    Decode,
    #[display("could not encode thumbnail")]
    Encode,
    /// The blocking task doing the work panicked or was cancelled.
    #[display("thumbnail task failed")]
    Blocking,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Blocking)
    }
}
