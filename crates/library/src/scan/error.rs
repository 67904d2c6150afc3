//! Error types for the [`scan`](super) module.

use derive_more::{Display, Error};

/// A scan error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a page listing failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Listing a folder or reading a container through the storage backend
    /// failed.
    #[display("could not read unit from storage")]
    Storage,
    /// The container could not be opened as an archive.
    #[display("could not read archive entries")]
    Archive,
    /// The document renderer could not open the file.
    #[display("could not count document pages")]
    Render,
    /// A blocking task panicked or was cancelled.
    #[display("background task failed")]
    Blocking,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Blocking)
    }
}
