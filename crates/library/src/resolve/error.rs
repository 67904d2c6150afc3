//! Error types for the [`resolve`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A resolve error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for page resolution.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The page's source file could not be read.
    #[display("could not read page source")]
    Storage,
    /// The archive entry could not be extracted.
    #[display("could not read archive entry")]
    Archive,
    /// The document page could not be rasterized.
    #[display("could not render document page")]
    Render,
    /// The path can't be expressed as a `file://` URL (e.g. it's relative).
    #[display("no file URL for {}", _0.display())]
    Locator(#[error(not(source))] PathBuf),
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
