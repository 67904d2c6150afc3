//! Library Error Types
//!
//! Each module raises its own [`ErrorKind`](crate::sync::error::ErrorKind)
//! family; this one covers assembling the engine from configuration.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A configured root or its naming pattern is unusable.
    #[display("invalid library configuration")]
    Config,
    #[display("could not open the catalog")]
    Catalog,
    #[display("could not open storage")]
    Storage,
    #[display("could not load the document renderer")]
    Render,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The catalog may have been busy (locked by another process).
        matches!(self, Self::Catalog)
    }
}
