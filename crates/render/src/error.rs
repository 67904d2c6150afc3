//! Render Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The pdfium shared library could not be located or loaded.
    #[display("pdfium library not available on this system")]
    Binding,
    /// The bytes could not be opened as a document.
    #[display("unreadable document")]
    Load,
    /// Requested page does not exist. Pages are 1-based.
    #[display("page {page} out of range (document has {count} pages)")]
    PageOutOfRange {
        page: u32,
        count: u32,
    },
    /// Rasterization of an existing page failed.
    #[display("failed to render page {_0}")]
    Render(#[error(not(source))] u32),
    /// Render size or quality outside the supported range.
    #[display("invalid render settings: {_0}")]
    InvalidSettings(#[error(not(source))] String),
    /// The rendered bitmap could not be encoded.
    #[display("failed to encode image")]
    Encode,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
