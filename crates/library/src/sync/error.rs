//! Error types for the [`sync`](super) module.
//!
//! A sync never stops for one of these: each is turned into a
//! [`ScanError`](crate::ScanError) against the path it happened on.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a unit's sync failure.
///
/// ### Operational Errors
/// - [`ErrorKind::Pages`]
/// - [`ErrorKind::Thumbnail`]
/// - [`ErrorKind::Cleanup`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Catalog`]
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Render`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The unit's pages could not be listed.
    #[display("could not list pages")]
    Pages,
    /// A catalog read or write failed.
    #[display("catalog update failed")]
    Catalog,
    /// A page thumbnail could not be generated or stored.
    #[display("thumbnail generation failed for page {_0}")]
    Thumbnail(#[error(not(source))] u32),
    /// A retired comic's thumbnails could not be removed.
    #[display("could not remove thumbnails")]
    Cleanup,
    /// Reading the unit through the storage backend failed.
    #[display("could not read unit from storage")]
    Storage,
    /// Document pages could not be rendered for thumbnails.
    #[display("could not render document pages")]
    Render,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog | Self::Storage)
    }
}
