//! Extraction Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The pattern has no segments at all.
    #[display("naming pattern is empty")]
    EmptyPattern,
    /// A `{}` placeholder without a name.
    #[display("placeholder without a name in segment {_0}")]
    EmptyPlaceholder(#[error(not(source))] usize),
    /// A segment mixes braces with other text, e.g. `Vol {issue}`.
    #[display("segment {index} is neither a literal nor a whole placeholder: {segment}")]
    MalformedSegment {
        /// Zero-based position of the segment in the pattern.
        index: usize,
        /// The offending segment text.
        segment: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A pattern is either valid or it isn't.
        false
    }
}
