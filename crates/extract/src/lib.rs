//! Metadata extraction from a comic's location inside its library root.
//!
//! Each library root carries a [`NamingPattern`] describing how its folders
//! are organized, e.g. `{artist}/{series}/{issue}`. Matching a unit's path
//! relative to the root against that pattern yields the unit's descriptive
//! fields. Nothing here touches the filesystem.

mod compare;
mod consts;
pub mod error;
mod pattern;

pub use crate::compare::natural_cmp;
use crate::error::Result;
pub use crate::pattern::{Extraction, LiteralMismatch, NamingPattern, Segment};
use tracing::instrument;

/// Easy, top-level entrypoint: compile `pattern` and match `relative`
/// against it.
///
/// Callers matching many paths against one pattern should parse a
/// [`NamingPattern`] once and reuse it.
///
/// ```
/// let found = tankobon_extract::extract("Jane/MySeries/Issue1", "{artist}/{series}/{issue}").unwrap();
/// assert_eq!(found.get("series"), Some("MySeries"));
/// ```
#[instrument(level = "debug")]
pub fn extract(relative: &str, pattern: &str) -> Result<Extraction> {
    Ok(pattern.parse::<NamingPattern>()?.extract(relative))
}
