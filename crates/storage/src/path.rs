//! Path validation and comparison utilities.
//!
//! Backends are rooted at a directory; every path handed to them is resolved
//! against that root after validation. A leading `/` is ignored, so a backend
//! rooted at `/` accepts ordinary absolute paths.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage path for security and correctness.
/// Ensures that paths don't escape the storage root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes or non-UTF8 bytes. Null
/// >           bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tankobon_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("Series/Issue 1/001.png").is_ok());
/// assert!(validate_path("/lib/Jane/Issue1").is_ok());
/// assert!(validate_path("a/../file.cbz").is_ok()); // (never leaves root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err()); // (leaves root)
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("/wrong/../still-wrong/.././correct//./001.png/").unwrap(),
///     Path::new("correct/001.png")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let validated = normalize(path.as_ref())?;
    match validated.as_os_str().is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(validated),
    }
}

/// Like [`validate()`], but an empty result means "the backend root" and is
/// accepted. Used for directory listings.
pub(crate) fn validate_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    normalize(path.as_ref())
}

fn normalize(path: &Path) -> Result<PathBuf> {
    // Rust's built-in path component parser handles non-UTF8 names for us.
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
            },
        }
    }
    Ok(components.into_iter().collect())
}

/// Component-wise prefix check: `/lib/a` contains `/lib/a/b` but not
/// `/lib/ab`. A path is a sub-path of itself.
///
/// ```
/// use tankobon_storage::is_sub_path;
/// assert!(is_sub_path("/lib", "/lib/Jane/Issue1"));
/// assert!(is_sub_path("/lib", "/lib"));
/// assert!(!is_sub_path("/lib", "/library/Issue1"));
/// ```
pub fn is_sub_path(root: impl AsRef<Path>, path: impl AsRef<Path>) -> bool {
    path.as_ref().starts_with(root.as_ref())
}

/// Renders a path with `/` separators regardless of platform.
pub fn to_slash(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .components()
        .filter_map(|component| match component {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
