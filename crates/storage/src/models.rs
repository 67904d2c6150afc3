//! Storage models.
//!
//! Metadata returned by storage backends for listing and stat operations.

use std::path::PathBuf;
use time::UtcDateTime;

/// File metadata returned by [`stat()`](crate::StorageBackend::stat).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Path as it was requested
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: UtcDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: UtcDateTime) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
        }
    }
}

/// What a directory entry points at.
///
/// Symlinks are never followed: a link, like anything else that isn't a
/// regular file or a directory (sockets, devices), is
/// [`Other`](EntryKind::Other).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// An immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Listed directory joined with [`name`](Self::name)
    pub path: PathBuf,
    /// Final path component
    pub name: String,
    pub kind: EntryKind,
}
impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}
