//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the engine's only way of
//! touching the filesystem. Library roots are read through a
//! [`ReadOnlyBackend`] so that a sync can never modify a user's comics; the
//! thumbnail cache gets a writable [`LocalBackend`] of its own.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::models::{DirEntry, FileInfo};
use async_trait::async_trait;
use std::path::Path;
use time::UtcDateTime;

/// Unified interface for storage backends.
///
/// All storage operations are asynchronous. Implementations resolve every
/// path against their own root after [validation](crate::validate_path),
/// so a backend rooted at `/` works with plain absolute paths.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tankobon_storage::{backend::StorageBackend, error::Result, media};
///
/// async fn count_pages(backend: &dyn StorageBackend, dir: &Path) -> Result<usize> {
///     let entries = backend.list_dir(dir).await?;
///     Ok(entries.iter().filter(|e| e.is_file() && media::is_image(&e.name)).count())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// List the immediate children of a directory.
    ///
    /// Entries are returned in whatever order the backend produces them.
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// directory does not exist and
    /// [`PermissionDenied`](crate::error::ErrorKind::PermissionDenied) if it
    /// cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use tankobon_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// for entry in backend.list_dir(Path::new("/comics/Jane")).await? {
    ///     println!("{} ({:?})", entry.path.display(), entry.kind);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Check if a file or directory exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents.
    ///
    /// Creates a new file or overwrites an existing file, creating parent
    /// directories as needed.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use tankobon_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend, jpeg: Vec<u8>) -> Result<()> {
    /// backend.write(Path::new("42/1.jpg"), &jpeg).await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Recursively remove a directory.
    ///
    /// Returns `false` if there was nothing to remove.
    async fn remove_dir_all(&self, path: &Path) -> Result<bool>;

    /// Get file metadata.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;

    /// Last modification time of a file or directory.
    async fn modified(&self, path: &Path) -> Result<UtcDateTime> {
        Ok(self.stat(path).await?.modified)
    }
}
