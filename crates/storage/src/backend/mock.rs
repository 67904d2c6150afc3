//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::models::{DirEntry, EntryKind, FileInfo};
use crate::path::{validate as validate_path, validate_dir};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a map behind a [`RwLock`], so all trait methods can
/// operate on `&self` without external synchronisation. Directories are
/// implied by the files beneath them. Modification times can be moved with
/// [`set_modified()`](Self::set_modified), and any subtree can be made to
/// fail with [`with_failure()`](Self::with_failure) to simulate permission
/// problems.
///
/// # Examples
///
/// ```
/// use tankobon_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("/lib/Jane/Issue1/001.png", b"png"),
/// ]);
/// assert!(backend.exists(Path::new("/lib/Jane/Issue1/001.png")).await?);
/// assert_eq!(backend.list_dir(Path::new("/lib/Jane")).await?.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<PathBuf, (UtcDateTime, Vec<u8>)>>,
    failures: HashSet<PathBuf>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        let now = UtcDateTime::now();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            failures: HashSet::new(),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Every operation on `path` or anything beneath it fails with
    /// [`PermissionDenied`](ErrorKind::PermissionDenied). Listing the parent
    /// still shows it.
    pub fn with_failure(mut self, path: impl AsRef<Path>) -> Self {
        let Ok(validated) = validate_path(path.as_ref()) else {
            panic!("MockBackend::with_failure: invalid path {}", path.as_ref().display());
        };
        self.failures.insert(validated);
        self
    }

    /// Overwrite the modification time of a stored file.
    pub async fn set_modified(&self, path: impl AsRef<Path>, modified: UtcDateTime) {
        let Ok(validated) = validate_path(path.as_ref()) else {
            panic!("MockBackend::set_modified: invalid path {}", path.as_ref().display());
        };
        match self.storage.write().await.get_mut(&validated) {
            Some((stamp, _)) => *stamp = modified,
            None => panic!("MockBackend::set_modified: no such file {}", path.as_ref().display()),
        }
    }

    /// Remove a single file, as if it had been deleted from disk.
    pub async fn remove(&self, path: impl AsRef<Path>) -> bool {
        match validate_path(path.as_ref()) {
            Ok(validated) => self.storage.write().await.remove(&validated).is_some(),
            Err(_) => false,
        }
    }

    /// Paths of every stored file, sorted.
    pub async fn files(&self) -> Vec<PathBuf> {
        self.storage.read().await.keys().cloned().collect()
    }

    fn check(&self, requested: &Path, validated: &Path) -> Result<()> {
        if self.failures.iter().any(|failing| validated.starts_with(failing)) {
            exn::bail!(ErrorKind::PermissionDenied(requested.to_path_buf()));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let dir = validate_dir(path)?;
        self.check(path, &dir)?;
        let guard = self.storage.read().await;
        if guard.contains_key(&dir) {
            exn::bail!(ErrorKind::NotADirectory(path.to_path_buf()));
        }
        let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
        for stored in guard.keys() {
            let Ok(rest) = stored.strip_prefix(&dir) else { continue };
            let mut components = rest.components();
            let Some(first) = components.next() else { continue };
            let kind = match components.next() {
                Some(_) => EntryKind::Directory,
                None => EntryKind::File,
            };
            children.insert(first.as_os_str().to_string_lossy().into_owned(), kind);
        }
        if children.is_empty() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        Ok(children
            .into_iter()
            .map(|(name, kind)| DirEntry {
                path: path.join(&name),
                name,
                kind,
            })
            .collect())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let validated = validate_path(path)?;
        self.check(path, &validated)?;
        Ok(self.storage.read().await.keys().any(|stored| stored.starts_with(&validated)))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let validated = validate_path(path)?;
        self.check(path, &validated)?;
        let guard = self.storage.read().await;
        let (_modified, data) = guard.get(&validated).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.to_path_buf())))?;
        Ok(data.clone())
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let validated = validate_path(path)?;
        self.check(path, &validated)?;
        self.storage.write().await.insert(validated, (UtcDateTime::now(), data.to_vec()));
        Ok(())
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<bool> {
        let validated = validate_path(path)?;
        self.check(path, &validated)?;
        let mut guard = self.storage.write().await;
        let before = guard.len();
        guard.retain(|stored, _| !stored.starts_with(&validated));
        Ok(guard.len() != before)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let validated = validate_path(path)?;
        self.check(path, &validated)?;
        let guard = self.storage.read().await;
        if let Some((modified, data)) = guard.get(&validated) {
            return Ok(FileInfo::new(path, data.len() as u64, *modified));
        }
        // A directory reports the newest modification time beneath it.
        guard
            .iter()
            .filter(|(stored, _)| stored.starts_with(&validated))
            .map(|(_, (modified, _))| *modified)
            .max()
            .map(|modified| FileInfo::new(path, 0, modified))
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.to_path_buf())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[tokio::test]
    async fn test_write_and_read() {
        let backend = MockBackend::default();
        backend.write(Path::new("1/1.jpg"), b"hello").await.unwrap();
        let data = backend.read(Path::new("1/1.jpg")).await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn test_list_dir_implies_directories() {
        let backend = MockBackend::with_files([
            ("/lib/Jane/Issue1/001.png", b"x"),
            ("/lib/Jane/Issue1/002.png", b"x"),
            ("/lib/Jane/book.pdf", b"x"),
        ]);
        let entries = backend.list_dir(Path::new("/lib/Jane")).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Issue1");
        assert_eq!(entries[0].kind, EntryKind::Directory);
        assert_eq!(entries[0].path, Path::new("/lib/Jane/Issue1"));
        assert_eq!(entries[1].name, "book.pdf");
        assert_eq!(entries[1].kind, EntryKind::File);
    }

    #[tokio::test]
    async fn test_list_dir_errors() {
        let backend = MockBackend::with_files([("/lib/a.pdf", b"x")]);
        let err = backend.list_dir(Path::new("/missing")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        let err = backend.list_dir(Path::new("/lib/a.pdf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MockBackend::with_files([("/lib/ok/001.png", b"x"), ("/lib/locked/001.png", b"x")])
            .with_failure("/lib/locked");
        assert_eq!(backend.list_dir(Path::new("/lib")).await.unwrap().len(), 2);
        let err = backend.list_dir(Path::new("/lib/locked")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        assert!(backend.read(Path::new("/lib/locked/001.png")).await.is_err());
        assert!(backend.read(Path::new("/lib/ok/001.png")).await.is_ok());
    }

    #[tokio::test]
    async fn test_set_modified_and_stat() {
        let backend = MockBackend::with_files([("/lib/a/001.png", b"abc")]);
        let later = UtcDateTime::now() + Duration::hours(1);
        backend.set_modified("/lib/a/001.png", later).await;
        let info = backend.stat(Path::new("/lib/a/001.png")).await.unwrap();
        assert_eq!(info.size, 3);
        assert_eq!(info.modified, later);
        // Directories report their newest file.
        assert_eq!(backend.modified(Path::new("/lib/a")).await.unwrap(), later);
    }

    #[tokio::test]
    async fn test_remove_dir_all() {
        let backend = MockBackend::with_files([("1/1.jpg", b"x"), ("1/2.jpg", b"x"), ("10/1.jpg", b"x")]);
        assert!(backend.remove_dir_all(Path::new("1")).await.unwrap());
        assert!(!backend.remove_dir_all(Path::new("1")).await.unwrap());
        assert_eq!(backend.files().await, vec![PathBuf::from("10/1.jpg")]);
    }
}
