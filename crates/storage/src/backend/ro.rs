//! Read-only storage backend.
//!
//! Wraps another backend and refuses every write operation. Library roots are
//! always accessed through this wrapper.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{ErrorKind, Result};
use crate::models::{DirEntry, FileInfo};
use crate::{BackendHandle, StorageBackend};

/// Read-only storage backend.
///
/// Reads are delegated to the wrapped backend. Writes and removals fail with
/// [`ReadOnly`](ErrorKind::ReadOnly) and log a [`warn event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        self.inner.list_dir(path).await
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::warn!(backend = self.name(), path = %path.display(), bytes = data.len(), "Refusing write to read-only backend");
        exn::bail!(ErrorKind::ReadOnly(path.to_path_buf()))
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<bool> {
        tracing::warn!(backend = self.name(), path = %path.display(), "Refusing removal from read-only backend");
        exn::bail!(ErrorKind::ReadOnly(path.to_path_buf()))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.inner.stat(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reads_pass_through_writes_fail() {
        let inner = Arc::new(MockBackend::with_files([("/lib/a/001.png", b"png")]));
        let backend = ReadOnlyBackend::new(inner.clone());
        assert_eq!(backend.read(Path::new("/lib/a/001.png")).await.unwrap(), b"png");
        assert_eq!(backend.list_dir(Path::new("/lib/a")).await.unwrap().len(), 1);

        let err = backend.write(Path::new("/lib/a/002.png"), b"png").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ReadOnly(_)));
        assert!(backend.remove_dir_all(Path::new("/lib/a")).await.is_err());
        assert!(inner.exists(Path::new("/lib/a/001.png")).await.unwrap());
    }
}
