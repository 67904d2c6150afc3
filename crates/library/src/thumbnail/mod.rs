//! On-disk cache of page thumbnails.
//!
//! Thumbnails live at `<root>/<comic id>/<page number>.jpg`. An entry is
//! valid while its modification time is at least that of whatever it was
//! made from; anything older is regenerated on the next request. Nothing
//! else is tracked: the directory tree is the whole cache state, so deleting
//! it is always safe.

pub mod error;
mod generate;

use crate::thumbnail::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tankobon_config::ThumbnailConfig;
use tankobon_storage::backend::LocalBackend;
use tankobon_storage::error::ErrorKind as StorageErrorKind;
use tankobon_storage::{BackendHandle, StorageBackend};
use time::UtcDateTime;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSettings {
    /// Longest side, in pixels.
    pub max_size: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
}
impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self { max_size: 300, quality: 80 }
    }
}
impl From<&ThumbnailConfig> for ThumbnailSettings {
    fn from(config: &ThumbnailConfig) -> Self {
        Self {
            max_size: config.max_size,
            quality: config.quality,
        }
    }
}

/// Thumbnail store keyed by `(comic id, page number)`.
///
/// All I/O goes through `backend`, which is rooted at the cache directory and
/// addressed with relative paths. `root` is only used to build the absolute
/// paths handed out to callers.
#[derive(Clone)]
pub struct ThumbnailCache {
    backend: BackendHandle,
    root: PathBuf,
    settings: ThumbnailSettings,
}

impl ThumbnailCache {
    pub fn new(backend: BackendHandle, root: impl Into<PathBuf>, settings: ThumbnailSettings) -> Self {
        Self {
            backend,
            root: root.into(),
            settings,
        }
    }

    /// A cache in a local directory, created if missing.
    pub fn local(directory: impl AsRef<Path>, settings: ThumbnailSettings) -> Result<Self> {
        let backend = LocalBackend::new("thumbnails", directory.as_ref()).or_raise(|| ErrorKind::Storage)?;
        let root = backend.root().to_path_buf();
        Ok(Self::new(Arc::new(backend), root, settings))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> ThumbnailSettings {
        self.settings
    }

    fn relative(comic_id: i64, page: u32) -> PathBuf {
        PathBuf::from(comic_id.to_string()).join(format!("{page}.jpg"))
    }

    /// Where the thumbnail for this page lives (whether or not it exists).
    pub fn path_for(&self, comic_id: i64, page: u32) -> PathBuf {
        self.root.join(Self::relative(comic_id, page))
    }

    /// The cached thumbnail, if one exists and is at least as new as
    /// `source_modified`.
    ///
    /// Without a source time nothing can be proven fresh, so the result is
    /// always `None`. Failing to read the thumbnail's own time counts as
    /// stale.
    pub async fn lookup(&self, comic_id: i64, page: u32, source_modified: Option<UtcDateTime>) -> Option<PathBuf> {
        let source_modified = source_modified?;
        match self.backend.modified(&Self::relative(comic_id, page)).await {
            Ok(modified) if modified >= source_modified => {
                tracing::debug!(comic_id, page, "Thumbnail cache hit");
                Some(self.path_for(comic_id, page))
            },
            Ok(_) => {
                tracing::debug!(comic_id, page, "Thumbnail is older than its source");
                None
            },
            Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => None,
            Err(err) => {
                tracing::warn!(comic_id, page, error = ?err, "Could not check thumbnail, regenerating");
                None
            },
        }
    }

    /// Thumbnail for an image file read through `source`, generated if
    /// missing or stale.
    #[instrument(level = "debug", skip(self, source), fields(path = %path.display()))]
    pub async fn from_path(&self, source: &dyn StorageBackend, path: &Path, comic_id: i64, page: u32) -> Result<PathBuf> {
        let modified = source.modified(path).await.or_raise(|| ErrorKind::Storage)?;
        if let Some(cached) = self.lookup(comic_id, page, Some(modified)).await {
            return Ok(cached);
        }
        let bytes = source.read(path).await.or_raise(|| ErrorKind::Storage)?;
        self.store(bytes, comic_id, page).await
    }

    /// Thumbnail from already-decoded page bytes (a rendered document page or
    /// an archive entry), generated if missing or stale.
    pub async fn from_bytes(
        &self,
        bytes: Vec<u8>,
        comic_id: i64,
        page: u32,
        source_modified: Option<UtcDateTime>,
    ) -> Result<PathBuf> {
        if let Some(cached) = self.lookup(comic_id, page, source_modified).await {
            return Ok(cached);
        }
        self.store(bytes, comic_id, page).await
    }

    /// Generate and write a thumbnail unconditionally.
    #[instrument(level = "debug", skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn store(&self, bytes: Vec<u8>, comic_id: i64, page: u32) -> Result<PathBuf> {
        let settings = self.settings;
        let jpeg = tokio::task::spawn_blocking(move || generate::downscale(&bytes, settings))
            .await
            .or_raise(|| ErrorKind::Blocking)??;
        self.backend.write(&Self::relative(comic_id, page), &jpeg).await.or_raise(|| ErrorKind::Storage)?;
        Ok(self.path_for(comic_id, page))
    }

    /// Remove every thumbnail of a comic. Returns `false` if there were none.
    pub async fn delete_for_comic(&self, comic_id: i64) -> Result<bool> {
        self.backend.remove_dir_all(Path::new(&comic_id.to_string())).await.or_raise(|| ErrorKind::Storage)
    }

    /// Remove the thumbnail directory of every comic not in `live`, returning
    /// the names of the directories removed. Loose files are left alone.
    #[instrument(skip_all, fields(live = live.len()))]
    pub async fn sweep_orphans(&self, live: &HashSet<i64>) -> Result<Vec<String>> {
        let entries = match self.backend.list_dir(Path::new("")).await {
            Ok(entries) => entries,
            Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err).or_raise(|| ErrorKind::Storage),
        };
        let mut removed = Vec::new();
        for entry in entries.into_iter().filter(|entry| entry.is_dir()) {
            let is_live = entry.name.parse::<i64>().is_ok_and(|id| live.contains(&id));
            if is_live {
                continue;
            }
            self.backend.remove_dir_all(&entry.path).await.or_raise(|| ErrorKind::Storage)?;
            removed.push(entry.name);
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "Removed orphaned thumbnail directories");
        }
        Ok(removed)
    }
}
