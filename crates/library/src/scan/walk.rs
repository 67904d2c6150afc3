use crate::progress::ScanError;
use async_stream::stream;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tankobon_catalog::SourceKind;
use tankobon_storage::{EntryKind, StorageBackend, media};

/// A folder or file that looks like a comic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The image folder, or the document/archive file.
    pub path: PathBuf,
    /// Folder name for image units, file stem otherwise.
    pub title: String,
    pub kind: SourceKind,
}

impl Candidate {
    pub fn new(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        let path = path.into();
        let name = match kind {
            SourceKind::Image => path.file_name(),
            SourceKind::Document | SourceKind::Archive => path.file_stem(),
        };
        let title = match name {
            Some(name) => name.to_string_lossy().into_owned(),
            None => path.display().to_string(),
        };
        Self { path, title, kind }
    }
}

/// Walk `root` depth-first, yielding every candidate unit beneath it.
///
/// - A directory holding at least one image file is an image unit.
/// - Every document or archive file is a unit of its own.
/// - Subdirectories are always descended into, so units may nest.
///
/// A directory that can't be listed yields an `Err` carrying its path and is
/// skipped along with everything below it; its siblings are still walked.
pub fn walk<'a>(
    backend: &'a dyn StorageBackend,
    root: &'a Path,
) -> impl Stream<Item = Result<Candidate, ScanError>> + 'a {
    stream!({
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let entries = match backend.list_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(backend = backend.name(), path = %dir.display(), error = ?err, "Skipping unreadable directory");
                    yield Err(ScanError::new(&dir, &*err));
                    continue;
                },
            };
            let mut has_images = false;
            let mut subdirs = Vec::new();
            for entry in entries {
                match entry.kind {
                    EntryKind::Directory => subdirs.push(entry.path),
                    EntryKind::File if media::is_image(&entry.name) => has_images = true,
                    EntryKind::File if media::is_document(&entry.name) => {
                        yield Ok(Candidate::new(entry.path, SourceKind::Document));
                    },
                    EntryKind::File if media::is_archive(&entry.name) => {
                        yield Ok(Candidate::new(entry.path, SourceKind::Archive));
                    },
                    EntryKind::File | EntryKind::Other => {},
                }
            }
            if has_images {
                yield Ok(Candidate::new(dir, SourceKind::Image));
            }
            // Reversed so that siblings pop off the stack in listing order.
            pending.extend(subdirs.into_iter().rev());
        }
    })
}

/// Everything found by a complete walk.
#[derive(Debug, Default)]
pub struct Discovery {
    pub candidates: Vec<Candidate>,
    pub errors: Vec<ScanError>,
}

/// Drain [`walk`], calling `on_error` as soon as each error turns up.
pub async fn discover(
    backend: &dyn StorageBackend,
    root: &Path,
    mut on_error: impl FnMut(&ScanError),
) -> Discovery {
    let mut discovery = Discovery::default();
    let stream = walk(backend, root);
    futures::pin_mut!(stream);
    while let Some(found) = stream.next().await {
        match found {
            Ok(candidate) => discovery.candidates.push(candidate),
            Err(error) => {
                on_error(&error);
                discovery.errors.push(error);
            },
        }
    }
    discovery
}
