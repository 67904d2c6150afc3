//! Reading pages out of ZIP-based comic containers (`.cbz`, `.zip`).
//!
//! The container is read through a [`StorageBackend`] in one go and parsed on
//! a blocking thread. Entry names are returned exactly as stored in the
//! archive; ordering them is the caller's business.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::media;
use exn::ResultExt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

type Archive = ZipArchive<Cursor<Vec<u8>>>;

/// Upper bound on the buffer reserved from an entry's declared size. The
/// header is untrusted; larger entries still read, growing as they go.
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOCATION)).unwrap_or(0)
}

fn open(path: &Path, bytes: Vec<u8>) -> Result<Archive> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| exn::Exn::from(ErrorKind::Archive(path.to_path_buf(), e.to_string())))
}

fn extract(archive: &mut Archive, path: &Path, entry: &str) -> Result<Vec<u8>> {
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => exn::bail!(ErrorKind::EntryNotFound(path.to_path_buf(), entry.to_string())),
        Err(e) => exn::bail!(ErrorKind::Archive(path.to_path_buf(), e.to_string())),
    };
    let mut buffer = Vec::with_capacity(initial_capacity(file.size()));
    file.read_to_end(&mut buffer).map_err(ErrorKind::Io)?;
    Ok(buffer)
}

async fn blocking<T, F>(path: &Path, task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(PathBuf) -> Result<T> + Send + 'static,
{
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || task(owned)).await.or_raise(|| ErrorKind::Blocking)?
}

/// Names of every image entry in the archive at `path`, in archive order.
/// Directory entries and non-image files are skipped.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn list_image_entries(backend: &dyn StorageBackend, path: &Path) -> Result<Vec<String>> {
    let bytes = backend.read(path).await?;
    blocking(path, move |path| {
        let mut archive = open(&path, bytes)?;
        let mut names = Vec::new();
        for index in 0..archive.len() {
            let file = archive.by_index(index).map_err(|e| ErrorKind::Archive(path.clone(), e.to_string()))?;
            if file.is_dir() || !media::is_image(file.name()) {
                continue;
            }
            names.push(file.name().to_string());
        }
        Ok(names)
    })
    .await
}

/// Raw bytes of a single entry.
///
/// Returns [`EntryNotFound`](ErrorKind::EntryNotFound) if the archive has no
/// entry with that exact name.
pub async fn read_entry(backend: &dyn StorageBackend, path: &Path, entry: &str) -> Result<Vec<u8>> {
    let bytes = backend.read(path).await?;
    let entry = entry.to_string();
    blocking(path, move |path| {
        let mut archive = open(&path, bytes)?;
        extract(&mut archive, &path, &entry)
    })
    .await
}

/// Raw bytes of several entries, read from a single pass over the container.
/// Output order matches `entries`.
pub async fn read_entries(backend: &dyn StorageBackend, path: &Path, entries: &[String]) -> Result<Vec<Vec<u8>>> {
    let bytes = backend.read(path).await?;
    let entries = entries.to_vec();
    blocking(path, move |path| {
        let mut archive = open(&path, bytes)?;
        entries.iter().map(|entry| extract(&mut archive, &path, entry)).collect()
    })
    .await
}
