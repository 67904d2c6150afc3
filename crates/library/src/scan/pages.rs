use crate::scan::Candidate;
use crate::scan::error::{ErrorKind, Result};
use exn::ResultExt;
use std::sync::Arc;
use tankobon_catalog::{NewPage, SourceKind};
use tankobon_extract::natural_cmp;
use tankobon_render::RendererHandle;
use tankobon_storage::{StorageBackend, archive, media};
use tracing::instrument;

/// The ordered pages of one candidate unit, numbered from 1.
///
/// - Image folder: its image files, in natural order of their names.
/// - Document: one page per document page, as reported by the renderer.
/// - Archive: its image entries, in natural order of their names.
///
/// Thumbnails are left unset; an empty list means the unit has no pages.
#[instrument(level = "debug", skip_all, fields(path = %candidate.path.display(), kind = %candidate.kind))]
pub async fn list_pages(
    backend: &dyn StorageBackend,
    renderer: &RendererHandle,
    candidate: &Candidate,
) -> Result<Vec<NewPage>> {
    let pages = match candidate.kind {
        SourceKind::Image => image_pages(backend, candidate).await?,
        SourceKind::Document => document_pages(backend, renderer, candidate).await?,
        SourceKind::Archive => archive_pages(backend, candidate).await?,
    };
    Ok(pages)
}

async fn image_pages(backend: &dyn StorageBackend, candidate: &Candidate) -> Result<Vec<NewPage>> {
    let mut files: Vec<_> = backend
        .list_dir(&candidate.path)
        .await
        .or_raise(|| ErrorKind::Storage)?
        .into_iter()
        .filter(|entry| entry.is_file() && media::is_image(&entry.name))
        .collect();
    files.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    Ok(files
        .into_iter()
        .zip(1..)
        .map(|(entry, page_number)| NewPage {
            page_number,
            source_kind: SourceKind::Image,
            source_path: Some(entry.path.clone()),
            file_path: entry.path,
            file_name: entry.name,
            thumbnail: None,
            archive_entry: None,
            document_page: None,
        })
        .collect())
}

async fn document_pages(
    backend: &dyn StorageBackend,
    renderer: &RendererHandle,
    candidate: &Candidate,
) -> Result<Vec<NewPage>> {
    let document = backend.read(&candidate.path).await.or_raise(|| ErrorKind::Storage)?;
    let renderer = Arc::clone(renderer);
    let count = tokio::task::spawn_blocking(move || renderer.page_count(&document))
        .await
        .or_raise(|| ErrorKind::Blocking)?
        .or_raise(|| ErrorKind::Render)?;
    Ok((1..=count)
        .map(|page_number| NewPage {
            page_number,
            source_kind: SourceKind::Document,
            file_path: candidate.path.clone(),
            file_name: format!("page-{page_number}.pdf"),
            thumbnail: None,
            source_path: Some(candidate.path.clone()),
            archive_entry: None,
            document_page: Some(page_number),
        })
        .collect())
}

async fn archive_pages(backend: &dyn StorageBackend, candidate: &Candidate) -> Result<Vec<NewPage>> {
    let mut entries = archive::list_image_entries(backend, &candidate.path).await.or_raise(|| ErrorKind::Archive)?;
    entries.sort_by(|a, b| natural_cmp(a, b));
    Ok(entries
        .into_iter()
        .zip(1..)
        .map(|(entry, page_number)| NewPage {
            page_number,
            source_kind: SourceKind::Archive,
            file_path: candidate.path.clone(),
            file_name: entry.rsplit('/').next().unwrap_or(&entry).to_string(),
            thumbnail: None,
            source_path: Some(candidate.path.clone()),
            archive_entry: Some(entry),
            document_page: None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::build_zip;
    use std::path::{Path, PathBuf};
    use tankobon_render::MockRenderer;
    use tankobon_storage::backend::MockBackend;

    fn renderer() -> RendererHandle {
        Arc::new(MockRenderer::default())
    }

    #[tokio::test]
    async fn test_image_pages_in_natural_order() {
        let backend = MockBackend::with_files([
            ("/lib/a/10.jpg", b"x"),
            ("/lib/a/2.jpg", b"x"),
            ("/lib/a/1.jpg", b"x"),
            ("/lib/a/info.txt", b"x"),
            ("/lib/a/sub/3.jpg", b"x"),
        ]);
        let candidate = Candidate::new("/lib/a", SourceKind::Image);
        let pages = list_pages(&backend, &renderer(), &candidate).await.unwrap();
        let names: Vec<_> = pages.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["1.jpg", "2.jpg", "10.jpg"]);
        assert_eq!(pages.iter().map(|p| p.page_number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(pages[2].file_path, PathBuf::from("/lib/a/10.jpg"));
        assert!(pages.iter().all(|p| p.source_path.as_ref() == Some(&p.file_path)));
    }

    #[tokio::test]
    async fn test_document_pages() {
        let backend = MockBackend::with_files([("/lib/book.pdf", MockRenderer::document(3))]);
        let candidate = Candidate::new("/lib/book.pdf", SourceKind::Document);
        let pages = list_pages(&backend, &renderer(), &candidate).await.unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].file_name, "page-2.pdf");
        assert_eq!(pages[1].document_page, Some(2));
        assert_eq!(pages[1].source_path.as_deref(), Some(Path::new("/lib/book.pdf")));
    }

    #[tokio::test]
    async fn test_unreadable_document() {
        let backend = MockBackend::with_files([("/lib/book.pdf", b"not a document".to_vec())]);
        let candidate = Candidate::new("/lib/book.pdf", SourceKind::Document);
        let err = list_pages(&backend, &renderer(), &candidate).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Render));
    }

    #[tokio::test]
    async fn test_archive_pages_sorted_by_entry_name() {
        let zip = build_zip(&[("p10.png", b"x"), ("p9.png", b"x"), ("notes.txt", b"x"), ("inner/p1.png", b"x")]);
        let backend = MockBackend::with_files([("/lib/pack.cbz", zip)]);
        let candidate = Candidate::new("/lib/pack.cbz", SourceKind::Archive);
        let pages = list_pages(&backend, &renderer(), &candidate).await.unwrap();
        let entries: Vec<_> = pages.iter().filter_map(|p| p.archive_entry.as_deref()).collect();
        assert_eq!(entries, vec!["inner/p1.png", "p9.png", "p10.png"]);
        assert_eq!(pages[0].file_name, "p1.png");
        assert_eq!(pages[0].file_path, PathBuf::from("/lib/pack.cbz"));
    }
}
