//! Reconciling the catalog with the library folders.
//!
//! A sync walks each root, upserts every unit it finds (with its pages and
//! thumbnails), then deletes whatever the catalog still holds under that root
//! that wasn't seen. Failures are collected per path and never stop the run.
//!
//! Everything happens one root, one unit, one thumbnail at a time.

pub mod error;
mod unit;

use crate::progress::{Observer, ScanError, ScanProgress, SyncProgress, SyncStatus};
use crate::root::Root;
use crate::scan::discover;
use crate::sync::error::{ErrorKind, Result};
use crate::sync::unit::sync_unit;
use crate::Context;
use exn::ResultExt;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::instrument;

/// Outcome of syncing one root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RootReport {
    pub root: PathBuf,
    /// Candidate units found by the walk.
    pub discovered: usize,
    /// Units inserted or refreshed.
    pub indexed: usize,
    /// Units without any pages.
    pub skipped: usize,
    /// Catalogued units no longer found, deleted with their thumbnails.
    pub removed: usize,
    pub errors: Vec<ScanError>,
}

/// Outcome of syncing every configured root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub roots: Vec<RootReport>,
    /// Catalogued units that belong to no configured root.
    pub unowned_removed: usize,
    /// Thumbnail directories removed because no unit owns them.
    pub swept: Vec<String>,
    /// Every error, across all roots and the cleanup.
    pub errors: Vec<ScanError>,
}

pub struct Synchronizer {
    ctx: Context,
}

impl Synchronizer {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Sync a single root.
    ///
    /// `observer` is told about every walk error as it happens, then once
    /// after each unit. Units under the root that weren't synced successfully
    /// this time are removed from the catalog.
    #[instrument(skip_all, fields(root = %root.path.display()))]
    pub async fn sync_root(&self, root: &Root, observer: &dyn Observer<ScanProgress>) -> RootReport {
        let mut progress = ScanProgress::default();
        let discovery = discover(&*self.ctx.library, &root.path, |error| {
            progress.current_path = Some(error.path.clone());
            progress.errors.push(error.clone());
            observer.notify(&progress);
        })
        .await;
        let total = discovery.candidates.len();
        tracing::info!(candidates = total, errors = progress.errors.len(), "Walk complete");

        progress.total = total;
        let mut report = RootReport {
            root: root.path.clone(),
            discovered: total,
            ..RootReport::default()
        };
        let mut active = HashSet::new();
        for (index, candidate) in discovery.candidates.iter().enumerate() {
            match sync_unit(&self.ctx, root, candidate).await {
                Ok(Some(id)) => {
                    active.insert(id);
                    report.indexed += 1;
                },
                Ok(None) => report.skipped += 1,
                Err(err) => {
                    tracing::warn!(path = %candidate.path.display(), error = ?err, "Failed to sync unit");
                    progress.errors.push(ScanError::new(&candidate.path, &*err));
                },
            }
            progress.current = index + 1;
            progress.current_path = Some(candidate.path.clone());
            observer.notify(&progress);
        }

        match self.ctx.repo.list_comics_under(&root.path).await {
            Ok(comics) => {
                for comic in comics.into_iter().filter(|comic| !active.contains(&comic.id)) {
                    match self.remove_comic(comic.id).await {
                        Ok(()) => report.removed += 1,
                        Err(err) => progress.errors.push(ScanError::new(&comic.path, &*err)),
                    }
                }
            },
            Err(err) => {
                tracing::warn!(error = ?err, "Could not list catalogued units, nothing retired");
                progress.errors.push(ScanError::new(&root.path, &*err));
            },
        }

        tracing::info!(
            indexed = report.indexed,
            skipped = report.skipped,
            removed = report.removed,
            errors = progress.errors.len(),
            "Root synced"
        );
        report.errors = progress.errors;
        report
    }

    /// Sync every root in turn, then drop catalog units outside all of them
    /// and sweep thumbnail directories nobody owns.
    ///
    /// With no roots at all nothing is touched: an empty configuration is
    /// not taken as a request to empty the catalog.
    #[instrument(skip_all, fields(roots = roots.len()))]
    pub async fn sync_all(&self, roots: &[Root], observer: &dyn Observer<SyncProgress>) -> SyncReport {
        let mut report = SyncReport::default();
        if roots.is_empty() {
            tracing::info!("No library roots configured");
            return report;
        }
        let total_paths = roots.len();
        for (index, root) in roots.iter().enumerate() {
            observer.notify(&SyncProgress {
                status: SyncStatus::Scanning,
                current_path_index: index,
                total_paths,
                scan: None,
                errors: report.errors.clone(),
            });
            let previous = &report.errors;
            let forward = |scan: &ScanProgress| {
                let mut errors = previous.clone();
                errors.extend(scan.errors.iter().cloned());
                observer.notify(&SyncProgress {
                    status: SyncStatus::Indexing,
                    current_path_index: index,
                    total_paths,
                    scan: Some(scan.clone()),
                    errors,
                });
            };
            let root_report = self.sync_root(root, &forward).await;
            report.errors.extend(root_report.errors.iter().cloned());
            report.roots.push(root_report);
        }

        match self.ctx.repo.list_comic_paths().await {
            Ok(comics) => {
                for (id, path) in comics {
                    if roots.iter().any(|root| root.contains(&path)) {
                        continue;
                    }
                    match self.remove_comic(id).await {
                        Ok(()) => report.unowned_removed += 1,
                        Err(err) => report.errors.push(ScanError::new(&path, &*err)),
                    }
                }
            },
            Err(err) => report.errors.push(ScanError::new(PathBuf::new(), &*err)),
        }
        if report.unowned_removed > 0 {
            tracing::info!(count = report.unowned_removed, "Removed units outside every root");
        }

        // Sweeping without the full id list would wipe live thumbnails.
        match self.ctx.repo.list_comic_ids().await {
            Ok(ids) => match self.ctx.thumbnails.sweep_orphans(&ids.into_iter().collect()).await {
                Ok(swept) => report.swept = swept,
                Err(err) => report.errors.push(ScanError::new(self.ctx.thumbnails.root(), &*err)),
            },
            Err(err) => report.errors.push(ScanError::new(self.ctx.thumbnails.root(), &*err)),
        }

        observer.notify(&SyncProgress {
            status: SyncStatus::Cleanup,
            current_path_index: total_paths,
            total_paths,
            scan: None,
            errors: report.errors.clone(),
        });
        report
    }

    async fn remove_comic(&self, id: i64) -> Result<()> {
        self.ctx.repo.delete_comic(id).await.or_raise(|| ErrorKind::Catalog)?;
        self.ctx.thumbnails.delete_for_comic(id).await.or_raise(|| ErrorKind::Cleanup)?;
        tracing::debug!(comic_id = id, "Removed unit");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{build_zip, png};
    use crate::thumbnail::{ThumbnailCache, ThumbnailSettings};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tankobon_catalog::{Database, NewComic, Repository, SourceKind};
    use tankobon_render::MockRenderer;
    use tankobon_storage::StorageBackend;
    use tankobon_storage::backend::MockBackend;
    use time::{Duration, UtcDateTime};

    struct Fixture {
        library: Arc<MockBackend>,
        thumbs: Arc<MockBackend>,
        renderer: Arc<MockRenderer>,
        sync: Synchronizer,
    }
    impl Fixture {
        async fn new(library: MockBackend) -> Self {
            let library = Arc::new(library);
            let thumbs = Arc::new(MockBackend::default());
            let renderer = Arc::new(MockRenderer::default());
            let db = Database::connect_in_memory().await.unwrap();
            let cache = ThumbnailCache::new(thumbs.clone(), "/thumbs", ThumbnailSettings::default());
            let ctx = Context::new(library.clone(), Repository::from(&db), cache, renderer.clone());
            Self {
                library,
                thumbs,
                renderer,
                sync: Synchronizer::new(ctx),
            }
        }

        fn repo(&self) -> &Repository {
            &self.sync.context().repo
        }

        async fn comic_id(&self, path: &str) -> Option<i64> {
            self.repo().get_comic_by_path(path).await.unwrap().map(|comic| comic.id)
        }
    }

    fn root(path: &str, pattern: &str) -> Root {
        Root::new(path, pattern.parse().unwrap())
    }

    fn jane() -> MockBackend {
        MockBackend::with_files([
            ("/lib/Jane/MySeries/Issue1/10.png", png(40, 60)),
            ("/lib/Jane/MySeries/Issue1/2.png", png(40, 60)),
            ("/lib/Jane/MySeries/Issue1/1.png", png(40, 60)),
            ("/lib/Jane/MySeries/Issue1/notes.txt", b"not a page".to_vec()),
        ])
    }

    #[tokio::test]
    async fn test_indexes_image_unit() {
        let fixture = Fixture::new(jane()).await;
        let report = fixture.sync.sync_root(&root("/lib", "{artist}/{series}/{issue}"), &()).await;
        assert_eq!((report.discovered, report.indexed, report.skipped, report.removed), (1, 1, 0, 0));
        assert!(report.errors.is_empty());

        let comic = fixture.repo().get_comic_by_path("/lib/Jane/MySeries/Issue1").await.unwrap().unwrap();
        assert_eq!(comic.title, "Issue1");
        assert_eq!(comic.artist.as_deref(), Some("Jane"));
        assert_eq!(comic.series.as_deref(), Some("MySeries"));
        assert_eq!(comic.issue.as_deref(), Some("Issue1"));
        assert_eq!(comic.page_count, 3);
        assert_eq!(comic.cover, Some(PathBuf::from("/lib/Jane/MySeries/Issue1/1.png")));

        let pages = fixture.repo().list_pages(comic.id).await.unwrap();
        let names: Vec<_> = pages.iter().map(|page| page.file_name.as_str()).collect();
        assert_eq!(names, vec!["1.png", "2.png", "10.png"]);
        for page in &pages {
            let expected = PathBuf::from(format!("/thumbs/{}/{}.jpg", comic.id, page.page_number));
            assert_eq!(page.thumbnail.as_ref(), Some(&expected));
        }
        assert_eq!(fixture.thumbs.files().await.len(), 3);
    }

    #[tokio::test]
    async fn test_resync_keeps_ids_state_and_thumbnails() {
        let fixture = Fixture::new(jane()).await;
        let root = root("/lib", "{artist}/{series}/{issue}");
        fixture.sync.sync_root(&root, &()).await;
        let id = fixture.comic_id("/lib/Jane/MySeries/Issue1").await.unwrap();
        assert!(fixture.repo().toggle_comic_favorite(id).await.unwrap());
        let thumbnail = Path::new(&id.to_string()).join("1.jpg");
        let generated = fixture.thumbs.modified(&thumbnail).await.unwrap();

        let report = fixture.sync.sync_root(&root, &()).await;
        assert_eq!((report.indexed, report.removed), (1, 0));
        let comic = fixture.repo().get_comic(id).await.unwrap().unwrap();
        assert!(comic.favorite);
        assert_eq!(fixture.repo().list_pages(id).await.unwrap().len(), 3);
        assert_eq!(fixture.thumbs.modified(&thumbnail).await.unwrap(), generated);
    }

    #[tokio::test]
    async fn test_changed_source_regenerates_thumbnail() {
        let fixture = Fixture::new(jane()).await;
        let root = root("/lib", "{artist}/{series}/{issue}");
        fixture.sync.sync_root(&root, &()).await;
        let id = fixture.comic_id("/lib/Jane/MySeries/Issue1").await.unwrap();
        let thumbnail = Path::new(&id.to_string()).join("2.jpg");
        let stale = UtcDateTime::now() - Duration::days(1);
        fixture.thumbs.set_modified(&thumbnail, stale).await;

        fixture.sync.sync_root(&root, &()).await;
        assert!(fixture.thumbs.modified(&thumbnail).await.unwrap() > stale);
    }

    #[tokio::test]
    async fn test_vanished_unit_is_retired() {
        let library = jane();
        library.write(Path::new("/lib/Bob/Other/One/1.png"), &png(10, 10)).await.unwrap();
        let fixture = Fixture::new(library).await;
        let root = root("/lib", "{artist}/{series}/{issue}");
        assert_eq!(fixture.sync.sync_root(&root, &()).await.indexed, 2);
        let bob = fixture.comic_id("/lib/Bob/Other/One").await.unwrap();

        assert!(fixture.library.remove("/lib/Bob/Other/One/1.png").await);
        let report = fixture.sync.sync_root(&root, &()).await;
        assert_eq!((report.indexed, report.removed), (1, 1));
        assert!(fixture.repo().get_comic(bob).await.unwrap().is_none());
        assert!(fixture.repo().list_pages(bob).await.unwrap().is_empty());
        assert!(fixture.thumbs.files().await.iter().all(|file| !file.starts_with(bob.to_string())));
        assert!(fixture.comic_id("/lib/Jane/MySeries/Issue1").await.is_some());
    }

    #[tokio::test]
    async fn test_unreadable_directory_is_reported_and_siblings_synced() {
        let library = MockBackend::with_files([
            ("/lib/ok/1.png", png(10, 10)),
            ("/lib/locked/1.png", png(10, 10)),
        ])
        .with_failure("/lib/locked");
        let fixture = Fixture::new(library).await;
        let events = Mutex::new(Vec::new());
        let observer = |progress: &ScanProgress| events.lock().unwrap().push(progress.clone());
        let report = fixture.sync.sync_root(&root("/lib", "{issue}"), &observer).await;

        assert_eq!(report.indexed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, PathBuf::from("/lib/locked"));

        let events = events.into_inner().unwrap();
        // The walk error is reported before any unit is processed.
        assert_eq!((events[0].current, events[0].errors.len()), (0, 1));
        let last = events.last().unwrap();
        assert_eq!((last.current, last.total), (1, 1));
        assert_eq!(last.current_path, Some(PathBuf::from("/lib/ok")));
    }

    #[tokio::test]
    async fn test_failing_unit_does_not_stop_the_sync() {
        let library = MockBackend::with_files([
            ("/lib/good/1.png", png(10, 10)),
            ("/lib/bad/1.png", b"not really a png".to_vec()),
        ]);
        let fixture = Fixture::new(library).await;
        let report = fixture.sync.sync_root(&root("/lib", "{issue}"), &()).await;

        assert_eq!(report.indexed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, PathBuf::from("/lib/bad"));
        assert_eq!(report.errors[0].message, "thumbnail generation failed for page 1");
        assert!(fixture.comic_id("/lib/good").await.is_some());
        assert!(fixture.comic_id("/lib/bad").await.is_none());
    }

    #[tokio::test]
    async fn test_units_without_pages_are_skipped() {
        let library = MockBackend::with_files([
            ("/lib/empty.cbz", build_zip(&[("notes.txt", b"nothing here")])),
            ("/lib/zero.pdf", MockRenderer::document(0)),
        ]);
        let fixture = Fixture::new(library).await;
        let report = fixture.sync.sync_root(&root("/lib", "{issue}"), &()).await;
        assert_eq!((report.discovered, report.indexed, report.skipped), (2, 0, 2));
        assert!(fixture.repo().list_comics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_and_archive_units() {
        let library = MockBackend::with_files([
            ("/lib/Bob/Book.pdf", MockRenderer::document(2)),
            ("/lib/Bob/Pack.cbz", build_zip(&[("p10.png", &png(30, 30)), ("p2.png", &png(20, 20))])),
        ]);
        let fixture = Fixture::new(library).await;
        let root = root("/lib", "{artist}/{issue}");
        let report = fixture.sync.sync_root(&root, &()).await;
        assert_eq!(report.indexed, 2);
        assert!(report.errors.is_empty());

        let book = fixture.repo().get_comic_by_path("/lib/Bob/Book.pdf").await.unwrap().unwrap();
        assert_eq!(book.source_kind, SourceKind::Document);
        assert_eq!(book.title, "Book");
        assert_eq!(book.artist.as_deref(), Some("Bob"));
        assert_eq!(book.issue.as_deref(), Some("Book.pdf"));
        let pages = fixture.repo().list_pages(book.id).await.unwrap();
        assert_eq!(pages.iter().map(|page| page.document_page).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
        assert!(pages.iter().all(|page| page.thumbnail.is_some()));
        assert_eq!(fixture.renderer.renders(), 2);

        let pack = fixture.repo().get_comic_by_path("/lib/Bob/Pack.cbz").await.unwrap().unwrap();
        let pages = fixture.repo().list_pages(pack.id).await.unwrap();
        let entries: Vec<_> = pages.iter().filter_map(|page| page.archive_entry.as_deref()).collect();
        assert_eq!(entries, vec!["p2.png", "p10.png"]);
        assert!(pages.iter().all(|page| page.thumbnail.is_some()));

        // Cached thumbnails are reused until the container changes.
        fixture.sync.sync_root(&root, &()).await;
        assert_eq!(fixture.renderer.renders(), 2);
        fixture.library.set_modified("/lib/Bob/Book.pdf", UtcDateTime::now() + Duration::hours(1)).await;
        fixture.sync.sync_root(&root, &()).await;
        assert_eq!(fixture.renderer.renders(), 4);
    }

    #[tokio::test]
    async fn test_sync_all() {
        let library = MockBackend::with_files([
            ("/one/Jane/MySeries/Issue1/1.png", png(10, 10)),
            ("/two/Bob/Pack.cbz", build_zip(&[("1.png", &png(10, 10))])),
        ]);
        let fixture = Fixture::new(library).await;
        let outside = NewComic {
            path: PathBuf::from("/gone/Old"),
            source_kind: SourceKind::Image,
            title: "Old".to_string(),
            artist: None,
            series: None,
            issue: None,
            cover: None,
            page_count: 0,
        };
        let outside = fixture.repo().upsert_comic(&outside).await.unwrap();
        fixture.thumbs.write(&Path::new(&outside.to_string()).join("1.jpg"), b"old").await.unwrap();
        fixture.thumbs.write(Path::new("9999/1.jpg"), b"stray").await.unwrap();

        let roots = [
            root("/one", "{artist}/{series}/{issue}"),
            root("/two", "{artist}/{issue}"),
            root("/missing", "{issue}"),
        ];
        let events = Mutex::new(Vec::new());
        let observer = |progress: &SyncProgress| events.lock().unwrap().push(progress.clone());
        let report = fixture.sync.sync_all(&roots, &observer).await;

        assert_eq!(report.roots.iter().map(|root| root.indexed).collect::<Vec<_>>(), vec![1, 1, 0]);
        assert_eq!(report.unowned_removed, 1);
        assert_eq!(report.swept, vec!["9999".to_string()]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, PathBuf::from("/missing"));
        assert!(fixture.repo().get_comic(outside).await.unwrap().is_none());
        assert_eq!(fixture.repo().list_comic_ids().await.unwrap().len(), 2);

        let events = events.into_inner().unwrap();
        let statuses: Vec<_> = events.iter().map(|event| (event.status, event.current_path_index)).collect();
        assert_eq!(statuses.first(), Some(&(SyncStatus::Scanning, 0)));
        assert!(statuses.contains(&(SyncStatus::Indexing, 1)));
        assert!(statuses.contains(&(SyncStatus::Scanning, 2)));
        assert_eq!(statuses.last(), Some(&(SyncStatus::Cleanup, 3)));
        assert!(events.iter().all(|event| event.total_paths == 3));
        assert_eq!(events.last().unwrap().errors, report.errors);
    }

    #[tokio::test]
    async fn test_sync_all_without_roots_touches_nothing() {
        let fixture = Fixture::new(jane()).await;
        fixture.sync.sync_root(&root("/lib", "{artist}/{series}/{issue}"), &()).await;
        let report = fixture.sync.sync_all(&[], &()).await;
        assert_eq!(report, SyncReport::default());
        assert_eq!(fixture.repo().list_comic_ids().await.unwrap().len(), 1);
        assert_eq!(fixture.thumbs.files().await.len(), 3);
    }
}
