//! Repository for comic units and their pages.
//!
//! Comics and pages are tightly coupled: a page can't exist without its
//! comic, and deleting a comic cascades to its pages.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{ComicRow, ComicUnit, NewComic, NewComicRow, NewPage, NewPageRow, PageDescriptor, PageRow};
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::instrument;

/// Repository for managing comic and page entries in the catalog database.
///
/// Columns fall in two groups. Scanner-owned columns (title, metadata, page
/// sources) are rewritten on every upsert. Reader-owned columns (favorite,
/// view count, bookmark, last opened) are only changed by the dedicated
/// methods further down and survive any number of rescans.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn sqlx_hates_paths(path: impl AsRef<Path>) -> Result<String> {
        Ok(path.as_ref().to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string())
    }

    fn now() -> i64 {
        UtcDateTime::now().unix_timestamp()
    }

    // =========================================================================
    // Comics
    // =========================================================================

    /// Insert a comic, or refresh the one already recorded at the same path.
    ///
    /// Returns the comic's id, which is stable across refreshes.
    #[instrument(level = "debug", skip_all, fields(path = %comic.path.display()))]
    pub async fn upsert_comic(&self, comic: &NewComic) -> Result<i64> {
        let row = NewComicRow::try_from(comic)?;
        let id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_comic.sql"))
            .bind(row.path)
            .bind(row.source_kind)
            .bind(row.title)
            .bind(row.artist)
            .bind(row.series)
            .bind(row.issue)
            .bind(row.cover)
            .bind(row.page_count)
            .bind(Self::now())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(id)
    }

    pub async fn get_comic(&self, id: i64) -> Result<Option<ComicUnit>> {
        let row: Option<ComicRow> = sqlx::query_as(include_str!("../queries/get_comic.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(ComicUnit::try_from).transpose()
    }

    pub async fn get_comic_by_path(&self, path: impl AsRef<Path>) -> Result<Option<ComicUnit>> {
        let row: Option<ComicRow> = sqlx::query_as(include_str!("../queries/get_comic_by_path.sql"))
            .bind(Self::sqlx_hates_paths(path)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(ComicUnit::try_from).transpose()
    }

    /// List every comic, ordered by title.
    pub async fn list_comics(&self) -> Result<Vec<ComicUnit>> {
        let rows: Vec<ComicRow> = sqlx::query_as(include_str!("../queries/list_comics.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ComicUnit::try_from).collect()
    }

    pub async fn list_favorite_comics(&self) -> Result<Vec<ComicUnit>> {
        let rows: Vec<ComicRow> = sqlx::query_as(include_str!("../queries/list_favorite_comics.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ComicUnit::try_from).collect()
    }

    /// List the comics stored at `root` or anywhere beneath it.
    ///
    /// Membership is decided per path component: `/lib/a` does not contain
    /// `/lib/ab`.
    pub async fn list_comics_under(&self, root: impl AsRef<Path>) -> Result<Vec<ComicUnit>> {
        let root = Self::sqlx_hates_paths(root)?;
        let prefix = if root.ends_with('/') { root.clone() } else { format!("{root}/") };
        let rows: Vec<ComicRow> = sqlx::query_as(include_str!("../queries/list_comics_under.sql"))
            .bind(root)
            .bind(prefix)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ComicUnit::try_from).collect()
    }

    pub async fn list_comic_ids(&self) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(include_str!("../queries/list_comic_ids.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(ids)
    }

    /// List `(id, path)` for every comic.
    ///
    /// Cheaper than [`list_comics`](Self::list_comics) when only membership
    /// is needed (e.g., finding comics outside every configured root).
    pub async fn list_comic_paths(&self) -> Result<Vec<(i64, PathBuf)>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(include_str!("../queries/list_comic_paths.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(|(id, path)| (id, PathBuf::from(path))).collect())
    }

    /// Delete a comic and (by cascade) all of its pages.
    ///
    /// Returns `false` if there was nothing to delete.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_comic(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_comic.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Pages
    // =========================================================================

    /// List a comic's pages in page order.
    pub async fn list_pages(&self, comic_id: i64) -> Result<Vec<PageDescriptor>> {
        let rows: Vec<PageRow> = sqlx::query_as(include_str!("../queries/list_pages.sql"))
            .bind(comic_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(PageDescriptor::try_from).collect()
    }

    pub async fn get_page(&self, id: i64) -> Result<Option<PageDescriptor>> {
        let row: Option<PageRow> = sqlx::query_as(include_str!("../queries/get_page.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(PageDescriptor::try_from).transpose()
    }

    /// Replace a comic's page list.
    ///
    /// `pages` must be numbered `1..=pages.len()` in order. Existing pages are
    /// updated in place (keeping their ids and reader state), and any page
    /// numbered beyond the new count is deleted. Both happen in a single
    /// transaction so readers never see a half-written list.
    #[instrument(level = "debug", skip(self, pages), fields(pages = pages.len()))]
    pub async fn upsert_pages(&self, comic_id: i64, pages: &[NewPage]) -> Result<()> {
        let rows = pages
            .iter()
            .enumerate()
            .map(|(index, page)| {
                if u32::try_from(index + 1).ok() != Some(page.page_number) {
                    exn::bail!(ErrorKind::InvalidData("page number"));
                }
                NewPageRow::try_from(page)
            })
            .collect::<Result<Vec<_>>>()?;
        let count = i64::try_from(rows.len()).or_raise(|| ErrorKind::InvalidData("page count"))?;

        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for row in rows {
            sqlx::query(include_str!("../queries/upsert_page.sql"))
                .bind(comic_id)
                .bind(row.page_number)
                .bind(row.source_kind)
                .bind(row.file_path)
                .bind(row.file_name)
                .bind(row.thumbnail)
                .bind(row.source_path)
                .bind(row.archive_entry)
                .bind(row.document_page)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        sqlx::query(include_str!("../queries/trim_pages.sql"))
            .bind(comic_id)
            .bind(count)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    // =========================================================================
    // Reader State
    // =========================================================================

    /// Flip a comic's favorite flag, returning the new value.
    pub async fn toggle_comic_favorite(&self, id: i64) -> Result<bool> {
        let favorite: Option<bool> = sqlx::query_scalar(include_str!("../queries/toggle_comic_favorite.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        favorite.ok_or_raise(|| ErrorKind::ComicNotFound(id))
    }

    /// Returns the new view count.
    pub async fn increment_comic_view_count(&self, id: i64) -> Result<u32> {
        let views: Option<i64> = sqlx::query_scalar(include_str!("../queries/increment_comic_view_count.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let views = views.ok_or_raise(|| ErrorKind::ComicNotFound(id))?;
        u32::try_from(views).or_raise(|| ErrorKind::InvalidData("view count"))
    }

    /// Remember where the reader stopped; `None` clears the bookmark.
    pub async fn set_bookmark_page(&self, id: i64, page: Option<u32>) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/set_bookmark_page.sql"))
            .bind(id)
            .bind(page.map(i64::from))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::ComicNotFound(id));
        }
        Ok(())
    }

    pub async fn record_comic_opened(&self, id: i64) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/record_comic_opened.sql"))
            .bind(id)
            .bind(Self::now())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::ComicNotFound(id));
        }
        Ok(())
    }

    pub async fn toggle_page_favorite(&self, id: i64) -> Result<bool> {
        let favorite: Option<bool> = sqlx::query_scalar(include_str!("../queries/toggle_page_favorite.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        favorite.ok_or_raise(|| ErrorKind::PageNotFound(id))
    }

    pub async fn increment_page_view_count(&self, id: i64) -> Result<u32> {
        let views: Option<i64> = sqlx::query_scalar(include_str!("../queries/increment_page_view_count.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let views = views.ok_or_raise(|| ErrorKind::PageNotFound(id))?;
        u32::try_from(views).or_raise(|| ErrorKind::InvalidData("view count"))
    }

    pub async fn record_page_opened(&self, id: i64) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/record_page_opened.sql"))
            .bind(id)
            .bind(Self::now())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::PageNotFound(id));
        }
        Ok(())
    }
}
