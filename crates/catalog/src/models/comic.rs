use super::{SourceKind, count, path_to_text, timestamp};
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::path::PathBuf;
use time::UtcDateTime;

/// A catalogued comic: one image folder, document or archive.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ComicUnit {
    pub id: i64,
    /// Absolute path of the folder or file, unique across the catalog
    pub path: PathBuf,
    pub source_kind: SourceKind,
    pub title: String,
    pub artist: Option<String>,
    pub series: Option<String>,
    pub issue: Option<String>,
    /// File path of the first page
    pub cover: Option<PathBuf>,
    pub page_count: u32,
    pub favorite: bool,
    pub view_count: u32,
    pub bookmark_page: Option<u32>,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
    pub last_opened_at: Option<UtcDateTime>,
}

/// Scanner-owned fields of a comic, as written by
/// [`Repository::upsert_comic`](crate::Repository::upsert_comic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComic {
    pub path: PathBuf,
    pub source_kind: SourceKind,
    pub title: String,
    pub artist: Option<String>,
    pub series: Option<String>,
    pub issue: Option<String>,
    pub cover: Option<PathBuf>,
    pub page_count: u32,
}

#[derive(sqlx::FromRow)]
pub(crate) struct ComicRow {
    id: i64,
    path: String,
    source_kind: String,
    title: String,
    artist: Option<String>,
    series: Option<String>,
    issue: Option<String>,
    cover: Option<String>,
    page_count: i64,
    favorite: bool,
    view_count: i64,
    bookmark_page: Option<i64>,
    created_at: i64,
    updated_at: i64,
    last_opened_at: Option<i64>,
}
impl TryFrom<ComicRow> for ComicUnit {
    type Error = Error;
    fn try_from(row: ComicRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            path: PathBuf::from(row.path),
            source_kind: row.source_kind.parse()?,
            title: row.title,
            artist: row.artist,
            series: row.series,
            issue: row.issue,
            cover: row.cover.map(PathBuf::from),
            page_count: count(row.page_count, "page count")?,
            favorite: row.favorite,
            view_count: count(row.view_count, "view count")?,
            bookmark_page: row.bookmark_page.map(|page| count(page, "bookmark page")).transpose()?,
            created_at: timestamp(row.created_at, "created at")?,
            updated_at: timestamp(row.updated_at, "updated at")?,
            last_opened_at: row.last_opened_at.map(|at| timestamp(at, "last opened at")).transpose()?,
        })
    }
}

/// Bind-ready form of [`NewComic`].
pub(crate) struct NewComicRow {
    pub(crate) path: String,
    pub(crate) source_kind: &'static str,
    pub(crate) title: String,
    pub(crate) artist: Option<String>,
    pub(crate) series: Option<String>,
    pub(crate) issue: Option<String>,
    pub(crate) cover: Option<String>,
    pub(crate) page_count: i64,
}
impl TryFrom<&NewComic> for NewComicRow {
    type Error = Error;
    fn try_from(comic: &NewComic) -> Result<Self> {
        Ok(Self {
            path: path_to_text(&comic.path, "path")?,
            source_kind: comic.source_kind.as_str(),
            title: comic.title.clone(),
            artist: comic.artist.clone(),
            series: comic.series.clone(),
            issue: comic.issue.clone(),
            cover: comic.cover.as_ref().map(|cover| path_to_text(cover, "cover")).transpose()?,
            page_count: i64::try_from(comic.page_count).or_raise(|| ErrorKind::InvalidData("page count"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ComicRow {
        ComicRow {
            id: 7,
            path: "/lib/Jane/MySeries/Issue1".to_string(),
            source_kind: "image".to_string(),
            title: "Issue1".to_string(),
            artist: Some("Jane".to_string()),
            series: Some("MySeries".to_string()),
            issue: Some("Issue1".to_string()),
            cover: Some("/lib/Jane/MySeries/Issue1/001.png".to_string()),
            page_count: 3,
            favorite: true,
            view_count: 2,
            bookmark_page: None,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_100,
            last_opened_at: None,
        }
    }

    #[test]
    fn test_row_to_model() {
        let model = ComicUnit::try_from(row()).unwrap();
        assert_eq!(model.source_kind, SourceKind::Image);
        assert_eq!(model.page_count, 3);
        assert_eq!(model.cover, Some(PathBuf::from("/lib/Jane/MySeries/Issue1/001.png")));
        assert_eq!(model.updated_at.unix_timestamp(), 1_700_000_100);
    }

    #[test]
    fn test_row_with_bad_kind_is_rejected() {
        let mut bad = row();
        bad.source_kind = "cbr".to_string();
        assert!(ComicUnit::try_from(bad).is_err());
    }
}
