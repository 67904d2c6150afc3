use super::{SourceKind, count, optional_path, path_to_text, timestamp};
use crate::error::{Error, ErrorKind, Result};
use std::path::PathBuf;
use time::UtcDateTime;

/// One page of a catalogued comic.
///
/// Which of the source fields are set depends on the kind:
/// - image: `file_path` is the image file itself;
/// - document: `source_path` is the document and `document_page` the page
///   inside it;
/// - archive: `source_path` is the container and `archive_entry` the entry
///   name inside it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PageDescriptor {
    pub id: i64,
    pub comic_id: i64,
    /// 1-based, contiguous within a comic
    pub page_number: u32,
    pub source_kind: SourceKind,
    pub file_path: PathBuf,
    pub file_name: String,
    pub thumbnail: Option<PathBuf>,
    pub source_path: Option<PathBuf>,
    pub archive_entry: Option<String>,
    pub document_page: Option<u32>,
    pub favorite: bool,
    pub view_count: u32,
    pub last_opened_at: Option<UtcDateTime>,
}

/// Scanner-owned fields of a page, as written by
/// [`Repository::upsert_pages`](crate::Repository::upsert_pages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    pub page_number: u32,
    pub source_kind: SourceKind,
    pub file_path: PathBuf,
    pub file_name: String,
    /// `None` keeps whatever thumbnail is already recorded.
    pub thumbnail: Option<PathBuf>,
    pub source_path: Option<PathBuf>,
    pub archive_entry: Option<String>,
    pub document_page: Option<u32>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct PageRow {
    id: i64,
    comic_id: i64,
    page_number: i64,
    source_kind: String,
    file_path: String,
    file_name: String,
    thumbnail: Option<String>,
    source_path: Option<String>,
    archive_entry: Option<String>,
    document_page: Option<i64>,
    favorite: bool,
    view_count: i64,
    last_opened_at: Option<i64>,
}
impl TryFrom<PageRow> for PageDescriptor {
    type Error = Error;
    fn try_from(row: PageRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            comic_id: row.comic_id,
            page_number: count(row.page_number, "page number")?,
            source_kind: row.source_kind.parse()?,
            file_path: PathBuf::from(row.file_path),
            file_name: row.file_name,
            thumbnail: optional_path(row.thumbnail),
            source_path: optional_path(row.source_path),
            archive_entry: row.archive_entry,
            document_page: row.document_page.map(|page| count(page, "document page")).transpose()?,
            favorite: row.favorite,
            view_count: count(row.view_count, "view count")?,
            last_opened_at: row.last_opened_at.map(|at| timestamp(at, "last opened at")).transpose()?,
        })
    }
}

/// Bind-ready form of [`NewPage`].
pub(crate) struct NewPageRow {
    pub(crate) page_number: i64,
    pub(crate) source_kind: &'static str,
    pub(crate) file_path: String,
    pub(crate) file_name: String,
    pub(crate) thumbnail: Option<String>,
    pub(crate) source_path: Option<String>,
    pub(crate) archive_entry: Option<String>,
    pub(crate) document_page: Option<i64>,
}
impl TryFrom<&NewPage> for NewPageRow {
    type Error = Error;
    fn try_from(page: &NewPage) -> Result<Self> {
        if page.page_number == 0 {
            exn::bail!(ErrorKind::InvalidData("page number"));
        }
        Ok(Self {
            page_number: i64::from(page.page_number),
            source_kind: page.source_kind.as_str(),
            file_path: path_to_text(&page.file_path, "file path")?,
            file_name: page.file_name.clone(),
            thumbnail: page.thumbnail.as_ref().map(|path| path_to_text(path, "thumbnail")).transpose()?,
            source_path: page.source_path.as_ref().map(|path| path_to_text(path, "source path")).transpose()?,
            archive_entry: page.archive_entry.clone(),
            document_page: page.document_page.map(i64::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_row_to_model() {
        let row = PageRow {
            id: 1,
            comic_id: 4,
            page_number: 2,
            source_kind: "archive".to_string(),
            file_path: "/lib/Pack.cbz".to_string(),
            file_name: "02.jpg".to_string(),
            thumbnail: None,
            source_path: Some("/lib/Pack.cbz".to_string()),
            archive_entry: Some("pages/02.jpg".to_string()),
            document_page: None,
            favorite: false,
            view_count: 0,
            last_opened_at: Some(1_700_000_000),
        };
        let model = PageDescriptor::try_from(row).unwrap();
        assert_eq!(model.source_kind, SourceKind::Archive);
        assert_eq!(model.archive_entry.as_deref(), Some("pages/02.jpg"));
        assert_eq!(model.last_opened_at.map(|at| at.unix_timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_page_zero_rejected() {
        let page = NewPage {
            page_number: 0,
            source_kind: SourceKind::Image,
            file_path: PathBuf::from("/lib/a/0.png"),
            file_name: "0.png".to_string(),
            thumbnail: None,
            source_path: None,
            archive_entry: None,
            document_page: None,
        };
        assert!(NewPageRow::try_from(&page).is_err());
    }
}
