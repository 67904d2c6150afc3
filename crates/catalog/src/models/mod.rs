mod comic;
mod page;

pub use self::comic::{ComicUnit, NewComic};
pub(crate) use self::comic::{ComicRow, NewComicRow};
pub use self::page::{NewPage, PageDescriptor};
pub(crate) use self::page::{NewPageRow, PageRow};
use crate::error::{Error, ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use time::UtcDateTime;

/// How a unit's pages are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A directory of image files, one page per file.
    Image,
    /// A paged document (PDF), rasterized on demand.
    Document,
    /// A ZIP-based container of image entries.
    Archive,
}
impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Archive => "archive",
        }
    }
}
impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            "archive" => Ok(Self::Archive),
            _ => exn::bail!(ErrorKind::InvalidData("source kind")),
        }
    }
}

pub(crate) fn path_to_text(path: impl AsRef<Path>, field: &'static str) -> Result<String> {
    Ok(path.as_ref().to_str().ok_or_raise(|| ErrorKind::InvalidData(field))?.to_string())
}

pub(crate) fn timestamp(value: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn count(value: i64, field: &'static str) -> Result<u32> {
    u32::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn optional_path(value: Option<String>) -> Option<PathBuf> {
    value.map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SourceKind::Image, "image")]
    #[case(SourceKind::Document, "document")]
    #[case(SourceKind::Archive, "archive")]
    fn test_source_kind_text(#[case] kind: SourceKind, #[case] text: &str) {
        assert_eq!(kind.to_string(), text);
        assert_eq!(text.parse::<SourceKind>().unwrap(), kind);
    }

    #[test]
    fn test_unknown_source_kind() {
        let err = "pdf".parse::<SourceKind>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("source kind")));
    }

    #[test]
    fn test_negative_count_rejected() {
        assert!(count(-1, "page count").is_err());
        assert_eq!(count(12, "page count").unwrap(), 12);
    }
}
