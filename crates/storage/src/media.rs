//! File classification by extension.
//!
//! Matching is ASCII case-insensitive: `001.PNG` is an image and `Vol 1.CBZ`
//! an archive.

use std::path::Path;

/// Raster formats accepted as comic pages.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];
/// Paged documents rasterized on demand.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];
/// ZIP-based comic containers.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["cbz", "zip"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|candidate| ext.eq_ignore_ascii_case(candidate)))
}

pub fn is_image(path: impl AsRef<Path>) -> bool {
    has_extension(path.as_ref(), IMAGE_EXTENSIONS)
}

pub fn is_document(path: impl AsRef<Path>) -> bool {
    has_extension(path.as_ref(), DOCUMENT_EXTENSIONS)
}

pub fn is_archive(path: impl AsRef<Path>) -> bool {
    has_extension(path.as_ref(), ARCHIVE_EXTENSIONS)
}

/// MIME type for an image file name, used when handing raw entry bytes to a
/// viewer.
pub fn image_mime(path: impl AsRef<Path>) -> &'static str {
    let ext = path.as_ref().extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("001.png", true)]
    #[case("001.PNG", true)]
    #[case("cover.Jpeg", true)]
    #[case("anim.gif", true)]
    #[case("page.webp", true)]
    #[case("scan.bmp", true)]
    #[case("notes.txt", false)]
    #[case("png", false)]
    #[case("archive.cbz", false)]
    fn test_is_image(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image(name), expected);
    }

    #[rstest]
    #[case("Vol 1.cbz", true)]
    #[case("Vol 1.CBZ", true)]
    #[case("Vol 1.zip", true)]
    #[case("Vol 1.cbr", false)]
    #[case("Vol 1.pdf", false)]
    fn test_is_archive(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_archive(name), expected);
    }

    #[test]
    fn test_is_document() {
        assert!(is_document("/lib/Book.pdf"));
        assert!(is_document("/lib/Book.PDF"));
        assert!(!is_document("/lib/Book.epub"));
    }

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime("a/01.JPG"), "image/jpeg");
        assert_eq!(image_mime("02.webp"), "image/webp");
        assert_eq!(image_mime("03"), "application/octet-stream");
    }
}
