//! Deterministic renderer for tests that don't have pdfium around.

use crate::error::{ErrorKind, Result};
use crate::{DocumentRenderer, EncodedPage, Encoding, RenderSize, encode};
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Natural page size in points.
const PAGE_WIDTH: u32 = 60;
const PAGE_HEIGHT: u32 = 90;

/// Fake document renderer.
///
/// A "document" is any byte string of the form `pages=N` (surrounding
/// whitespace allowed); anything else fails to load. Every page renders as a
/// flat 60x90 bitmap (before scaling) whose colour depends on the page
/// number, so different pages produce different bytes.
///
/// ```
/// use tankobon_render::{DocumentRenderer, MockRenderer};
///
/// let renderer = MockRenderer::default();
/// assert_eq!(renderer.page_count(b"pages=3").unwrap(), 3);
/// assert!(renderer.page_count(b"%PDF-1.7").is_err());
/// ```
#[derive(Default)]
pub struct MockRenderer {
    renders: AtomicUsize,
    failing_pages: HashSet<u32>,
}

impl MockRenderer {
    /// Make rendering `page` fail with [`ErrorKind::Render`].
    pub fn with_failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    /// How many pages have been rendered so far.
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Bytes of a mock document with `pages` pages.
    pub fn document(pages: u32) -> Vec<u8> {
        format!("pages={pages}").into_bytes()
    }

    fn parse(document: &[u8]) -> Result<u32> {
        std::str::from_utf8(document)
            .ok()
            .and_then(|text| text.trim().strip_prefix("pages="))
            .and_then(|count| count.parse().ok())
            .ok_or_else(|| exn::Exn::from(ErrorKind::Load))
    }

    fn dimensions(size: RenderSize) -> Result<(u32, u32)> {
        match size {
            RenderSize::Scale(factor) if factor.is_finite() && factor > 0.0 => Ok((
                ((PAGE_WIDTH as f32 * factor).round() as u32).max(1),
                ((PAGE_HEIGHT as f32 * factor).round() as u32).max(1),
            )),
            RenderSize::Fit(max) if max > 0 => {
                let scale = f64::min(max as f64 / PAGE_WIDTH as f64, max as f64 / PAGE_HEIGHT as f64);
                Ok((
                    ((PAGE_WIDTH as f64 * scale).round() as u32).max(1),
                    ((PAGE_HEIGHT as f64 * scale).round() as u32).max(1),
                ))
            },
            other => exn::bail!(ErrorKind::InvalidSettings(format!("{other:?}"))),
        }
    }

    fn render_one(&self, count: u32, page: u32, size: RenderSize, encoding: Encoding) -> Result<EncodedPage> {
        if page == 0 || page > count {
            exn::bail!(ErrorKind::PageOutOfRange { page, count });
        }
        if self.failing_pages.contains(&page) {
            exn::bail!(ErrorKind::Render(page));
        }
        let (width, height) = Self::dimensions(size)?;
        let shade = (page.wrapping_mul(37) % 256) as u8;
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([shade, 255 - shade, 128])));
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(EncodedPage {
            page_number: page,
            width,
            height,
            encoding,
            bytes: encode(&image, encoding)?,
        })
    }
}

impl DocumentRenderer for MockRenderer {
    fn page_count(&self, document: &[u8]) -> Result<u32> {
        Self::parse(document)
    }

    fn render_page(&self, document: &[u8], page: u32, size: RenderSize, encoding: Encoding) -> Result<EncodedPage> {
        let count = Self::parse(document)?;
        self.render_one(count, page, size, encoding)
    }

    fn render_pages(
        &self,
        document: &[u8],
        pages: &[u32],
        size: RenderSize,
        encoding: Encoding,
        sink: &mut dyn FnMut(Result<EncodedPage>) -> ControlFlow<()>,
    ) -> Result<()> {
        let count = Self::parse(document)?;
        for &page in pages {
            if sink(self.render_one(count, page, size, encoding)).is_break() {
                break;
            }
        }
        Ok(())
    }
}
