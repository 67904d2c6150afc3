//! Document rasterization.
//!
//! A [`DocumentRenderer`] turns pages of a paged document (PDF) into encoded
//! images. Renderers are synchronous and CPU-bound; async callers are
//! expected to run them on a blocking thread.
//!
//! Native handles never outlive the call that opened them: every page's
//! bitmap is released before the next page is touched, and the document is
//! released before the call returns, whether it succeeded or not.

mod encode;
pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod pdfium;

pub use crate::encode::{encode, to_data_url};
use crate::error::Result;
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockRenderer;
pub use crate::pdfium::PdfiumRenderer;
use std::ops::ControlFlow;
use std::sync::Arc;

pub type RendererHandle = Arc<dyn DocumentRenderer>;

/// Target size of a rendered page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderSize {
    /// Multiply the page's natural size (in points) by this factor.
    Scale(f32),
    /// Fit the page inside a square of this many pixels, keeping its aspect
    /// ratio.
    Fit(u32),
}

/// Output format of a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// JPEG with a quality between 1 and 100.
    Jpeg { quality: u8 },
    /// Lossless PNG.
    Png,
}
impl Encoding {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// A single rendered and encoded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPage {
    /// 1-based page number within the document
    pub page_number: u32,
    pub width: u32,
    pub height: u32,
    pub encoding: Encoding,
    pub bytes: Vec<u8>,
}
impl EncodedPage {
    pub fn mime(&self) -> &'static str {
        self.encoding.mime()
    }

    /// `data:` URL embedding the encoded bytes.
    pub fn to_data_url(&self) -> String {
        to_data_url(self.mime(), &self.bytes)
    }
}

/// Rasterizes pages of a paged document held in memory.
///
/// Page numbers are 1-based throughout.
pub trait DocumentRenderer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, document: &[u8]) -> Result<u32>;

    /// Render one page.
    fn render_page(&self, document: &[u8], page: u32, size: RenderSize, encoding: Encoding) -> Result<EncodedPage>;

    /// Render several pages of one document, opening it only once.
    ///
    /// Each page is handed to `sink` as soon as it is encoded; a failure on
    /// one page is passed to `sink` and does not stop the batch. Returning
    /// [`ControlFlow::Break`] from `sink` stops rendering early. Only a
    /// document that can't be opened at all fails the whole call.
    fn render_pages(
        &self,
        document: &[u8],
        pages: &[u32],
        size: RenderSize,
        encoding: Encoding,
        sink: &mut dyn FnMut(Result<EncodedPage>) -> ControlFlow<()>,
    ) -> Result<()>;
}
