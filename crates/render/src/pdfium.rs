use crate::error::{ErrorKind, Result};
use crate::{DocumentRenderer, EncodedPage, Encoding, RenderSize, encode};
use exn::ResultExt;
use pdfium_render::prelude::{PdfDocument, PdfPageIndex, PdfRenderConfig, Pdfium};
use std::ops::ControlFlow;
use std::path::Path;
use tracing::instrument;

/// PDF renderer backed by the pdfium shared library.
///
/// ```no_run
/// use tankobon_render::{DocumentRenderer, Encoding, PdfiumRenderer, RenderSize};
///
/// # fn example(pdf: &[u8]) -> tankobon_render::error::Result<()> {
/// let renderer = PdfiumRenderer::bind(None)?;
/// let first = renderer.render_page(pdf, 1, RenderSize::Scale(1.2), Encoding::Jpeg { quality: 90 })?;
/// println!("{}x{}", first.width, first.height);
/// # Ok(())
/// # }
/// ```
pub struct PdfiumRenderer {
    pdfium: Pdfium,
}

impl PdfiumRenderer {
    /// Bind to pdfium, looking in `directory` first (when given) and then
    /// wherever the system keeps its shared libraries.
    pub fn bind(directory: Option<&Path>) -> Result<Self> {
        let bindings = match directory {
            Some(directory) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(directory))
                .or_else(|err| {
                    tracing::warn!(directory = %directory.display(), error = %err, "pdfium not found in configured directory, trying system library");
                    Pdfium::bind_to_system_library()
                }),
            None => Pdfium::bind_to_system_library(),
        };
        let bindings = bindings.or_raise(|| ErrorKind::Binding)?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    fn open<'a>(&'a self, document: &'a [u8]) -> Result<PdfDocument<'a>> {
        self.pdfium.load_pdf_from_byte_slice(document, None).or_raise(|| ErrorKind::Load)
    }

    fn count(document: &PdfDocument<'_>) -> Result<u32> {
        u32::try_from(document.pages().len()).or_raise(|| ErrorKind::Load)
    }

    fn config(size: RenderSize) -> Result<PdfRenderConfig> {
        match size {
            RenderSize::Scale(factor) if factor.is_finite() && factor > 0.0 => {
                Ok(PdfRenderConfig::new().scale_page_by_factor(factor))
            },
            RenderSize::Fit(max) if max > 0 => {
                let max = i32::try_from(max).unwrap_or(i32::MAX);
                Ok(PdfRenderConfig::new().set_target_width(max).set_maximum_height(max))
            },
            other => exn::bail!(ErrorKind::InvalidSettings(format!("{other:?}"))),
        }
    }

    /// Render one page of an already open document. The page handle and its
    /// bitmap are dropped before this returns.
    fn render_one(
        document: &PdfDocument<'_>,
        count: u32,
        page: u32,
        config: &PdfRenderConfig,
        encoding: Encoding,
    ) -> Result<EncodedPage> {
        if page == 0 || page > count {
            exn::bail!(ErrorKind::PageOutOfRange { page, count });
        }
        let index = PdfPageIndex::try_from(page - 1).or_raise(|| ErrorKind::PageOutOfRange { page, count })?;
        let image = {
            let handle = document.pages().get(index).or_raise(|| ErrorKind::Render(page))?;
            let bitmap = handle.render_with_config(config).or_raise(|| ErrorKind::Render(page))?;
            bitmap.as_image()
        };
        Ok(EncodedPage {
            page_number: page,
            width: image.width(),
            height: image.height(),
            encoding,
            bytes: encode(&image, encoding)?,
        })
    }
}

impl DocumentRenderer for PdfiumRenderer {
    #[instrument(level = "debug", skip_all, fields(bytes = document.len()))]
    fn page_count(&self, document: &[u8]) -> Result<u32> {
        let document = self.open(document)?;
        Self::count(&document)
    }

    #[instrument(level = "debug", skip(self, document), fields(bytes = document.len()))]
    fn render_page(&self, document: &[u8], page: u32, size: RenderSize, encoding: Encoding) -> Result<EncodedPage> {
        let config = Self::config(size)?;
        let document = self.open(document)?;
        let count = Self::count(&document)?;
        Self::render_one(&document, count, page, &config, encoding)
    }

    #[instrument(level = "debug", skip(self, document, sink), fields(bytes = document.len()))]
    fn render_pages(
        &self,
        document: &[u8],
        pages: &[u32],
        size: RenderSize,
        encoding: Encoding,
        sink: &mut dyn FnMut(Result<EncodedPage>) -> ControlFlow<()>,
    ) -> Result<()> {
        let config = Self::config(size)?;
        let document = self.open(document)?;
        let count = Self::count(&document)?;
        for &page in pages {
            let rendered = Self::render_one(&document, count, page, &config, encoding);
            if sink(rendered).is_break() {
                tracing::debug!(page, "Batch render stopped by consumer");
                break;
            }
        }
        Ok(())
    }
}
