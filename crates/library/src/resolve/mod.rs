//! Turning catalogued pages into something a viewer can display.
//!
//! Image pages are handed out as `file://` URLs and never decoded. Document
//! pages are rasterized into `data:` URLs, and archive entries are published
//! in the [`BlobStore`] under `blob:` URLs. Results are memoized in a bounded
//! LRU keyed by every field that affects the output, so a catalog change
//! simply produces a new key.

mod batch;
mod blob;
pub mod error;

pub use self::batch::render_document_pages;
pub use self::blob::{Blob, BlobStore};
use crate::resolve::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tankobon_catalog::{PageDescriptor, SourceKind};
use tankobon_config::Config;
use tankobon_render::{EncodedPage, Encoding, RenderSize, RendererHandle};
use tankobon_storage::{BackendHandle, archive, media};
use tokio::sync::Mutex;
use tracing::instrument;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// The page at reading size.
    Full,
    /// A small rendition for grids and scrubbers.
    Preview,
}

/// A displayable page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// `file://` URL of a file on disk.
    Locator(Url),
    /// `data:` URL with the encoded image inline.
    DataUrl(String),
    /// `blob:` URL registered in the resolver's [`BlobStore`].
    Blob(String),
}
impl Resolved {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Locator(url) => url.as_str(),
            Self::DataUrl(url) | Self::Blob(url) => url,
        }
    }
}
impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolveKey {
    variant: Variant,
    page_id: i64,
    source_kind: SourceKind,
    source_path: Option<PathBuf>,
    archive_entry: Option<String>,
    document_page: Option<u32>,
    file_path: PathBuf,
    thumbnail: Option<PathBuf>,
}
impl ResolveKey {
    fn new(page: &PageDescriptor, variant: Variant) -> Self {
        Self {
            variant,
            page_id: page.id,
            source_kind: page.source_kind,
            source_path: page.source_path.clone(),
            archive_entry: page.archive_entry.clone(),
            document_page: page.document_page,
            file_path: page.file_path.clone(),
            thumbnail: page.thumbnail.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverSettings {
    /// Memoized pages kept before the least recently used is dropped.
    pub capacity: NonZeroUsize,
    /// Scale applied to a document page's natural size for [`Variant::Full`].
    pub full_scale: f32,
    /// JPEG quality of rendered document pages.
    pub full_quality: u8,
    /// Bounding square of [`Variant::Preview`] renders.
    pub preview_size: u32,
}
impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN),
            full_scale: 1.2,
            full_quality: 90,
            preview_size: 300,
        }
    }
}
impl From<&Config> for ResolverSettings {
    fn from(config: &Config) -> Self {
        Self {
            capacity: NonZeroUsize::new(config.resolver.capacity).unwrap_or(NonZeroUsize::MIN),
            full_scale: config.resolver.full_scale,
            full_quality: config.resolver.full_quality,
            preview_size: config.thumbnails.max_size,
        }
    }
}

struct Inner {
    backend: BackendHandle,
    renderer: RendererHandle,
    blobs: BlobStore,
    memo: Mutex<LruCache<ResolveKey, Resolved>>,
    settings: ResolverSettings,
}

/// Resolves pages to displayable resources. Clones share the memo and the
/// blob store.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<Inner>,
}

impl Resolver {
    pub fn new(backend: BackendHandle, renderer: RendererHandle, settings: ResolverSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                renderer,
                blobs: BlobStore::default(),
                memo: Mutex::new(LruCache::new(settings.capacity)),
                settings,
            }),
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.inner.blobs
    }

    pub fn settings(&self) -> ResolverSettings {
        self.inner.settings
    }

    /// Resolve a page, reusing the memoized result when nothing that affects
    /// the output has changed.
    #[instrument(level = "debug", skip_all, fields(page = page.id, kind = %page.source_kind, ?variant))]
    pub async fn resolve(&self, page: &PageDescriptor, variant: Variant) -> Result<Resolved> {
        let key = ResolveKey::new(page, variant);
        if let Some(hit) = self.inner.memo.lock().await.get(&key) {
            return Ok(hit.clone());
        }
        let resolved = self.produce(page, variant).await?;
        let mut memo = self.inner.memo.lock().await;
        // A concurrent miss on the same key got here first: keep its value,
        // which callers may already hold, and drop ours.
        if let Some(existing) = memo.get(&key) {
            let existing = existing.clone();
            if let Resolved::Blob(ours) = &resolved {
                self.inner.blobs.revoke(ours);
            }
            return Ok(existing);
        }
        // The key is absent, so anything displaced is an evicted entry.
        if let Some((_, Resolved::Blob(evicted))) = memo.push(key, resolved.clone()) {
            self.inner.blobs.revoke(&evicted);
        }
        Ok(resolved)
    }

    async fn produce(&self, page: &PageDescriptor, variant: Variant) -> Result<Resolved> {
        if variant == Variant::Preview
            && let Some(thumbnail) = &page.thumbnail
        {
            return locator(thumbnail).map(Resolved::Locator);
        }
        match page.source_kind {
            SourceKind::Image => locator(&page.file_path).map(Resolved::Locator),
            SourceKind::Document => {
                let settings = self.inner.settings;
                let size = match variant {
                    Variant::Full => RenderSize::Scale(settings.full_scale),
                    Variant::Preview => RenderSize::Fit(settings.preview_size),
                };
                let encoding = Encoding::Jpeg {
                    quality: settings.full_quality,
                };
                let rendered = self.render(page, size, encoding).await?;
                Ok(Resolved::DataUrl(rendered.to_data_url()))
            },
            SourceKind::Archive => match &page.archive_entry {
                Some(entry) => {
                    let bytes = self.read_entry(page, entry).await?;
                    Ok(Resolved::Blob(self.inner.blobs.insert(bytes, media::image_mime(entry))))
                },
                None => locator(&page.file_path).map(Resolved::Locator),
            },
        }
    }

    /// Raw image bytes to build a thumbnail from, or `None` when the page is
    /// already an image file on disk (or an archive page with no entry).
    pub async fn decode_for_thumbnail(&self, page: &PageDescriptor) -> Result<Option<Vec<u8>>> {
        match (page.source_kind, &page.archive_entry) {
            (SourceKind::Document, _) => {
                let rendered = self.render(page, RenderSize::Scale(1.0), Encoding::Png).await?;
                Ok(Some(rendered.bytes))
            },
            (SourceKind::Archive, Some(entry)) => Ok(Some(self.read_entry(page, entry).await?)),
            _ => Ok(None),
        }
    }

    /// Batch-render pages of one document through this resolver's backend
    /// and renderer. See [`render_document_pages`].
    pub fn render_document_pages(
        &self,
        path: PathBuf,
        pages: Vec<u32>,
        size: RenderSize,
        encoding: Encoding,
    ) -> impl futures::Stream<Item = Result<EncodedPage>> + use<> {
        render_document_pages(
            Arc::clone(&self.inner.backend),
            Arc::clone(&self.inner.renderer),
            path,
            pages,
            size,
            encoding,
        )
    }

    async fn render(&self, page: &PageDescriptor, size: RenderSize, encoding: Encoding) -> Result<EncodedPage> {
        let source = source_of(page);
        let document = self.inner.backend.read(source).await.or_raise(|| ErrorKind::Storage)?;
        let number = page.document_page.unwrap_or(page.page_number);
        let renderer = Arc::clone(&self.inner.renderer);
        tokio::task::spawn_blocking(move || renderer.render_page(&document, number, size, encoding))
            .await
            .or_raise(|| ErrorKind::Blocking)?
            .or_raise(|| ErrorKind::Render)
    }

    async fn read_entry(&self, page: &PageDescriptor, entry: &str) -> Result<Vec<u8>> {
        archive::read_entry(&*self.inner.backend, source_of(page), entry).await.or_raise(|| ErrorKind::Archive)
    }
}

fn source_of(page: &PageDescriptor) -> &Path {
    page.source_path.as_deref().unwrap_or(&page.file_path)
}

fn locator(path: &Path) -> Result<Url> {
    Url::from_file_path(path).ok().ok_or_raise(|| ErrorKind::Locator(path.to_path_buf()))
}
