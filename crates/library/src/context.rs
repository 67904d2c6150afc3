use crate::error::{ErrorKind, Result};
use crate::resolve::{Resolver, ResolverSettings};
use crate::thumbnail::{ThumbnailCache, ThumbnailSettings};
use exn::ResultExt;
use std::sync::Arc;
use tankobon_catalog::{Database, Repository};
use tankobon_config::Config;
use tankobon_render::{PdfiumRenderer, RendererHandle};
use tankobon_storage::BackendHandle;
use tankobon_storage::backend::{LocalBackend, ReadOnlyBackend};

/// Collaborators shared by synchronization and page resolution.
///
/// The library backend is always wrapped in a [`ReadOnlyBackend`]; nothing in
/// this crate writes to a user's comics.
#[derive(Clone)]
pub struct Context {
    pub library: BackendHandle,
    pub repo: Repository,
    pub thumbnails: ThumbnailCache,
    pub renderer: RendererHandle,
}

impl Context {
    pub fn new(library: BackendHandle, repo: Repository, thumbnails: ThumbnailCache, renderer: RendererHandle) -> Self {
        Self {
            library: Arc::new(ReadOnlyBackend::new(library)),
            repo,
            thumbnails,
            renderer,
        }
    }

    /// Open everything described by `config`: the local filesystem for the
    /// library, the catalog database (created and migrated if needed), the
    /// thumbnail directory and the pdfium library.
    #[tracing::instrument(skip_all, fields(catalog = %config.catalog.path.display()))]
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate().or_raise(|| ErrorKind::Config)?;
        let library = LocalBackend::new("library", "/").or_raise(|| ErrorKind::Storage)?;
        let database = Database::connect(&config.catalog.path).await.or_raise(|| ErrorKind::Catalog)?;
        let thumbnails = ThumbnailCache::local(&config.thumbnails.directory, ThumbnailSettings::from(&config.thumbnails))
            .or_raise(|| ErrorKind::Storage)?;
        let renderer = PdfiumRenderer::bind(config.render.pdfium_library.as_deref()).or_raise(|| ErrorKind::Render)?;
        tracing::info!(thumbnails = %thumbnails.root().display(), "Library context ready");
        Ok(Self::new(Arc::new(library), Repository::from(&database), thumbnails, Arc::new(renderer)))
    }

    /// A page resolver reading through this context's library backend.
    pub fn resolver(&self, settings: ResolverSettings) -> Resolver {
        Resolver::new(Arc::clone(&self.library), Arc::clone(&self.renderer), settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tankobon_render::MockRenderer;
    use tankobon_storage::StorageBackend;
    use tankobon_storage::backend::MockBackend;
    use tankobon_storage::error::ErrorKind as StorageErrorKind;

    #[tokio::test]
    async fn test_library_is_read_only() {
        let library = Arc::new(MockBackend::with_files([("/lib/a/1.png", b"x")]));
        let db = Database::connect_in_memory().await.unwrap();
        let thumbnails = ThumbnailCache::new(Arc::new(MockBackend::default()), "/thumbs", ThumbnailSettings::default());
        let ctx = Context::new(library.clone(), Repository::from(&db), thumbnails, Arc::new(MockRenderer::default()));

        assert_eq!(ctx.library.read(Path::new("/lib/a/1.png")).await.unwrap(), b"x");
        let err = ctx.library.write(Path::new("/lib/a/2.png"), b"y").await.unwrap_err();
        assert!(matches!(&*err, StorageErrorKind::ReadOnly(_)));
        assert_eq!(library.files().await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_opening_anything() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.catalog.path = dir.path().join("catalog.db");
        config.resolver.capacity = 0;
        let err = Context::from_config(&config).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Config));
        assert!(!config.catalog.path.exists());
    }
}
