use crate::resolve::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tankobon_render::{EncodedPage, Encoding, RenderSize, RendererHandle};
use tankobon_storage::BackendHandle;
use tokio::sync::mpsc;

/// Pages rendered ahead of the consumer before the renderer waits.
const CHANNEL_CAPACITY: usize = 4;

/// Render several pages of one document, yielding each page as soon as it
/// is encoded.
///
/// The document is read once and opened once, on a single blocking task.
/// A page that fails to render yields an `Err` and the batch moves on;
/// failing to read or open the document ends the stream after one `Err`.
/// Dropping the stream stops rendering after the page in progress.
pub fn render_document_pages(
    backend: BackendHandle,
    renderer: RendererHandle,
    path: PathBuf,
    pages: Vec<u32>,
    size: RenderSize,
    encoding: Encoding,
) -> impl Stream<Item = Result<EncodedPage>> {
    stream!({
        let document = match backend.read(&path).await {
            Ok(document) => document,
            Err(err) => {
                let failed: Result<EncodedPage> = Err(err).or_raise(|| ErrorKind::Storage);
                yield failed;
                return;
            },
        };
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::task::spawn_blocking(move || {
            renderer.render_pages(&document, &pages, size, encoding, &mut |page| match tx.blocking_send(page) {
                Ok(()) => ControlFlow::Continue(()),
                // Receiver gone: nobody wants the rest.
                Err(_) => ControlFlow::Break(()),
            })
        });
        while let Some(page) = rx.recv().await {
            yield page.or_raise(|| ErrorKind::Render);
        }
        match task.await {
            Ok(Ok(())) => {},
            Ok(Err(err)) => {
                let failed: Result<EncodedPage> = Err(err).or_raise(|| ErrorKind::Render);
                yield failed;
            },
            Err(err) => {
                let failed: Result<EncodedPage> = Err(err).or_raise(|| ErrorKind::Blocking);
                yield failed;
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Arc;
    use tankobon_render::MockRenderer;
    use tankobon_storage::backend::MockBackend;

    fn backend() -> BackendHandle {
        Arc::new(MockBackend::with_files([
            ("/lib/book.pdf", MockRenderer::document(4)),
            ("/lib/broken.pdf", b"garbage".to_vec()),
        ]))
    }

    #[tokio::test]
    async fn test_streams_requested_pages_in_order() {
        let renderer = Arc::new(MockRenderer::default().with_failing_page(3));
        let pages: Vec<_> = render_document_pages(
            backend(),
            renderer.clone(),
            PathBuf::from("/lib/book.pdf"),
            vec![4, 3, 1],
            RenderSize::Fit(30),
            Encoding::Png,
        )
        .collect()
        .await;
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].as_ref().unwrap().page_number, 4);
        assert!(matches!(&**pages[1].as_ref().unwrap_err(), ErrorKind::Render));
        assert_eq!(pages[2].as_ref().unwrap().page_number, 1);
        assert_eq!(renderer.renders(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_document_ends_stream() {
        let pages: Vec<_> = render_document_pages(
            backend(),
            Arc::new(MockRenderer::default()),
            PathBuf::from("/lib/broken.pdf"),
            vec![1, 2],
            RenderSize::Fit(30),
            Encoding::Png,
        )
        .collect()
        .await;
        assert_eq!(pages.len(), 1);
        assert!(matches!(&**pages[0].as_ref().unwrap_err(), ErrorKind::Render));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let pages: Vec<_> = render_document_pages(
            backend(),
            Arc::new(MockRenderer::default()),
            PathBuf::from("/lib/missing.pdf"),
            vec![1],
            RenderSize::Fit(30),
            Encoding::Png,
        )
        .collect()
        .await;
        assert_eq!(pages.len(), 1);
        assert!(matches!(&**pages[0].as_ref().unwrap_err(), ErrorKind::Storage));
    }
}
