use crate::Context;
use crate::resolve::render_document_pages;
use crate::root::Root;
use crate::scan::{self, Candidate};
use crate::sync::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use std::sync::Arc;
use tankobon_catalog::{NewComic, NewPage, SourceKind};
use tankobon_render::{Encoding, RenderSize};
use tankobon_storage::archive;
use time::UtcDateTime;
use tracing::instrument;

/// Bring one unit's catalog entry up to date with what's on disk.
///
/// Returns the unit's id, or `None` when it has no pages and was skipped.
#[instrument(skip_all, fields(path = %candidate.path.display(), kind = %candidate.kind))]
pub(super) async fn sync_unit(ctx: &Context, root: &Root, candidate: &Candidate) -> Result<Option<i64>> {
    let relative = root.relative(&candidate.path).unwrap_or_default();
    let extraction = root.pattern.extract(&relative);
    for mismatch in &extraction.mismatches {
        tracing::warn!(
            relative = %relative,
            index = mismatch.index,
            expected = %mismatch.expected,
            found = ?mismatch.found,
            "Path does not follow the root's naming pattern"
        );
    }

    let mut pages = scan::list_pages(&*ctx.library, &ctx.renderer, candidate).await.or_raise(|| ErrorKind::Pages)?;
    let Some(first) = pages.first() else {
        tracing::info!("Skipping unit without pages");
        return Ok(None);
    };
    let comic = NewComic {
        path: candidate.path.clone(),
        source_kind: candidate.kind,
        title: candidate.title.clone(),
        artist: extraction.artist().map(str::to_string),
        series: extraction.series().map(str::to_string),
        issue: extraction.issue().map(str::to_string),
        cover: Some(first.file_path.clone()),
        page_count: pages.last().map_or(0, |page| page.page_number),
    };
    let comic_id = ctx.repo.upsert_comic(&comic).await.or_raise(|| ErrorKind::Catalog)?;

    match candidate.kind {
        SourceKind::Image => image_thumbnails(ctx, comic_id, &mut pages).await?,
        SourceKind::Document => document_thumbnails(ctx, comic_id, candidate, &mut pages).await?,
        SourceKind::Archive => archive_thumbnails(ctx, comic_id, candidate, &mut pages).await?,
    }
    ctx.repo.upsert_pages(comic_id, &pages).await.or_raise(|| ErrorKind::Catalog)?;
    tracing::debug!(comic_id, pages = pages.len(), "Unit synced");
    Ok(Some(comic_id))
}

async fn image_thumbnails(ctx: &Context, comic_id: i64, pages: &mut [NewPage]) -> Result<()> {
    for page in pages {
        let number = page.page_number;
        let path = ctx
            .thumbnails
            .from_path(&*ctx.library, &page.file_path, comic_id, number)
            .await
            .or_raise(|| ErrorKind::Thumbnail(number))?;
        page.thumbnail = Some(path);
    }
    Ok(())
}

/// Fill in every page whose cached thumbnail is still valid against the
/// container's modification time, returning the indices of the rest.
async fn reuse_cached(ctx: &Context, comic_id: i64, pages: &mut [NewPage], modified: UtcDateTime) -> Vec<usize> {
    let mut missing = Vec::new();
    for (index, page) in pages.iter_mut().enumerate() {
        match ctx.thumbnails.lookup(comic_id, page.page_number, Some(modified)).await {
            Some(path) => page.thumbnail = Some(path),
            None => missing.push(index),
        }
    }
    missing
}

async fn document_thumbnails(ctx: &Context, comic_id: i64, candidate: &Candidate, pages: &mut [NewPage]) -> Result<()> {
    let modified = ctx.library.modified(&candidate.path).await.or_raise(|| ErrorKind::Storage)?;
    let missing = reuse_cached(ctx, comic_id, pages, modified).await;
    if missing.is_empty() {
        return Ok(());
    }
    tracing::debug!(count = missing.len(), "Rendering document thumbnails");
    let numbers = missing.iter().map(|&index| pages[index].document_page.unwrap_or(pages[index].page_number)).collect();
    let rendered = render_document_pages(
        Arc::clone(&ctx.library),
        Arc::clone(&ctx.renderer),
        candidate.path.clone(),
        numbers,
        RenderSize::Fit(ctx.thumbnails.settings().max_size),
        Encoding::Png,
    );
    futures::pin_mut!(rendered);
    for index in missing {
        let page = &mut pages[index];
        let number = page.page_number;
        let encoded = rendered
            .next()
            .await
            .ok_or_raise(|| ErrorKind::Render)?
            .or_raise(|| ErrorKind::Render)?;
        let path = ctx.thumbnails.store(encoded.bytes, comic_id, number).await.or_raise(|| ErrorKind::Thumbnail(number))?;
        page.thumbnail = Some(path);
    }
    Ok(())
}

async fn archive_thumbnails(ctx: &Context, comic_id: i64, candidate: &Candidate, pages: &mut [NewPage]) -> Result<()> {
    let modified = ctx.library.modified(&candidate.path).await.or_raise(|| ErrorKind::Storage)?;
    let missing: Vec<(usize, String)> = reuse_cached(ctx, comic_id, pages, modified)
        .await
        .into_iter()
        .filter_map(|index| pages[index].archive_entry.clone().map(|entry| (index, entry)))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    tracing::debug!(count = missing.len(), "Extracting archive thumbnails");
    let entries: Vec<String> = missing.iter().map(|(_, entry)| entry.clone()).collect();
    let contents = archive::read_entries(&*ctx.library, &candidate.path, &entries).await.or_raise(|| ErrorKind::Storage)?;
    for ((index, _), bytes) in missing.into_iter().zip(contents) {
        let page = &mut pages[index];
        let number = page.page_number;
        let path = ctx.thumbnails.store(bytes, comic_id, number).await.or_raise(|| ErrorKind::Thumbnail(number))?;
        page.thumbnail = Some(path);
    }
    Ok(())
}
