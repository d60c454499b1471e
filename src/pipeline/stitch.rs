//! Download remote clips and join them in order.

use crate::error::{ReelError, Result};
use crate::media::{MediaConcatenator, MediaFetcher};
use crate::pipeline::artifact::FinalArtifact;
use crate::pipeline::scratch::RunScratch;
use futures_util::{StreamExt, TryStreamExt, stream};
use std::path::{Path, PathBuf};

/// Fetch every URL into `scratch`, at most `limit` at a time.
///
/// Paths come back in URL order regardless of which download finished first.
/// The first failure abandons the remaining downloads.
pub async fn download_all(
    fetcher: &dyn MediaFetcher,
    urls: &[String],
    scratch: &RunScratch,
    limit: usize,
) -> Result<Vec<PathBuf>> {
    let jobs = urls
        .iter()
        .enumerate()
        .map(|(index, url)| (index, url.as_str(), scratch.clip_path(index)));

    let mut downloaded: Vec<(usize, PathBuf)> = stream::iter(jobs)
        .map(|(index, url, path)| async move {
            fetcher.fetch(url, &path).await?;
            tracing::debug!(segment = index, path = %path.display(), "clip downloaded");
            Ok::<_, ReelError>((index, path))
        })
        .buffer_unordered(limit.max(1))
        .try_collect()
        .await?;

    downloaded.sort_by_key(|(index, _)| *index);
    Ok(downloaded.into_iter().map(|(_, path)| path).collect())
}

/// Join remote clips into one video.
///
/// A single URL is returned as-is without downloading anything.
pub async fn stitch(
    urls: &[String],
    fetcher: &dyn MediaFetcher,
    concatenator: &dyn MediaConcatenator,
    temp_root: &Path,
    limit: usize,
) -> Result<FinalArtifact> {
    match urls {
        [] => return Err(ReelError::input("no video URLs to stitch")),
        [only] => return Ok(FinalArtifact::remote(only.clone())),
        _ => {}
    }

    let scratch = RunScratch::create_in(temp_root)?;
    let result = join(urls, fetcher, concatenator, &scratch, limit).await;
    scratch.close();
    result
}

async fn join(
    urls: &[String],
    fetcher: &dyn MediaFetcher,
    concatenator: &dyn MediaConcatenator,
    scratch: &RunScratch,
    limit: usize,
) -> Result<FinalArtifact> {
    let clips = download_all(fetcher, urls, scratch, limit).await?;
    let joined = concatenator
        .concatenate(&clips, &scratch.file("stitched.mp4"))
        .await?;
    let bytes = tokio::fs::read(&joined).await?;
    tracing::info!(clips = clips.len(), bytes = bytes.len(), "clips stitched");
    Ok(FinalArtifact::video(bytes))
}
