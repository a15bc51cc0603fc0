//! Deep-read stage: fetch the highest-priority pages to measure their length.
//!
//! Pages are ranked by content type, the first `max_pages` are fetched in
//! fixed-size batches, and each batch settles fully (every fetch resolves to
//! success or failure) before the next one starts. A failed fetch leaves its
//! page unenriched and never affects the rest of the batch.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use siteinventory_shared::{InventoryError, SitePageEntry, absolute_url, origin_for};

use crate::fetcher::PageFetcher;

/// Default number of pages deep-read per run.
pub const DEFAULT_MAX_DEEP_READ: usize = 15;

/// Concurrent fetches per batch.
pub const DEEP_READ_BATCH_SIZE: usize = 5;

/// Pause between consecutive batches.
pub const BATCH_DELAY: Duration = Duration::from_secs(1);

/// Default timeout for a single page fetch.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the deep-read stage.
#[derive(Debug, Clone)]
pub struct DeepReadOptions {
    /// Maximum number of pages fetched.
    pub max_pages: usize,
    /// Fetches started together in one batch.
    pub batch_size: usize,
    /// Pause after each batch except the last.
    pub batch_delay: Duration,
    /// Timeout applied to each individual fetch.
    pub fetch_timeout: Duration,
}

impl Default for DeepReadOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_DEEP_READ,
            batch_size: DEEP_READ_BATCH_SIZE,
            batch_delay: BATCH_DELAY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Indices of the pages to deep-read, highest priority first.
///
/// The sort is stable, so pages of equal priority keep their input order.
pub fn select_for_deep_read(pages: &[SitePageEntry], max_pages: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pages.len()).collect();
    order.sort_by_key(|&i| pages[i].content_type.deep_read_priority());
    order.truncate(max_pages);
    order
}

/// Fetch the selected pages and record word count, quality and title.
///
/// The returned list has the same length and order as `pages`; pages that
/// were not selected, or whose fetch failed, pass through unchanged.
#[instrument(skip_all, fields(domain = %domain, pages = pages.len(), max_pages = opts.max_pages))]
pub async fn deep_read(
    domain: &str,
    mut pages: Vec<SitePageEntry>,
    fetcher: &dyn PageFetcher,
    opts: &DeepReadOptions,
) -> Vec<SitePageEntry> {
    let origin = match origin_for(domain) {
        Ok(origin) => origin,
        Err(e) => {
            warn!(error = %e, "skipping deep-read for invalid domain");
            return pages;
        }
    };

    let selected = select_for_deep_read(&pages, opts.max_pages);
    if selected.is_empty() {
        return pages;
    }

    let batch_size = opts.batch_size.max(1);
    let mut enriched = 0usize;
    let mut failed = 0usize;

    for (batch_no, batch) in selected.chunks(batch_size).enumerate() {
        if batch_no > 0 && !opts.batch_delay.is_zero() {
            tokio::time::sleep(opts.batch_delay).await;
        }

        let jobs: Vec<(usize, String)> = batch
            .iter()
            .map(|&idx| (idx, absolute_url(&origin, &pages[idx].url)))
            .collect();

        debug!(batch = batch_no, size = jobs.len(), "starting deep-read batch");

        let futures = jobs.into_iter().map(|(idx, url)| async move {
            let outcome = match tokio::time::timeout(opts.fetch_timeout, fetcher.fetch(&url)).await
            {
                Ok(result) => result,
                Err(_) => Err(InventoryError::timeout(&url, opts.fetch_timeout.as_secs())),
            };
            (idx, url, outcome)
        });

        for (idx, url, outcome) in join_all(futures).await {
            match outcome {
                Ok(content) => {
                    let page = &mut pages[idx];
                    page.record_deep_read(&content.content, content.title.as_deref());
                    debug!(%url, words = ?page.word_count, "page deep-read");
                    enriched += 1;
                }
                Err(e) => {
                    warn!(%url, error = %e, "deep-read failed, page left unenriched");
                    failed += 1;
                }
            }
        }
    }

    info!(
        selected = selected.len(),
        enriched,
        failed,
        "deep-read complete"
    );

    pages
}
