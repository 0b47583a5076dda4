use std::ops::RangeInclusive;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};

use crate::ranking::{self, RawCommentPage, Ranking, TieBreak};
use crate::soop;
use crate::target::Target;

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

pub trait CommentSource: Send + Sync {
    fn fetch_page(&self, target: &Target, page: u32) -> Result<RawCommentPage>;
}

pub struct SoopCommentSource {
    client: Arc<soop::Client>,
}

impl SoopCommentSource {
    pub fn new(client: Arc<soop::Client>) -> Self {
        Self { client }
    }
}

impl CommentSource for SoopCommentSource {
    fn fetch_page(&self, target: &Target, page: u32) -> Result<RawCommentPage> {
        self.client
            .post_comments(&target.owner_id, target.post_id, page)
            .with_context(|| format!("fetch comments of {target} page {page}"))
    }
}

impl<T: CommentSource + ?Sized> CommentSource for Arc<T> {
    fn fetch_page(&self, target: &Target, page: u32) -> Result<RawCommentPage> {
        (**self).fetch_page(target, page)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub max_concurrency: usize,
    pub tie_break: TieBreak,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            tie_break: TieBreak::default(),
        }
    }
}

/// Retrieves every page of the thread, absorbing pages that appear mid-sweep.
///
/// Rounds run strictly one after another: page 1, the remaining pages,
/// a second read of page 1, then any page beyond the first `lastPage`.
/// Every page of every round is returned, in that order.
pub fn fetch_pages<S>(
    source: &S,
    target: &Target,
    max_concurrency: usize,
) -> Result<Vec<RawCommentPage>>
where
    S: CommentSource + ?Sized,
{
    let first = source.fetch_page(target, 1)?;
    let initial_last = first.meta.last_page.max(1);

    let rest = fetch_batch(source, target, 2..=initial_last, max_concurrency)?;

    let refreshed = source.fetch_page(target, 1)?;
    let latest_last = refreshed.meta.last_page.max(1);

    let extra = if latest_last > initial_last {
        tracing::debug!(
            post = %target,
            initial_last,
            latest_last,
            "comment listing grew during retrieval"
        );
        fetch_batch(source, target, initial_last + 1..=latest_last, max_concurrency)?
    } else {
        Vec::new()
    };

    let mut pages = Vec::with_capacity(rest.len() + extra.len() + 2);
    pages.push(first);
    pages.extend(rest);
    pages.push(refreshed);
    pages.extend(extra);
    Ok(pages)
}

/// Fetches and ranks all comments of `target`. Fails if any page fails.
pub fn fetch_all_comments<S>(
    source: &S,
    target: &Target,
    options: FetchOptions,
) -> Result<Ranking>
where
    S: CommentSource + ?Sized,
{
    let pages = fetch_pages(source, target, options.max_concurrency)?;
    let ranking = ranking::reconcile_and_rank(&pages, options.tie_break);
    tracing::info!(
        post = %target,
        pages = pages.len(),
        comments = ranking.total_count,
        last_page = ranking.last_observed_page_count,
        "comment cycle reconciled"
    );
    Ok(ranking)
}

/// Fetches `pages` with up to `max_concurrency` requests in flight, keeping page order.
fn fetch_batch<S>(
    source: &S,
    target: &Target,
    pages: RangeInclusive<u32>,
    max_concurrency: usize,
) -> Result<Vec<RawCommentPage>>
where
    S: CommentSource + ?Sized,
{
    let pages: Vec<u32> = pages.collect();
    if pages.is_empty() {
        return Ok(Vec::new());
    }
    let width = max_concurrency.max(1);
    let mut fetched = Vec::with_capacity(pages.len());

    for chunk in pages.chunks(width) {
        let results: Vec<Result<RawCommentPage>> = thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|&page| scope.spawn(move || source.fetch_page(target, page)))
                .collect();
            handles
                .into_iter()
                .zip(chunk)
                .map(|(handle, page)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(anyhow!("comment page {page} worker panicked")))
                })
                .collect()
        });
        for result in results {
            fetched.push(result?);
        }
    }

    Ok(fetched)
}
