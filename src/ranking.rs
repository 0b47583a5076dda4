use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::soop::CommentRecord;

// One fetched listing page is the raw input of a reconciliation pass.
pub use crate::soop::CommentListing as RawCommentPage;

pub type CommentId = u64;

pub const DEFAULT_AVATAR_URL: &str = "https://profile.img.sooplive.co.kr/LOGO/default_avatar.jpg";

const REGISTERED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ordering between comments with the same like count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    CommentId,
    RegisteredAt,
}

impl TieBreak {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "comment_id" | "id" => Some(TieBreak::CommentId),
            "registered_at" | "time" => Some(TieBreak::RegisteredAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedComment {
    pub comment_id: CommentId,
    pub author_id: String,
    pub display_name: String,
    pub like_count: u64,
    pub registered_at: String,
    pub avatar_url: String,
    pub best_top: bool,
}

impl RankedComment {
    fn from_record(record: &CommentRecord) -> Self {
        Self {
            comment_id: record.comment_id,
            author_id: record.author_id.clone(),
            display_name: record.display_name.clone(),
            like_count: record.like_count,
            registered_at: record.registered_at.clone(),
            avatar_url: normalize_avatar_url(&record.avatar_url),
            best_top: record.best_top,
        }
    }

    pub fn registered_time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.registered_at.trim(), REGISTERED_AT_FORMAT).ok()
    }
}

/// Materialized result of one cycle. `ranks[i]` belongs to `comments[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ranking {
    pub comments: Vec<RankedComment>,
    pub ranks: Vec<u32>,
    pub total_count: usize,
    pub last_observed_page_count: u32,
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &RankedComment)> {
        self.ranks.iter().copied().zip(self.comments.iter())
    }

    pub fn cutoff_rank(&self, cutoff: u32) -> Option<u32> {
        cutoff_rank(&self.ranks, cutoff)
    }
}

/// Turns protocol-relative avatar links into absolute ones and fills empty ones.
pub fn normalize_avatar_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_AVATAR_URL.to_string();
    }
    if let Some(rest) = trimmed.strip_prefix("//") {
        return format!("https://{rest}");
    }
    trimmed.to_string()
}

/// Deduplicates every page of a cycle and sorts the survivors into a ranking.
///
/// Pages are processed in the order given. A later observation replaces the
/// stored record only when its like count differs, so the page-1 refresh
/// round corrects stale counts while other fields keep their first-seen values.
pub fn reconcile_and_rank(pages: &[RawCommentPage], tie_break: TieBreak) -> Ranking {
    let mut unique: HashMap<CommentId, RankedComment> = HashMap::new();

    for page in pages {
        for record in &page.data {
            if record.comment_id == 0 {
                continue;
            }
            match unique.get(&record.comment_id) {
                Some(existing) if existing.like_count == record.like_count => {}
                _ => {
                    unique.insert(record.comment_id, RankedComment::from_record(record));
                }
            }
        }
    }

    let mut comments: Vec<RankedComment> = unique.into_values().collect();
    comments.sort_by(|a, b| compare(a, b, tie_break));
    let ranks = competition_ranks(&comments);

    Ranking {
        total_count: comments.len(),
        last_observed_page_count: last_observed_page_count(pages),
        comments,
        ranks,
    }
}

fn compare(a: &RankedComment, b: &RankedComment, tie_break: TieBreak) -> Ordering {
    b.like_count.cmp(&a.like_count).then_with(|| match tie_break {
        TieBreak::CommentId => a.comment_id.cmp(&b.comment_id),
        TieBreak::RegisteredAt => {
            let left = a.registered_time();
            let right = b.registered_time();
            match (left, right) {
                (Some(l), Some(r)) => l.cmp(&r),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| a.comment_id.cmp(&b.comment_id))
        }
    })
}

/// `1 + number of comments with a strictly greater like count`.
fn competition_ranks(sorted: &[RankedComment]) -> Vec<u32> {
    let mut ranks: Vec<u32> = Vec::with_capacity(sorted.len());
    for (index, comment) in sorted.iter().enumerate() {
        let rank = match (index.checked_sub(1), ranks.last()) {
            (Some(prev), Some(&prev_rank)) if sorted[prev].like_count == comment.like_count => {
                prev_rank
            }
            _ => index as u32 + 1,
        };
        ranks.push(rank);
    }
    ranks
}

/// `lastPage` of the most recent page-1 observation, or the largest seen.
fn last_observed_page_count(pages: &[RawCommentPage]) -> u32 {
    pages
        .iter()
        .rev()
        .find(|page| page.meta.current_page == 1)
        .map(|page| page.meta.last_page.max(1))
        .or_else(|| pages.iter().map(|page| page.meta.last_page.max(1)).max())
        .unwrap_or(0)
}

/// Largest rank present that does not exceed `cutoff`.
pub fn cutoff_rank(ranks: &[u32], cutoff: u32) -> Option<u32> {
    if cutoff == 0 {
        return None;
    }
    ranks.iter().copied().filter(|rank| *rank <= cutoff).max()
}
