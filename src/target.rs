use std::fmt;

use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_POST_HOST: &str = "www.sooplive.co.kr";

/// Largest integer a JSON number can carry without losing precision (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Characters escaped when an owner id is written back into a URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

static POST_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^/station/([^/]+)/post/(\d+)/?$").expect("post path pattern")
});

/// One comment thread: the station that owns the post and the post number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub owner_id: String,
    pub post_id: u64,
}

impl Target {
    /// Validates an already split `(owner, post)` pair, e.g. from query parameters.
    pub fn from_query(owner_id: &str, post_id: &str) -> Option<Self> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() || owner_id.contains('/') {
            return None;
        }
        let post_id = parse_safe_integer(post_id.trim())?;
        Some(Self {
            owner_id: owner_id.to_string(),
            post_id,
        })
    }

    pub fn post_url(&self) -> String {
        format!(
            "https://{}/station/{}/post/{}",
            DEFAULT_POST_HOST,
            utf8_percent_encode(&self.owner_id, SEGMENT),
            self.post_id
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.post_id)
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    host: String,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_POST_HOST)
    }
}

impl Resolver {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
        }
    }

    /// Returns `None` for anything that is not a post URL on the expected host.
    pub fn resolve(&self, raw: &str) -> Option<Target> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let url = Url::parse(trimmed).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        if url.host_str()? != self.host {
            return None;
        }
        let captures = POST_PATH.captures(url.path())?;
        // `Url` keeps the path escaped; the owner id is stored decoded.
        let owner_id = percent_decode_str(captures.get(1)?.as_str())
            .decode_utf8()
            .ok()?;
        Target::from_query(&owner_id, captures.get(2)?.as_str())
    }
}

/// Resolves a post URL against the default SOOP host.
pub fn resolve_target(raw: &str) -> Option<Target> {
    Resolver::default().resolve(raw)
}

fn parse_safe_integer(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>()
        .ok()
        .filter(|value| *value <= MAX_SAFE_INTEGER)
}
