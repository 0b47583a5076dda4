use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_API_BASE: &str = "http://api-channel-origin.sooplive.co.kr/";
pub const COMMENTS_PER_PAGE: u32 = 30;

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("soop: api error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("soop: page {page} response is not valid comment JSON")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },
}

/// Blocking client for the station post comment listing.
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("soop client user agent required");
        }
        let base = config
            .base_url
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let base_url = Url::parse(&base).with_context(|| format!("soop: invalid base url {base}"))?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    fn comments_url(&self, owner_id: &str, post_id: u64, page: u32) -> Result<Url> {
        let post = post_id.to_string();
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("soop: base url cannot carry a path"))?;
            segments.pop_if_empty();
            segments.extend([
                "v1.1",
                "channel",
                owner_id,
                "post",
                post.as_str(),
                "comment",
            ]);
        }
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("perPage", &COMMENTS_PER_PAGE.to_string());
        Ok(url)
    }

    /// Fetches one page of the comment listing. Non-2xx and undecodable bodies are errors.
    pub fn post_comments(&self, owner_id: &str, post_id: u64, page: u32) -> Result<CommentListing> {
        let url = self.comments_url(owner_id, post_id, page)?;
        tracing::debug!(%url, page, "soop: fetching comment page");

        let resp = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .with_context(|| format!("soop: request comment page {page}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = resp
            .text()
            .with_context(|| format!("soop: read comment page {page}"))?;
        let listing: CommentListing =
            serde_json::from_str(&body).map_err(|source| ApiError::Decode { page, source })?;
        Ok(listing)
    }
}

/// Raw upstream payload of `/v1.1/channel/{owner}/post/{post}/comment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentListing {
    pub data: Vec<CommentRecord>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub last_page: u32,
    #[serde(default)]
    pub current_page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CommentRecord {
    #[serde(default, rename = "pCommentNo")]
    pub comment_id: u64,
    #[serde(default, rename = "userId")]
    pub author_id: String,
    #[serde(default, rename = "userNick")]
    pub display_name: String,
    #[serde(default, rename = "likeCnt")]
    pub like_count: u64,
    #[serde(default, rename = "regDate")]
    pub registered_at: String,
    #[serde(default, rename = "profileImage")]
    pub avatar_url: String,
    #[serde(default, rename = "isBestTop")]
    pub best_top: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::new(ClientConfig {
            user_agent: "soopup-test".into(),
            base_url: Some(base.into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn requires_user_agent() {
        assert!(Client::new(ClientConfig::default()).is_err());
    }

    #[test]
    fn builds_comment_url() {
        let url = client(DEFAULT_API_BASE)
            .comments_url("lilpa0309", 185132049, 2)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://api-channel-origin.sooplive.co.kr/v1.1/channel/lilpa0309/post/185132049/comment?page=2&perPage=30"
        );
    }

    #[test]
    fn builds_url_under_base_prefix() {
        let url = client("http://127.0.0.1:9999/proxy")
            .comments_url("a b", 1, 1)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9999/proxy/v1.1/channel/a%20b/post/1/comment?page=1&perPage=30"
        );
    }

    #[test]
    fn decodes_upstream_payload() {
        let raw = r#"{
            "data": [{
                "pCommentNo": 106993477,
                "isBestTop": true,
                "userNick": "nick",
                "userId": "uid",
                "profileImage": "//profile.img.sooplive.co.kr/LOGO/u/uid/uid.jpg",
                "likeCnt": 19301,
                "regDate": "2026-01-28 19:19:38",
                "badge": {"isFan": 1}
            }, {
                "userNick": "ghost"
            }],
            "links": {"first": "", "prev": "", "next": "", "last": ""},
            "meta": {"total": 142, "itemCount": 30, "perPage": 30, "lastPage": 5, "currentPage": 1}
        }"#;
        let listing: CommentListing = serde_json::from_str(raw).unwrap();
        assert_eq!(listing.meta.last_page, 5);
        assert_eq!(listing.meta.total, 142);
        assert_eq!(listing.data[0].comment_id, 106993477);
        assert_eq!(listing.data[0].like_count, 19301);
        assert!(listing.data[0].best_top);
        assert_eq!(listing.data[1].comment_id, 0);
    }
}
