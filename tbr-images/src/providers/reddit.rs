//! Reddit community photo search adapter
//!
//! Searches a fixed set of photography subreddits in one multireddit
//! request through Reddit's public JSON listing. Keyless upstream, so the
//! adapter is opt-in (`reddit_enabled`) rather than credential-gated.
//!
//! Only direct image links survive, and posts whose titles read like
//! memes or selfies are dropped. Post score is the popularity signal;
//! author, permalink and post time are carried as attribution.
//!
//! # API Reference
//! - Endpoint: `GET https://www.reddit.com/r/<subs>/search.json`
//! - Rate Limit: unauthenticated clients get roughly 10 requests/minute

use super::http::{one_per, ProviderHttp};
use crate::types::{
    Attribution, ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery,
};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const REDDIT_URL: &str = "https://www.reddit.com";
const REDDIT_WEB_URL: &str = "https://reddit.com";

/// Photography subreddits searched together
pub const SUBREDDITS: &[&str] = &[
    "itookapicture",
    "travelphotography",
    "earthporn",
    "cityporn",
    "villageporn",
    "architectureporn",
];

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];
const IMAGE_HOSTS: &[&str] = &["i.redd.it", "i.imgur.com"];
const EXCLUDED_TITLE_WORDS: &[&str] = &["meme", "funny", "joke", "selfie", "my face"];

/// Reddit listing page size
const LISTING_LIMIT: usize = 25;

pub struct RedditProvider {
    http: ProviderHttp,
    enabled: bool,
}

impl RedditProvider {
    pub fn new(client: Client, enabled: bool) -> Self {
        Self {
            http: ProviderHttp::new(client, REDDIT_URL, one_per(Duration::from_secs(2))),
            enabled,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageProvider for RedditProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Reddit
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        let path = format!("/r/{}/search.json", SUBREDDITS.join("+"));
        let limit = LISTING_LIMIT.to_string();
        let request = self.http.get(&path).query(&[
            ("q", query.term.as_str()),
            ("restrict_sr", "1"),
            ("sort", "top"),
            ("limit", limit.as_str()),
        ]);

        let listing: RedditListing = self.http.send_json(request).await?;
        let mut candidates = normalize(listing);
        candidates.truncate(query.limit);

        debug!(term = %query.term, found = candidates.len(), "Reddit search complete");
        Ok(candidates)
    }
}

/// Direct image link: known image extension or image host
pub fn is_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or("");
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        || IMAGE_HOSTS.iter().any(|host| lower.contains(host))
}

/// Title suggests a meme or selfie rather than a place photo
pub fn is_excluded_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    EXCLUDED_TITLE_WORDS.iter().any(|word| lower.contains(word))
}

fn normalize(listing: RedditListing) -> Vec<ImageCandidate> {
    listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(|post| !post.over_18)
        .filter(|post| is_image_url(&post.url))
        .filter(|post| !is_excluded_title(&post.title))
        .map(|post| {
            let source = post
                .preview
                .and_then(|p| p.images.into_iter().next())
                .map(|image| image.source);

            let author = post.author.filter(|a| !a.is_empty() && a != "[deleted]");
            let attribution = Attribution {
                title: Some(post.title).filter(|t| !t.trim().is_empty()),
                author_url: author
                    .as_ref()
                    .map(|a| format!("{}/u/{}", REDDIT_WEB_URL, a)),
                author,
                source_url: post
                    .permalink
                    .filter(|p| !p.is_empty())
                    .map(|p| format!("{}{}", REDDIT_WEB_URL, p)),
                published_at: post
                    .created_utc
                    .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
            };

            ImageCandidate::new(post.url, ProviderKind::Reddit)
                .with_dimensions(
                    source.as_ref().and_then(|s| s.width),
                    source.as_ref().and_then(|s| s.height),
                )
                .with_popularity(Some(post.score as f64))
                .with_attribution(attribution)
        })
        .collect()
}

// ============================================================================
// Reddit Listing Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize)]
struct RedditListingData {
    #[serde(default)]
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    over_18: bool,
    author: Option<String>,
    permalink: Option<String>,
    /// Seconds since the epoch, sent as a float
    created_utc: Option<f64>,
    preview: Option<RedditPreview>,
}

#[derive(Debug, Deserialize)]
struct RedditPreview {
    #[serde(default)]
    images: Vec<RedditPreviewImage>,
}

#[derive(Debug, Deserialize)]
struct RedditPreviewImage {
    source: RedditImageSource,
}

#[derive(Debug, Deserialize)]
struct RedditImageSource {
    width: Option<u32>,
    height: Option<u32>,
}
