//! Flickr photo search adapter
//!
//! Community photography, reached one of two ways:
//! - **API** (key): `extras` asks Flickr to inline the large-size URL, its
//!   dimensions, views and owner, so one call is enough. Flickr reports
//!   errors in-band (`stat: "fail"`) with HTTP 200.
//! - **Public feed** (keyless, opt-in): the recent public photos tagged
//!   with the search words. No dimensions or counts; the feed's medium
//!   thumbnail URL is rewritten to the large size.
//!
//! The API wins when a key is configured.
//!
//! # API Reference
//! - Endpoint: `GET https://api.flickr.com/services/rest?method=flickr.photos.search`
//! - Feed: `GET https://www.flickr.com/services/feeds/photos_public.gne?tags=...`
//! - Rate Limit: 3600 requests/hour per key

use super::http::{lenient_u32, lenient_u64, per_second, ProviderHttp};
use crate::types::{
    Attribution, ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const FLICKR_API_URL: &str = "https://api.flickr.com/services/rest";
const FLICKR_FEED_URL: &str = "https://www.flickr.com/services/feeds/photos_public.gne";
const FLICKR_WEB_URL: &str = "https://www.flickr.com";

const MAX_PER_PAGE: usize = 500;

pub struct FlickrProvider {
    http: ProviderHttp,
    feed: ProviderHttp,
    api_key: Option<String>,
    public_feed: bool,
}

impl FlickrProvider {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            http: ProviderHttp::new(client.clone(), FLICKR_API_URL, per_second(1)),
            feed: ProviderHttp::new(client, FLICKR_FEED_URL, per_second(1)),
            api_key,
            public_feed: false,
        }
    }

    /// Allow the keyless public feed when no API key is configured
    pub fn with_public_feed(mut self, enabled: bool) -> Self {
        self.public_feed = enabled;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.set_base_url(base_url);
        self
    }

    pub fn with_feed_url(mut self, feed_url: impl Into<String>) -> Self {
        self.feed.set_base_url(feed_url);
        self
    }

    async fn search_api(
        &self,
        api_key: &str,
        query: &SearchQuery,
    ) -> Result<Vec<ImageCandidate>, ProviderError> {
        let per_page = query.limit.clamp(1, MAX_PER_PAGE).to_string();
        let request = self.http.get("").query(&[
            ("method", "flickr.photos.search"),
            ("api_key", api_key),
            ("text", query.term.as_str()),
            ("sort", "relevance"),
            ("content_type", "1"),
            ("media", "photos"),
            ("extras", "url_l,views,owner_name,date_upload"),
            ("per_page", per_page.as_str()),
            ("format", "json"),
            ("nojsoncallback", "1"),
        ]);

        let response: FlickrResponse = self.http.send_json(request).await?;
        normalize(response)
    }

    async fn search_feed(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        let tags = feed_tags(&query.term);
        let request = self.feed.get("").query(&[
            ("tags", tags.as_str()),
            ("tagmode", "all"),
            ("format", "json"),
            ("nojsoncallback", "1"),
        ]);

        let feed: FlickrFeed = self.feed.send_json(request).await?;
        Ok(normalize_feed(feed))
    }
}

#[async_trait]
impl ImageProvider for FlickrProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Flickr
    }

    fn is_enabled(&self) -> bool {
        self.api_key.is_some() || self.public_feed
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        let candidates = match self.api_key.as_deref() {
            Some(api_key) => self.search_api(api_key, query).await?,
            None if self.public_feed => self.search_feed(query).await?,
            None => return Err(ProviderError::NotConfigured("flickr_api_key".to_string())),
        };

        debug!(
            term = %query.term,
            found = candidates.len(),
            public_feed = self.api_key.is_none(),
            "Flickr search complete"
        );
        Ok(candidates)
    }
}

/// Search words as a comma-separated tag list
fn feed_tags(term: &str) -> String {
    term.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(",")
}

/// `nobody@flickr.com ("name")` -> `name`
fn feed_author(raw: &str) -> Option<String> {
    let start = raw.find('(')?;
    let end = raw.rfind(')')?;
    let name = raw.get(start + 1..end)?.trim().trim_matches('"').trim();
    Some(name.to_string()).filter(|n| !n.is_empty())
}

fn normalize_feed(feed: FlickrFeed) -> Vec<ImageCandidate> {
    feed.items
        .into_iter()
        .filter_map(|item| {
            let url = item.media.m.filter(|u| !u.is_empty())?.replace("_m.jpg", "_b.jpg");
            let attribution = Attribution {
                title: item.title.filter(|t| !t.trim().is_empty()),
                author: item.author.as_deref().and_then(feed_author),
                author_url: item
                    .author_id
                    .map(|id| format!("{}/photos/{}/", FLICKR_WEB_URL, id)),
                source_url: item.link,
                published_at: item
                    .published
                    .as_deref()
                    .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                    .map(|t| t.with_timezone(&Utc)),
            };
            Some(ImageCandidate::new(url, ProviderKind::Flickr).with_attribution(attribution))
        })
        .collect()
}

fn normalize(response: FlickrResponse) -> Result<Vec<ImageCandidate>, ProviderError> {
    if response.stat != "ok" {
        return Err(ProviderError::Api {
            status: response.code.unwrap_or(0),
            message: response.message.unwrap_or_else(|| "stat != ok".to_string()),
        });
    }

    let photos = response.photos.map(|p| p.photo).unwrap_or_default();

    Ok(photos
        .into_iter()
        .filter_map(|photo| {
            let url = photo.url_l.filter(|u| !u.is_empty())?;
            let attribution = Attribution {
                title: photo.title.filter(|t| !t.trim().is_empty()),
                author: photo.ownername,
                author_url: photo
                    .owner
                    .as_ref()
                    .map(|owner| format!("{}/photos/{}/", FLICKR_WEB_URL, owner)),
                source_url: photo
                    .owner
                    .as_ref()
                    .zip(photo.id.as_ref())
                    .map(|(owner, id)| format!("{}/photos/{}/{}", FLICKR_WEB_URL, owner, id)),
                published_at: lenient_u64(&photo.dateupload)
                    .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
            };
            Some(
                ImageCandidate::new(url, ProviderKind::Flickr)
                    .with_dimensions(lenient_u32(&photo.width_l), lenient_u32(&photo.height_l))
                    .with_popularity(lenient_u64(&photo.views).map(|v| v as f64))
                    .with_attribution(attribution),
            )
        })
        .collect())
}

// ============================================================================
// Flickr API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct FlickrResponse {
    #[serde(default)]
    stat: String,
    code: Option<u16>,
    message: Option<String>,
    photos: Option<FlickrPhotos>,
}

#[derive(Debug, Deserialize)]
struct FlickrPhotos {
    #[serde(default)]
    photo: Vec<FlickrPhoto>,
}

/// Flickr sends dimensions and views as strings or numbers depending on endpoint
#[derive(Debug, Deserialize)]
struct FlickrPhoto {
    id: Option<String>,
    owner: Option<String>,
    ownername: Option<String>,
    title: Option<String>,
    #[serde(default)]
    dateupload: serde_json::Value,
    url_l: Option<String>,
    #[serde(default)]
    width_l: serde_json::Value,
    #[serde(default)]
    height_l: serde_json::Value,
    #[serde(default)]
    views: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct FlickrFeed {
    #[serde(default)]
    items: Vec<FlickrFeedItem>,
}

#[derive(Debug, Deserialize)]
struct FlickrFeedItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(default)]
    media: FlickrFeedMedia,
    author: Option<String>,
    author_id: Option<String>,
    published: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FlickrFeedMedia {
    m: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_reads_lenient_fields() {
        let response: FlickrResponse = serde_json::from_value(json!({
            "stat": "ok",
            "photos": {
                "photo": [
                    {"id": "1", "url_l": "https://live.staticflickr.com/1/a_b.jpg", "width_l": 1024, "height_l": "683", "views": "15234"},
                    {"id": "2", "title": "no large size"},
                    {"id": "3", "url_l": "https://live.staticflickr.com/3/c_d.jpg", "width_l": "1024", "height_l": 768}
                ]
            }
        }))
        .unwrap();

        let candidates = normalize(response).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].width, Some(1024));
        assert_eq!(candidates[0].height, Some(683));
        assert_eq!(candidates[0].popularity, Some(15234.0));
        assert_eq!(candidates[1].popularity, None);
    }

    #[test]
    fn test_stat_fail_is_api_error() {
        let response: FlickrResponse = serde_json::from_value(json!({
            "stat": "fail",
            "code": 100,
            "message": "Invalid API Key (Key has invalid format)"
        }))
        .unwrap();

        match normalize(response) {
            Err(ProviderError::Api { status, message }) => {
                assert_eq!(status, 100);
                assert!(message.contains("Invalid API Key"));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_api_attribution() {
        let response: FlickrResponse = serde_json::from_value(json!({
            "stat": "ok",
            "photos": {"photo": [{
                "id": "5311", "owner": "12@N01", "ownername": "kyoto_walker", "title": "Fushimi Inari",
                "dateupload": "1700000000", "url_l": "https://live.staticflickr.com/1/a_b.jpg"
            }]}
        }))
        .unwrap();

        let candidates = normalize(response).unwrap();
        let credit = candidates[0].attribution.clone().unwrap();
        assert_eq!(credit.author.as_deref(), Some("kyoto_walker"));
        assert_eq!(
            credit.source_url.as_deref(),
            Some("https://www.flickr.com/photos/12@N01/5311")
        );
        assert_eq!(credit.published_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_feed_rewrites_to_large_size() {
        let feed: FlickrFeed = serde_json::from_value(json!({
            "title": "Recent Uploads tagged kyoto",
            "items": [
                {"title": "Gion at night", "link": "https://www.flickr.com/photos/99@N02/777/",
                 "media": {"m": "https://live.staticflickr.com/65535/777_abc_m.jpg"},
                 "published": "2024-05-01T10:00:00Z",
                 "author": "nobody@flickr.com (\"gion_fan\")", "author_id": "99@N02"},
                {"title": "no media"}
            ]
        }))
        .unwrap();

        let candidates = normalize_feed(feed);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://live.staticflickr.com/65535/777_abc_b.jpg");
        let credit = candidates[0].attribution.clone().unwrap();
        assert_eq!(credit.author.as_deref(), Some("gion_fan"));
        assert_eq!(
            credit.author_url.as_deref(),
            Some("https://www.flickr.com/photos/99@N02/")
        );
        assert!(credit.published_at.is_some());
    }

    #[test]
    fn test_feed_author_parsing() {
        assert_eq!(feed_author("nobody@flickr.com (\"ann\")").as_deref(), Some("ann"));
        assert_eq!(feed_author("nobody@flickr.com (bob)").as_deref(), Some("bob"));
        assert_eq!(feed_author("nobody@flickr.com"), None);
        assert_eq!(feed_tags("Kyoto  Old Town"), "kyoto,old,town");
    }

    #[test]
    fn test_disabled_without_key_or_feed() {
        assert!(!FlickrProvider::new(Client::new(), None).is_enabled());
        assert!(FlickrProvider::new(Client::new(), None)
            .with_public_feed(true)
            .is_enabled());
    }
}
