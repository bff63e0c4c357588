//! Pinterest pin search adapter
//!
//! Community pins through the resource endpoint Pinterest's own web search
//! calls. Keyless upstream, so the adapter is opt-in (`pinterest_enabled`)
//! like Reddit. The original upload is preferred, then the 736px and
//! 564px renditions. Save count is the popularity signal.
//!
//! # API Reference
//! - Endpoint: `GET https://www.pinterest.com/resource/BaseSearchResource/get/`
//! - Rate Limit: undocumented; kept to one request per second

use super::http::{per_second, ProviderHttp};
use crate::types::{
    Attribution, ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const PINTEREST_URL: &str = "https://www.pinterest.com";
const SEARCH_RESOURCE_PATH: &str = "/resource/BaseSearchResource/get/";

pub struct PinterestProvider {
    http: ProviderHttp,
    enabled: bool,
}

impl PinterestProvider {
    pub fn new(client: Client, enabled: bool) -> Self {
        Self {
            http: ProviderHttp::new(client, PINTEREST_URL, per_second(1)),
            enabled,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageProvider for PinterestProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pinterest
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        let source_url = format!("/search/pins/?q={}", query.term);
        let data = json!({
            "options": {"query": query.term, "scope": "pins"},
            "context": {}
        })
        .to_string();

        let request = self
            .http
            .get(SEARCH_RESOURCE_PATH)
            .header(ACCEPT, "application/json")
            .query(&[("source_url", source_url.as_str()), ("data", data.as_str())]);

        let response: PinterestResponse = self.http.send_json(request).await?;
        let mut candidates = normalize(response);
        candidates.truncate(query.limit);

        debug!(term = %query.term, found = candidates.len(), "Pinterest search complete");
        Ok(candidates)
    }
}

fn normalize(response: PinterestResponse) -> Vec<ImageCandidate> {
    response
        .resource_response
        .and_then(|r| r.data)
        .map(|d| d.results)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|pin| {
            let images = pin.images?;
            let image = images
                .orig
                .or(images.w736)
                .or(images.w564)
                .filter(|i| !i.url.is_empty())?;

            let (author, author_url) = match pin.pinner {
                Some(pinner) => (pinner.username, pinner.profile_url),
                None => (None, None),
            };
            let attribution = Attribution {
                title: pin
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .or(pin.grid_title)
                    .filter(|t| !t.trim().is_empty()),
                author,
                author_url,
                source_url: pin
                    .id
                    .map(|id| format!("{}/pin/{}/", PINTEREST_URL, id)),
                published_at: pin
                    .created_at
                    .as_deref()
                    .and_then(|t| DateTime::parse_from_rfc2822(t).ok())
                    .map(|t| t.with_timezone(&Utc)),
            };
            let saves = pin
                .aggregated_pin_data
                .and_then(|d| d.aggregated_stats)
                .and_then(|s| s.saves);

            Some(
                ImageCandidate::new(image.url, ProviderKind::Pinterest)
                    .with_dimensions(image.width, image.height)
                    .with_popularity(saves.map(|s| s as f64))
                    .with_attribution(attribution),
            )
        })
        .collect()
}

// ============================================================================
// Pinterest Resource Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct PinterestResponse {
    resource_response: Option<ResourceResponse>,
}

#[derive(Debug, Deserialize)]
struct ResourceResponse {
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    results: Vec<Pin>,
}

#[derive(Debug, Deserialize)]
struct Pin {
    id: Option<String>,
    title: Option<String>,
    grid_title: Option<String>,
    created_at: Option<String>,
    images: Option<PinImages>,
    pinner: Option<Pinner>,
    aggregated_pin_data: Option<AggregatedPinData>,
}

#[derive(Debug, Deserialize)]
struct PinImages {
    orig: Option<PinImage>,
    #[serde(rename = "736x")]
    w736: Option<PinImage>,
    #[serde(rename = "564x")]
    w564: Option<PinImage>,
}

#[derive(Debug, Deserialize)]
struct PinImage {
    #[serde(default)]
    url: String,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Pinner {
    username: Option<String>,
    profile_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AggregatedPinData {
    aggregated_stats: Option<AggregatedStats>,
}

#[derive(Debug, Deserialize)]
struct AggregatedStats {
    saves: Option<u64>,
}
