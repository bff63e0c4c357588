//! Brave Image Search adapter
//!
//! High-authority web image search. Highest fallback priority.
//!
//! # API Reference
//! - Endpoint: `GET https://api.search.brave.com/res/v1/images/search`
//! - Auth: `X-Subscription-Token` header
//! - Rate Limit: 1 request/second (free plan)

use super::http::{per_second, ProviderHttp};
use crate::types::{ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const BRAVE_API_URL: &str = "https://api.search.brave.com";

/// Brave caps `count` at 100 for image search
const MAX_COUNT: usize = 100;

pub struct BraveImageProvider {
    http: ProviderHttp,
    api_key: Option<String>,
}

impl BraveImageProvider {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            http: ProviderHttp::new(client, BRAVE_API_URL, per_second(1)),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageProvider for BraveImageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::BraveImages
    }

    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("brave_api_key".to_string()))?;

        let count = query.limit.clamp(1, MAX_COUNT).to_string();
        let request = self
            .http
            .get("/res/v1/images/search")
            .header("X-Subscription-Token", api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("q", query.term.as_str()),
                ("count", count.as_str()),
                ("safesearch", "strict"),
            ]);

        let response: BraveResponse = self.http.send_json(request).await?;
        let candidates = normalize(response);

        debug!(term = %query.term, found = candidates.len(), "Brave image search complete");
        Ok(candidates)
    }
}

fn normalize(response: BraveResponse) -> Vec<ImageCandidate> {
    response
        .results
        .into_iter()
        .filter_map(|result| {
            let properties = result.properties.unwrap_or_default();
            let url = properties
                .url
                .filter(|u| !u.is_empty())
                .or_else(|| result.thumbnail.as_ref().and_then(|t| t.src.clone()))?;

            Some(
                ImageCandidate::new(url, ProviderKind::BraveImages)
                    .with_dimensions(properties.width, properties.height),
            )
        })
        .collect()
}

// ============================================================================
// Brave API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    properties: Option<BraveProperties>,
    thumbnail: Option<BraveThumbnail>,
}

#[derive(Debug, Default, Deserialize)]
struct BraveProperties {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BraveThumbnail {
    src: Option<String>,
}
