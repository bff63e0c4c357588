//! Pexels stock photo adapter
//!
//! Curated landscape stock photography. Pexels exposes no popularity
//! count in search results, so the quality filter keeps its order.
//!
//! # API Reference
//! - Endpoint: `GET https://api.pexels.com/v1/search`
//! - Auth: `Authorization: <key>` header
//! - Rate Limit: 200 requests/hour (default plan)

use super::http::{per_second, ProviderHttp};
use crate::types::{ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const PEXELS_API_URL: &str = "https://api.pexels.com/v1";

const MAX_PER_PAGE: usize = 80;

pub struct PexelsProvider {
    http: ProviderHttp,
    api_key: Option<String>,
}

impl PexelsProvider {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            http: ProviderHttp::new(client, PEXELS_API_URL, per_second(2)),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageProvider for PexelsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pexels
    }

    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("pexels_api_key".to_string()))?;

        let per_page = query.limit.clamp(1, MAX_PER_PAGE).to_string();
        let request = self
            .http
            .get("/search")
            .header(reqwest::header::AUTHORIZATION, api_key)
            .query(&[
                ("query", query.term.as_str()),
                ("per_page", per_page.as_str()),
                ("orientation", "landscape"),
            ]);

        let response: PexelsResponse = self.http.send_json(request).await?;
        let candidates = normalize(response);

        debug!(term = %query.term, found = candidates.len(), "Pexels search complete");
        Ok(candidates)
    }
}

fn normalize(response: PexelsResponse) -> Vec<ImageCandidate> {
    response
        .photos
        .into_iter()
        .filter_map(|photo| {
            let url = photo.src.large2x.or(photo.src.original)?;
            Some(
                ImageCandidate::new(url, ProviderKind::Pexels)
                    .with_dimensions(photo.width, photo.height),
            )
        })
        .collect()
}

// ============================================================================
// Pexels API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    src: PexelsSrc,
}

#[derive(Debug, Default, Deserialize)]
struct PexelsSrc {
    large2x: Option<String>,
    original: Option<String>,
}
