//! Unsplash stock photo adapter
//!
//! High-resolution landscape photography; `likes` is the popularity signal.
//!
//! # API Reference
//! - Endpoint: `GET https://api.unsplash.com/search/photos`
//! - Auth: `Authorization: Client-ID <access key>`
//! - Rate Limit: 50 requests/hour (demo apps)

use super::http::{per_second, ProviderHttp};
use crate::types::{ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const UNSPLASH_API_URL: &str = "https://api.unsplash.com";

const MAX_PER_PAGE: usize = 30;

pub struct UnsplashProvider {
    http: ProviderHttp,
    access_key: Option<String>,
}

impl UnsplashProvider {
    pub fn new(client: Client, access_key: Option<String>) -> Self {
        Self {
            http: ProviderHttp::new(client, UNSPLASH_API_URL, per_second(1)),
            access_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageProvider for UnsplashProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unsplash
    }

    fn is_enabled(&self) -> bool {
        self.access_key.is_some()
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        let access_key = self
            .access_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("unsplash_access_key".to_string()))?;

        let per_page = query.limit.clamp(1, MAX_PER_PAGE).to_string();
        let request = self
            .http
            .get("/search/photos")
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Client-ID {}", access_key),
            )
            .header("Accept-Version", "v1")
            .query(&[
                ("query", query.term.as_str()),
                ("per_page", per_page.as_str()),
                ("orientation", "landscape"),
            ]);

        let response: UnsplashResponse = self.http.send_json(request).await?;
        let candidates = normalize(response);

        debug!(term = %query.term, found = candidates.len(), "Unsplash search complete");
        Ok(candidates)
    }
}

fn normalize(response: UnsplashResponse) -> Vec<ImageCandidate> {
    response
        .results
        .into_iter()
        .filter_map(|photo| {
            let url = photo.urls.full.or(photo.urls.regular)?;
            Some(
                ImageCandidate::new(url, ProviderKind::Unsplash)
                    .with_dimensions(photo.width, photo.height)
                    .with_popularity(photo.likes.map(|l| l as f64)),
            )
        })
        .collect()
}

// ============================================================================
// Unsplash API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct UnsplashResponse {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    width: Option<u32>,
    height: Option<u32>,
    likes: Option<u64>,
    #[serde(default)]
    urls: UnsplashUrls,
}

#[derive(Debug, Default, Deserialize)]
struct UnsplashUrls {
    full: Option<String>,
    regular: Option<String>,
}
