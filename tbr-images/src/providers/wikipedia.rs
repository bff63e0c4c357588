//! Wikipedia page image adapter
//!
//! Encyclopedic lead image of the place's own article via the MediaWiki
//! Action API. The term is looked up as an article title (redirects
//! followed), so a search phrase that names no article yields nothing
//! and a place yields at most one candidate. No credential; always enabled.
//!
//! # API Reference
//! - Endpoint: `GET https://en.wikipedia.org/w/api.php?titles=<place>&prop=pageimages`
//! - Rate Limit: no hard limit for reasonable clients; a User-Agent is required

use super::http::{per_second, ProviderHttp};
use crate::types::{ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";

pub struct WikipediaProvider {
    http: ProviderHttp,
}

impl WikipediaProvider {
    pub fn new(client: Client) -> Self {
        Self {
            http: ProviderHttp::new(client, WIKIPEDIA_API_URL, per_second(5)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageProvider for WikipediaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Wikipedia
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn place_scoped(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        let request = self.http.get("").query(&[
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("titles", query.term.as_str()),
            ("redirects", "1"),
            ("prop", "pageimages"),
            ("piprop", "original"),
        ]);

        let response: WikiResponse = self.http.send_json(request).await?;
        let candidates = normalize(response);

        debug!(term = %query.term, found = candidates.len(), "Wikipedia lead image lookup complete");
        Ok(candidates)
    }
}

/// Lead image of the first existing article, if it has one
fn normalize(response: WikiResponse) -> Vec<ImageCandidate> {
    let Some(query) = response.query else {
        return Vec::new();
    };

    query
        .pages
        .into_iter()
        .filter(|page| !page.missing && !page.invalid)
        .find_map(|page| page.original)
        .map(|original| {
            ImageCandidate::new(original.source, ProviderKind::Wikipedia)
                .with_dimensions(original.width, original.height)
        })
        .into_iter()
        .collect()
}

// ============================================================================
// MediaWiki API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct WikiResponse {
    query: Option<WikiQuery>,
}

#[derive(Debug, Deserialize)]
struct WikiQuery {
    #[serde(default)]
    pages: Vec<WikiPage>,
}

#[derive(Debug, Deserialize)]
struct WikiPage {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    original: Option<WikiOriginal>,
}

#[derive(Debug, Deserialize)]
struct WikiOriginal {
    source: String,
    width: Option<u32>,
    height: Option<u32>,
}
