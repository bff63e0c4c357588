//! Provider Adapters
//!
//! One adapter per external image source, each implementing
//! `ImageProvider` from the `types` module.
//!
//! # Adapters (priority order)
//! 1. **brave** - Brave web image search (key)
//! 2. **reddit** - photography subreddits (opt-in)
//! 3. **flickr** - Flickr photo search (key, or opt-in public feed)
//! 4. **pinterest** - Pinterest pin search (opt-in)
//! 5. **pexels** - Pexels stock photos (key)
//! 6. **unsplash** - Unsplash stock photos (key)
//! 7. **wikipedia** - lead image of the place's article
//! 8. **map_render** - static OpenStreetMap render
//!
//! # Failure Isolation
//! Callers never see adapter errors. `query` applies the per-call timeout
//! and turns every failure (disabled, timeout, HTTP, parse) into an empty
//! result with a warning log.

pub mod brave;
pub mod flickr;
pub mod http;
pub mod map_render;
pub mod pexels;
pub mod pinterest;
pub mod reddit;
pub mod unsplash;
pub mod wikipedia;

use crate::config::ProviderCredentials;
use crate::types::{ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub use brave::BraveImageProvider;
pub use flickr::FlickrProvider;
pub use map_render::MapRenderProvider;
pub use pexels::PexelsProvider;
pub use pinterest::PinterestProvider;
pub use reddit::RedditProvider;
pub use unsplash::UnsplashProvider;
pub use wikipedia::WikipediaProvider;

/// Query one provider with a timeout; never fails
///
/// Disabled providers and zero limits return empty without a network call.
/// Results beyond `query.limit` are dropped.
pub async fn query(
    provider: &dyn ImageProvider,
    query: &SearchQuery,
    timeout: Duration,
) -> Vec<ImageCandidate> {
    let kind = provider.kind();

    if !provider.is_enabled() || query.limit == 0 {
        debug!(provider = %kind, "Provider skipped (disabled or zero limit)");
        return Vec::new();
    }

    let result = match tokio::time::timeout(timeout, provider.search(query)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout.as_millis() as u64)),
    };

    match result {
        Ok(mut candidates) => {
            candidates.truncate(query.limit);
            debug!(
                provider = %kind,
                term = %query.term,
                found = candidates.len(),
                "Provider query successful"
            );
            candidates
        }
        Err(e) => {
            warn!(
                provider = %kind,
                term = %query.term,
                error = %e,
                "Provider query failed, treating as empty"
            );
            Vec::new()
        }
    }
}

/// Ordered set of adapters
///
/// Always sorted by `ProviderKind`, which is the fallback priority.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ImageProvider>>,
}

impl ProviderRegistry {
    pub fn new(mut providers: Vec<Arc<dyn ImageProvider>>) -> Self {
        providers.sort_by_key(|p| p.kind());
        Self { providers }
    }

    /// Build every adapter from resolved credentials
    ///
    /// All adapters share one HTTP client. Keyless adapters whose
    /// credential is absent are still registered, but disabled.
    pub fn from_credentials(
        credentials: &ProviderCredentials,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = http::build_http_client(timeout)?;

        let providers: Vec<Arc<dyn ImageProvider>> = vec![
            Arc::new(BraveImageProvider::new(
                client.clone(),
                credentials.brave_api_key.clone(),
            )),
            Arc::new(RedditProvider::new(client.clone(), credentials.reddit_enabled)),
            Arc::new(
                FlickrProvider::new(client.clone(), credentials.flickr_api_key.clone())
                    .with_public_feed(credentials.flickr_public_feed),
            ),
            Arc::new(PinterestProvider::new(
                client.clone(),
                credentials.pinterest_enabled,
            )),
            Arc::new(PexelsProvider::new(
                client.clone(),
                credentials.pexels_api_key.clone(),
            )),
            Arc::new(UnsplashProvider::new(
                client.clone(),
                credentials.unsplash_access_key.clone(),
            )),
            Arc::new(WikipediaProvider::new(client.clone())),
            Arc::new(MapRenderProvider::new(client)),
        ];

        Ok(Self::new(providers))
    }

    /// Every registered adapter, priority order
    pub fn all(&self) -> &[Arc<dyn ImageProvider>] {
        &self.providers
    }

    /// Enabled adapters, priority order
    pub fn enabled(&self) -> Vec<Arc<dyn ImageProvider>> {
        self.providers
            .iter()
            .filter(|p| p.is_enabled())
            .cloned()
            .collect()
    }

    /// Registry restricted to the given kinds
    pub fn only(&self, kinds: &[ProviderKind]) -> Self {
        Self {
            providers: self
                .providers
                .iter()
                .filter(|p| kinds.contains(&p.kind()))
                .cloned()
                .collect(),
        }
    }

    pub fn enabled_kinds(&self) -> Vec<ProviderKind> {
        self.providers
            .iter()
            .filter(|p| p.is_enabled())
            .map(|p| p.kind())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.providers.len()
    }
}

// ============================================================================
// Mock Provider for Testing
// ============================================================================
