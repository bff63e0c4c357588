//! Fallback Resolver (single image)
//!
//! Tries adapters one at a time in priority order and returns the first
//! accepted candidate. A later adapter is only queried once every earlier
//! one has come back empty, so response timing can never reorder results.
//! Exhaustion is not an error: the result degrades to a placeholder.

use crate::placeholder::PlaceholderGenerator;
use crate::providers::{self, ProviderRegistry};
use crate::quality::QualityFilter;
use crate::types::{Coordinates, ResolvedImage, SearchQuery};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct FallbackResolver {
    registry: ProviderRegistry,
    quality: QualityFilter,
    placeholders: PlaceholderGenerator,
    timeout: Duration,
    per_call_limit: usize,
}

impl FallbackResolver {
    pub fn new(
        registry: ProviderRegistry,
        quality: QualityFilter,
        placeholders: PlaceholderGenerator,
        timeout: Duration,
        per_call_limit: usize,
    ) -> Self {
        Self {
            registry,
            quality,
            placeholders,
            timeout,
            per_call_limit: per_call_limit.max(1),
        }
    }

    /// Resolve one image for a place; never fails
    pub async fn resolve_one(&self, name: &str, coordinates: Option<Coordinates>) -> ResolvedImage {
        let term = name.trim();
        if term.is_empty() {
            debug!("Empty place name, using placeholder");
            return self.placeholders.placeholder(term, 0);
        }

        let query = SearchQuery::new(term, self.per_call_limit).with_coordinates(coordinates);

        for provider in self.registry.enabled() {
            let candidates = providers::query(provider.as_ref(), &query, self.timeout).await;

            if let Some(best) = self.quality.select(candidates) {
                info!(
                    place = %term,
                    provider = %best.provider,
                    url = %best.url,
                    "Featured image resolved"
                );
                return ResolvedImage::real(best.url, Some(best.provider));
            }

            debug!(place = %term, provider = %provider.kind(), "No candidate, trying next provider");
        }

        warn!(place = %term, "All providers exhausted, using placeholder");
        self.placeholders.placeholder(term, 0)
    }
}
