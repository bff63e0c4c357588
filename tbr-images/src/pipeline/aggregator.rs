//! Fan-Out Aggregator (gallery)
//!
//! Launches one query per (enabled adapter x search variant), waits for
//! every one of them to settle, then merges. Place-scoped adapters (map
//! render, encyclopedic article) describe the place rather than a search
//! phrase, so they get a single query with the bare name and coordinates.
//! `join_all` returns outcomes in launch order, so the merged pool is
//! grouped by provider priority and then by variant regardless of which
//! call finished first.

use crate::placeholder::PlaceholderGenerator;
use crate::providers::{self, ProviderRegistry};
use crate::quality::QualityFilter;
use crate::types::{Coordinates, ImageProvider, ResolvedImage, SearchQuery};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct GalleryAggregator {
    registry: ProviderRegistry,
    quality: QualityFilter,
    placeholders: PlaceholderGenerator,
    timeout: Duration,
    per_call_limit: usize,
    variants: Vec<String>,
}

impl GalleryAggregator {
    pub fn new(
        registry: ProviderRegistry,
        quality: QualityFilter,
        placeholders: PlaceholderGenerator,
        timeout: Duration,
        per_call_limit: usize,
        variants: Vec<String>,
    ) -> Self {
        Self {
            registry,
            quality,
            placeholders,
            timeout,
            per_call_limit: per_call_limit.max(1),
            variants,
        }
    }

    /// `"<place> <variant>"` for every configured variant
    ///
    /// With no variants configured the bare place name is searched.
    pub fn search_terms(&self, place: &str) -> Vec<String> {
        let variants: Vec<String> = self
            .variants
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| format!("{} {}", place, v))
            .collect();

        if variants.is_empty() {
            vec![place.to_string()]
        } else {
            variants
        }
    }

    /// Resolve exactly `count` distinct images; never fails
    pub async fn resolve_gallery(
        &self,
        name: &str,
        coordinates: Option<Coordinates>,
        count: usize,
    ) -> Vec<ResolvedImage> {
        if count == 0 {
            return Vec::new();
        }

        let term = name.trim();
        let mut gallery = if term.is_empty() {
            Vec::new()
        } else {
            self.collect_pool(term, coordinates).await
        };

        let genuine = gallery.len();
        fill_gallery(&mut gallery, &self.placeholders, term, count);

        info!(
            place = %term,
            requested = count,
            genuine = genuine.min(count),
            "Gallery resolved"
        );
        gallery
    }

    /// Every distinct candidate from every (adapter, query) call
    async fn collect_pool(
        &self,
        term: &str,
        coordinates: Option<Coordinates>,
    ) -> Vec<ResolvedImage> {
        let place_query = SearchQuery::new(term, self.per_call_limit).with_coordinates(coordinates);
        let variant_queries: Vec<SearchQuery> = self
            .search_terms(term)
            .into_iter()
            .map(|t| SearchQuery::new(t, self.per_call_limit).with_coordinates(coordinates))
            .collect();

        let enabled = self.registry.enabled();
        let timeout = self.timeout;

        let futures = enabled.iter().flat_map(|provider| {
            let queries: Vec<&SearchQuery> = if provider.place_scoped() {
                vec![&place_query]
            } else {
                variant_queries.iter().collect()
            };
            queries.into_iter().map(move |query| {
                let provider = Arc::clone(provider);
                async move { providers::query(provider.as_ref(), query, timeout).await }
            })
        });

        let outcomes = join_all(futures).await;
        debug!(place = %term, calls = outcomes.len(), "Gallery fan-out settled");

        let mut seen = HashSet::new();
        let mut pool = Vec::new();
        for candidates in outcomes {
            for candidate in self.quality.rank(candidates) {
                if seen.insert(candidate.url.clone()) {
                    pool.push(ResolvedImage::real(candidate.url, Some(candidate.provider)));
                }
            }
        }
        pool
    }
}

/// Pad with `<place>-picsum-<i>` placeholders, then truncate, to `count`
///
/// Placeholder seeds start at 0 for every gallery.
pub fn fill_gallery(
    gallery: &mut Vec<ResolvedImage>,
    placeholders: &PlaceholderGenerator,
    place: &str,
    count: usize,
) {
    let mut seen: HashSet<String> = gallery.iter().map(|i| i.url().to_string()).collect();
    let mut index = 0;
    while gallery.len() < count {
        let filler = placeholders.placeholder(place, index);
        index += 1;
        if seen.insert(filler.url().to_string()) {
            gallery.push(filler);
        }
    }
    gallery.truncate(count);
}
