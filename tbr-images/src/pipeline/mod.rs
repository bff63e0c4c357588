//! Image acquisition pipeline
//!
//! `ImagePipeline` is the interface exposed to callers. Per request:
//!
//! ```text
//! UNRESOLVED -> CACHE_CHECK -> HIT -> RETURN
//!                           -> MISS -> providers -> quality filter
//!                                   -> ACCEPTED -> PERSIST -> RETURN
//!                                   -> EXHAUSTED -> PLACEHOLDER -> RETURN (not persisted)
//! ```
//!
//! No state is retried within a request. Every public operation is
//! infallible: the worst case is a placeholder.

pub mod aggregator;
pub mod persistence;
pub mod resolver;

pub use aggregator::{fill_gallery, GalleryAggregator};
pub use persistence::{PersistOutcome, PersistenceGuard};
pub use resolver::FallbackResolver;

use crate::cache::{CacheTier, CacheTierManager};
use crate::config::PipelineConfig;
use crate::placeholder::PlaceholderGenerator;
use crate::providers::ProviderRegistry;
use crate::quality::QualityFilter;
use crate::types::{urls, Coordinates, PlaceIdentity, ProviderKind, ResolvedImage};
use crate::validation::{ImagePayload, ValidationReport, ValidationService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a featured image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolutionSource {
    ManualOverride,
    Cache { tier: CacheTier },
    Provider { provider: ProviderKind },
    Placeholder,
}

/// Featured image plus how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub image: ResolvedImage,
    pub source: ResolutionSource,
    /// None when nothing needed persisting (cache hit)
    pub persisted: Option<PersistOutcome>,
}

impl Resolution {
    pub fn url(&self) -> &str {
        self.image.url()
    }
}

pub struct ImagePipeline {
    cache: Arc<CacheTierManager>,
    resolver: FallbackResolver,
    aggregator: GalleryAggregator,
    guard: PersistenceGuard,
    validator: ValidationService,
    placeholders: PlaceholderGenerator,
}

impl ImagePipeline {
    pub fn new(
        registry: ProviderRegistry,
        cache: Arc<CacheTierManager>,
        config: &PipelineConfig,
    ) -> Self {
        let placeholders = PlaceholderGenerator::new(
            config.placeholder_base_url.clone(),
            config.placeholder_width,
            config.placeholder_height,
        );
        let quality = QualityFilter::new(config.quality.clone());
        let timeout = config.provider_timeout();

        info!(
            providers = ?registry.enabled_kinds(),
            timeout_ms = timeout.as_millis() as u64,
            "Image pipeline initialized"
        );

        Self {
            resolver: FallbackResolver::new(
                registry.clone(),
                quality.clone(),
                placeholders.clone(),
                timeout,
                config.per_call_limit,
            ),
            aggregator: GalleryAggregator::new(
                registry,
                quality,
                placeholders.clone(),
                timeout,
                config.per_call_limit,
                config.gallery_variants.clone(),
            ),
            guard: PersistenceGuard::new(Arc::clone(&cache), placeholders.clone()),
            validator: ValidationService::new(placeholders.clone(), config.validation.clone()),
            cache,
            placeholders,
        }
    }

    pub fn cache(&self) -> &Arc<CacheTierManager> {
        &self.cache
    }

    /// Featured image for a place
    ///
    /// A non-empty `manual_override` is returned as-is and replaces any
    /// stored value.
    pub async fn fetch_featured_image(
        &self,
        name: &str,
        manual_override: Option<&str>,
        coordinates: Option<Coordinates>,
        slug: Option<&str>,
    ) -> Resolution {
        let mut place = PlaceIdentity::new(name).with_coordinates(coordinates);
        if let Some(slug) = slug {
            place = place.with_slug(slug);
        }

        match manual_override.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => self.apply_override(&place, url).await,
            None => self.fetch_featured_for(&place).await,
        }
    }

    /// Featured image for an already built identity
    pub async fn fetch_featured_for(&self, place: &PlaceIdentity) -> Resolution {
        if let Some(hit) = self.cache.lookup_featured(place).await {
            return Resolution {
                image: hit.value,
                source: ResolutionSource::Cache { tier: hit.tier },
                persisted: None,
            };
        }

        let image = self.resolver.resolve_one(&place.name, place.coordinates).await;
        let persisted = self.guard.maybe_persist_featured(place, &image).await;

        Resolution {
            source: source_of(&image),
            image,
            persisted: Some(persisted),
        }
    }

    /// Gallery of exactly `count` distinct images
    pub async fn fetch_gallery(&self, name: &str, count: usize) -> Vec<ResolvedImage> {
        self.fetch_gallery_for(&PlaceIdentity::new(name), count).await
    }

    pub async fn fetch_gallery_for(&self, place: &PlaceIdentity, count: usize) -> Vec<ResolvedImage> {
        if count == 0 {
            return Vec::new();
        }

        if let Some(hit) = self.cache.lookup_gallery(place).await {
            debug!(place = %place.name, tier = ?hit.tier, "Gallery served from cache");
            let mut gallery = hit.value;
            fill_gallery(&mut gallery, &self.placeholders, place.name.trim(), count);
            return gallery;
        }

        let gallery = self
            .aggregator
            .resolve_gallery(&place.name, place.coordinates, count)
            .await;
        self.guard.maybe_persist_gallery(place, &gallery).await;
        gallery
    }

    pub fn validate_image_payload(&self, payload: &ImagePayload) -> ValidationReport {
        let report = self.validator.validate(payload);
        if !report.is_valid {
            warn!(warnings = report.warnings.len(), "Image payload incomplete");
        }
        report
    }

    /// Validate a place's images after a refresh
    ///
    /// Parts that were not re-resolved are read from the permanent store.
    pub async fn validate_refreshed(
        &self,
        place: &PlaceIdentity,
        featured: Option<&ResolvedImage>,
        gallery: Option<&[ResolvedImage]>,
    ) -> ValidationReport {
        let stored = if featured.is_some() && gallery.is_some() {
            None
        } else {
            match self.cache.store().load(&place.slug()).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(place = %place.name, error = %e, "Cannot read stored images for validation");
                    None
                }
            }
        };

        let featured_image = match featured {
            Some(image) => Some(image.url().to_string()),
            None => stored.as_ref().and_then(|s| s.featured_image.clone()),
        };
        let gallery_images = match gallery {
            Some(images) => urls(images),
            None => stored.map(|s| s.gallery_images).unwrap_or_default(),
        };

        self.validate_image_payload(&ImagePayload {
            featured_image,
            gallery_images,
        })
    }

    /// Re-resolve from providers, bypassing every cache tier
    ///
    /// A genuine result replaces the stored value. A placeholder result
    /// leaves storage untouched.
    pub async fn force_refresh_featured(&self, place: &PlaceIdentity) -> Resolution {
        info!(place = %place.name, "Forced featured image refresh");
        let image = self.resolver.resolve_one(&place.name, place.coordinates).await;
        let persisted = self.guard.force_persist_featured(place, &image).await;

        Resolution {
            source: source_of(&image),
            image,
            persisted: Some(persisted),
        }
    }

    pub async fn force_refresh_gallery(
        &self,
        place: &PlaceIdentity,
        count: usize,
    ) -> (Vec<ResolvedImage>, PersistOutcome) {
        info!(place = %place.name, count, "Forced gallery refresh");
        let gallery = self
            .aggregator
            .resolve_gallery(&place.name, place.coordinates, count)
            .await;
        let persisted = self.guard.force_persist_gallery(place, &gallery).await;
        (gallery, persisted)
    }

    /// Drop a place's hot and distributed cache entries
    pub async fn invalidate(&self, place: &PlaceIdentity) {
        self.cache.invalidate(place).await;
    }

    async fn apply_override(&self, place: &PlaceIdentity, url: &str) -> Resolution {
        if self.placeholders.is_placeholder_url(url) {
            warn!(place = %place.name, url = %url, "Manual override is a placeholder, not persisted");
            return Resolution {
                image: ResolvedImage::Placeholder {
                    url: url.to_string(),
                    seed: String::new(),
                },
                source: ResolutionSource::ManualOverride,
                persisted: Some(PersistOutcome::SkippedPlaceholder),
            };
        }

        let image = ResolvedImage::real(url, None);
        let persisted = self.guard.force_persist_featured(place, &image).await;
        info!(place = %place.name, url = %url, outcome = ?persisted, "Manual override applied");

        Resolution {
            image,
            source: ResolutionSource::ManualOverride,
            persisted: Some(persisted),
        }
    }
}

fn source_of(image: &ResolvedImage) -> ResolutionSource {
    match image.provider() {
        Some(provider) => ResolutionSource::Provider { provider },
        None => ResolutionSource::Placeholder,
    }
}
