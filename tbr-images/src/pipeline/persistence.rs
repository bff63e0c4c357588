//! Persistence Guard
//!
//! Decides whether a resolution may be written to the permanent store and
//! performs the write-back. Rules:
//! - Placeholders are never written, and never cached.
//! - A stored genuine value is never overwritten by a normal resolution.
//!   Only `force_persist_*` (manual override, admin refresh) replaces it.
//!   The normal write is conditional on the value read during the check,
//!   so of two concurrent resolutions for one place only the first lands.
//! - A failed write is logged; the caller still gets its image. The next
//!   request for the place will try again.
//!
//! Galleries are stored as their genuine subset only.

use crate::cache::CacheTierManager;
use crate::placeholder::PlaceholderGenerator;
use crate::types::{urls, PlaceIdentity, ResolvedImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the guard did with a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistOutcome {
    Written,
    SkippedPlaceholder,
    SkippedExisting,
    Failed,
}

pub struct PersistenceGuard {
    cache: Arc<CacheTierManager>,
    placeholders: PlaceholderGenerator,
}

impl PersistenceGuard {
    pub fn new(cache: Arc<CacheTierManager>, placeholders: PlaceholderGenerator) -> Self {
        Self { cache, placeholders }
    }

    /// Persist a featured image unless it is a placeholder or one is stored
    pub async fn maybe_persist_featured(
        &self,
        place: &PlaceIdentity,
        image: &ResolvedImage,
    ) -> PersistOutcome {
        if image.is_placeholder() {
            debug!(place = %place.name, "Featured placeholder not persisted");
            return PersistOutcome::SkippedPlaceholder;
        }

        let slug = place.slug();
        if slug.is_empty() {
            warn!(place = %place.name, "Place has no usable slug, featured image not persisted");
            return PersistOutcome::Failed;
        }

        let expected = match self.cache.store().load(&slug).await {
            Ok(Some(stored)) => match stored.featured_image {
                Some(existing) if !self.placeholders.is_placeholder_url(&existing) => {
                    debug!(slug = %slug, existing = %existing, "Featured image already stored");
                    return PersistOutcome::SkippedExisting;
                }
                previous => previous,
            },
            Ok(None) => None,
            Err(e) => {
                warn!(slug = %slug, error = %e, "Cannot check stored featured image, not persisting");
                self.cache.remember_featured(place, image).await;
                return PersistOutcome::Failed;
            }
        };

        let saved = self
            .cache
            .store()
            .save_featured_if_unchanged(&slug, &place.name, image.url(), expected.as_deref())
            .await;
        self.record_featured(place, &slug, image, saved).await
    }

    /// Persist a gallery's genuine subset unless one is stored
    pub async fn maybe_persist_gallery(
        &self,
        place: &PlaceIdentity,
        images: &[ResolvedImage],
    ) -> PersistOutcome {
        let genuine: Vec<ResolvedImage> = images
            .iter()
            .filter(|image| !image.is_placeholder())
            .cloned()
            .collect();
        if genuine.is_empty() {
            debug!(place = %place.name, "Gallery is all placeholders, not persisted");
            return PersistOutcome::SkippedPlaceholder;
        }

        let slug = place.slug();
        if slug.is_empty() {
            warn!(place = %place.name, "Place has no usable slug, gallery not persisted");
            return PersistOutcome::Failed;
        }

        let expected = match self.cache.store().load(&slug).await {
            Ok(Some(stored)) => {
                let has_genuine = stored
                    .gallery_images
                    .iter()
                    .any(|url| !self.placeholders.is_placeholder_url(url));
                if has_genuine {
                    debug!(slug = %slug, "Gallery already stored");
                    return PersistOutcome::SkippedExisting;
                }
                stored.gallery_images
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(slug = %slug, error = %e, "Cannot check stored gallery, not persisting");
                self.cache.remember_gallery(place, &genuine).await;
                return PersistOutcome::Failed;
            }
        };

        let saved = self
            .cache
            .store()
            .save_gallery_if_unchanged(&slug, &place.name, &urls(&genuine), &expected)
            .await;
        self.record_gallery(place, &slug, &genuine, saved).await
    }

    /// Overwrite the stored featured image (manual override, admin refresh)
    pub async fn force_persist_featured(
        &self,
        place: &PlaceIdentity,
        image: &ResolvedImage,
    ) -> PersistOutcome {
        if image.is_placeholder() {
            return PersistOutcome::SkippedPlaceholder;
        }
        let slug = place.slug();
        if slug.is_empty() {
            warn!(place = %place.name, "Place has no usable slug, featured image not persisted");
            return PersistOutcome::Failed;
        }

        self.cache.invalidate(place).await;
        let saved = self
            .cache
            .store()
            .save_featured(&slug, &place.name, image.url())
            .await
            .map(|()| true);
        self.record_featured(place, &slug, image, saved).await
    }

    /// Overwrite the stored gallery with the genuine subset of `images`
    pub async fn force_persist_gallery(
        &self,
        place: &PlaceIdentity,
        images: &[ResolvedImage],
    ) -> PersistOutcome {
        let genuine: Vec<ResolvedImage> = images
            .iter()
            .filter(|image| !image.is_placeholder())
            .cloned()
            .collect();
        if genuine.is_empty() {
            return PersistOutcome::SkippedPlaceholder;
        }
        let slug = place.slug();
        if slug.is_empty() {
            warn!(place = %place.name, "Place has no usable slug, gallery not persisted");
            return PersistOutcome::Failed;
        }

        self.cache.invalidate(place).await;
        let saved = self
            .cache
            .store()
            .save_gallery(&slug, &place.name, &urls(&genuine))
            .await
            .map(|()| true);
        self.record_gallery(place, &slug, &genuine, saved).await
    }

    async fn record_featured(
        &self,
        place: &PlaceIdentity,
        slug: &str,
        image: &ResolvedImage,
        saved: tbr_common::Result<bool>,
    ) -> PersistOutcome {
        let outcome = match saved {
            Ok(true) => {
                info!(slug = %slug, url = %image.url(), "Featured image persisted");
                PersistOutcome::Written
            }
            Ok(false) => {
                debug!(slug = %slug, "Featured image stored by a concurrent resolution");
                return PersistOutcome::SkippedExisting;
            }
            Err(e) => {
                warn!(slug = %slug, error = %e, "Failed to persist featured image");
                PersistOutcome::Failed
            }
        };

        self.cache.remember_featured(place, image).await;
        outcome
    }

    async fn record_gallery(
        &self,
        place: &PlaceIdentity,
        slug: &str,
        genuine: &[ResolvedImage],
        saved: tbr_common::Result<bool>,
    ) -> PersistOutcome {
        let outcome = match saved {
            Ok(true) => {
                info!(slug = %slug, count = genuine.len(), "Gallery persisted");
                PersistOutcome::Written
            }
            Ok(false) => {
                debug!(slug = %slug, "Gallery stored by a concurrent resolution");
                return PersistOutcome::SkippedExisting;
            }
            Err(e) => {
                warn!(slug = %slug, error = %e, "Failed to persist gallery");
                PersistOutcome::Failed
            }
        };

        self.cache.remember_gallery(place, genuine).await;
        outcome
    }
}
