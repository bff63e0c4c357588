//! Cache Tier Manager
//!
//! Three-level lookup that short-circuits provider calls:
//! 1. **Hot** - process-local, 24h TTL (`LocalCache`)
//! 2. **Distributed** - shared, per-entry TTL (`DistributedCache`)
//! 3. **Permanent** - the `places` table (`PlaceStore`), never expires
//!
//! Tiers are checked strictly in that order. A colder hit is copied into
//! the hot tier only. Backend failures and corrupt entries are logged and
//! treated as misses, so a broken tier only costs provider calls.
//!
//! Placeholders are never cached. Values read from the permanent store are
//! untyped URLs, so that is the one place where placeholder URLs are
//! recognised by shape and rejected.

pub mod distributed;
pub mod hot;
#[cfg(feature = "redis")]
pub mod redis_cache;

pub use distributed::{DistributedCache, InMemoryDistributedCache};
pub use hot::{HotCache, LocalCache, NoopCache};
#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;

use crate::db::{PlaceImages, PlaceStore};
use crate::placeholder::PlaceholderGenerator;
use crate::types::{CacheKind, PlaceIdentity, ResolvedImage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Value stored in the hot and distributed tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CachedValue {
    Featured(ResolvedImage),
    Gallery(Vec<ResolvedImage>),
}

/// Tier that answered a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    Hot,
    Distributed,
    Permanent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<T> {
    pub value: T,
    pub tier: CacheTier,
}

pub struct CacheTierManager {
    local: Arc<dyn LocalCache>,
    distributed: Arc<dyn DistributedCache>,
    store: Arc<dyn PlaceStore>,
    placeholders: PlaceholderGenerator,
    distributed_ttl: Duration,
}

impl CacheTierManager {
    pub fn new(
        local: Arc<dyn LocalCache>,
        distributed: Arc<dyn DistributedCache>,
        store: Arc<dyn PlaceStore>,
        placeholders: PlaceholderGenerator,
        distributed_ttl: Duration,
    ) -> Self {
        Self {
            local,
            distributed,
            store,
            placeholders,
            distributed_ttl,
        }
    }

    pub fn store(&self) -> &Arc<dyn PlaceStore> {
        &self.store
    }

    pub fn local(&self) -> &Arc<dyn LocalCache> {
        &self.local
    }

    /// Featured image for a place, from the first tier that has one
    pub async fn lookup_featured(&self, place: &PlaceIdentity) -> Option<CacheHit<ResolvedImage>> {
        let slug = place.slug();
        if slug.is_empty() {
            return None;
        }
        let key = place.cache_key(CacheKind::Featured);

        if let Some(CachedValue::Featured(image)) = self.local.get(&key) {
            debug!(key = %key, "Featured image hot cache hit");
            return Some(CacheHit {
                value: image,
                tier: CacheTier::Hot,
            });
        }

        if let Some(CachedValue::Featured(image)) = self.read_distributed(&key).await {
            debug!(key = %key, "Featured image distributed cache hit");
            self.local.insert(key, CachedValue::Featured(image.clone()));
            return Some(CacheHit {
                value: image,
                tier: CacheTier::Distributed,
            });
        }

        let stored = self.load_permanent(&slug).await?;
        let url = stored.featured_image?;
        if self.placeholders.is_placeholder_url(&url) {
            warn!(slug = %slug, url = %url, "Ignoring placeholder in permanent store");
            return None;
        }

        debug!(key = %key, "Featured image permanent store hit");
        let image = ResolvedImage::Real {
            url,
            provider: None,
            resolved_at: stored.updated_at.unwrap_or_else(Utc::now),
        };
        self.local.insert(key, CachedValue::Featured(image.clone()));
        Some(CacheHit {
            value: image,
            tier: CacheTier::Permanent,
        })
    }

    /// Genuine gallery images for a place, from the first tier that has any
    pub async fn lookup_gallery(
        &self,
        place: &PlaceIdentity,
    ) -> Option<CacheHit<Vec<ResolvedImage>>> {
        let slug = place.slug();
        if slug.is_empty() {
            return None;
        }
        let key = place.cache_key(CacheKind::Gallery);

        if let Some(CachedValue::Gallery(images)) = self.local.get(&key) {
            if !images.is_empty() {
                debug!(key = %key, count = images.len(), "Gallery hot cache hit");
                return Some(CacheHit {
                    value: images,
                    tier: CacheTier::Hot,
                });
            }
        }

        if let Some(CachedValue::Gallery(images)) = self.read_distributed(&key).await {
            if !images.is_empty() {
                debug!(key = %key, count = images.len(), "Gallery distributed cache hit");
                self.local.insert(key, CachedValue::Gallery(images.clone()));
                return Some(CacheHit {
                    value: images,
                    tier: CacheTier::Distributed,
                });
            }
        }

        let stored = self.load_permanent(&slug).await?;
        let resolved_at = stored.updated_at.unwrap_or_else(Utc::now);
        let total = stored.gallery_images.len();
        let images: Vec<ResolvedImage> = stored
            .gallery_images
            .into_iter()
            .filter(|url| !url.trim().is_empty() && !self.placeholders.is_placeholder_url(url))
            .map(|url| ResolvedImage::Real {
                url,
                provider: None,
                resolved_at,
            })
            .collect();

        if images.len() < total {
            warn!(
                slug = %slug,
                dropped = total - images.len(),
                "Ignoring placeholder gallery entries in permanent store"
            );
        }
        if images.is_empty() {
            return None;
        }

        debug!(key = %key, count = images.len(), "Gallery permanent store hit");
        self.local.insert(key, CachedValue::Gallery(images.clone()));
        Some(CacheHit {
            value: images,
            tier: CacheTier::Permanent,
        })
    }

    /// Record a genuine featured image in the hot and distributed tiers
    pub async fn remember_featured(&self, place: &PlaceIdentity, image: &ResolvedImage) {
        if image.is_placeholder() || place.slug().is_empty() {
            return;
        }
        self.remember(
            place.cache_key(CacheKind::Featured),
            CachedValue::Featured(image.clone()),
        )
        .await;
    }

    /// Record the genuine subset of a gallery in the hot and distributed tiers
    pub async fn remember_gallery(&self, place: &PlaceIdentity, images: &[ResolvedImage]) {
        let genuine: Vec<ResolvedImage> = images
            .iter()
            .filter(|image| !image.is_placeholder())
            .cloned()
            .collect();
        if genuine.is_empty() || place.slug().is_empty() {
            return;
        }
        self.remember(place.cache_key(CacheKind::Gallery), CachedValue::Gallery(genuine))
            .await;
    }

    /// Drop a place's hot and distributed entries
    ///
    /// The permanent store is left alone.
    pub async fn invalidate(&self, place: &PlaceIdentity) {
        for kind in [CacheKind::Featured, CacheKind::Gallery] {
            let key = place.cache_key(kind);
            self.local.remove(&key);
            if let Err(e) = self.distributed.delete(&key).await {
                warn!(key = %key, error = %e, "Distributed cache delete failed");
            }
        }
        debug!(slug = %place.slug(), "Cache entries invalidated");
    }

    async fn remember(&self, key: String, value: CachedValue) {
        match serde_json::to_string(&value) {
            Ok(json) => {
                if let Err(e) = self.distributed.set(&key, &json, self.distributed_ttl).await {
                    warn!(key = %key, error = %e, "Distributed cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to encode cache value"),
        }
        self.local.insert(key, value);
    }

    async fn read_distributed(&self, key: &str) -> Option<CachedValue> {
        match self.distributed.get(key).await {
            Ok(Some(json)) => match serde_json::from_str::<CachedValue>(&json) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key = %key, error = %e, "Corrupt distributed cache entry, treating as miss");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Distributed cache read failed, treating as miss");
                None
            }
        }
    }

    async fn load_permanent(&self, slug: &str) -> Option<PlaceImages> {
        match self.store.load(slug).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(slug = %slug, error = %e, "Permanent store read failed, treating as miss");
                None
            }
        }
    }
}
