//! Core Types and Trait Definitions for tbr-images
//!
//! Defines the shapes that flow through the acquisition pipeline:
//! - **Place identity:** name + optional slug/coordinates, the cache key source
//! - **Candidates:** ephemeral provider results, reduced to one URL by the quality filter
//! - **Resolved images:** tagged `Real | Placeholder`, carried end to end
//! - **ImageProvider:** the uniform adapter contract every external source implements

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Place Identity
// ============================================================================

/// Geographic coordinates (WGS84 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components finite and within WGS84 bounds
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Stable key addressing one image resolution
///
/// The name is case-preserved; cache keys derived from it are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceIdentity {
    pub name: String,
    pub slug: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// Which cached value a key addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Featured,
    Gallery,
}

impl CacheKind {
    fn prefix(self) -> &'static str {
        match self {
            CacheKind::Featured => "featured",
            CacheKind::Gallery => "gallery",
        }
    }
}

impl PlaceIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: None,
            coordinates: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        if !slug.trim().is_empty() {
            self.slug = Some(slug);
        }
        self
    }

    pub fn with_coordinates(mut self, coordinates: Option<Coordinates>) -> Self {
        self.coordinates = coordinates.filter(Coordinates::is_valid);
        self
    }

    /// Explicit slug, or one derived from the name
    pub fn slug(&self) -> String {
        match &self.slug {
            Some(slug) => slug.trim().to_lowercase(),
            None => slugify(&self.name),
        }
    }

    /// Case-insensitive cache key, e.g. `featured:paris`
    pub fn cache_key(&self, kind: CacheKind) -> String {
        format!("{}:{}", kind.prefix(), self.slug())
    }
}

/// Lowercase, alphanumerics kept, every other run collapsed to `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    slug
}

// ============================================================================
// Providers
// ============================================================================

/// External image sources, in fallback priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    BraveImages,
    Reddit,
    Flickr,
    Pinterest,
    Pexels,
    Unsplash,
    Wikipedia,
    MapRender,
}

impl ProviderKind {
    /// All providers, highest priority first
    pub const ALL: [ProviderKind; 8] = [
        ProviderKind::BraveImages,
        ProviderKind::Reddit,
        ProviderKind::Flickr,
        ProviderKind::Pinterest,
        ProviderKind::Pexels,
        ProviderKind::Unsplash,
        ProviderKind::Wikipedia,
        ProviderKind::MapRender,
    ];

    pub fn category(self) -> ProviderCategory {
        match self {
            ProviderKind::BraveImages => ProviderCategory::WebSearch,
            ProviderKind::Reddit | ProviderKind::Flickr | ProviderKind::Pinterest => {
                ProviderCategory::Community
            }
            ProviderKind::Pexels | ProviderKind::Unsplash => ProviderCategory::StockPhoto,
            ProviderKind::Wikipedia => ProviderCategory::Encyclopedic,
            ProviderKind::MapRender => ProviderCategory::MapRender,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::BraveImages => "brave_images",
            ProviderKind::Reddit => "reddit",
            ProviderKind::Flickr => "flickr",
            ProviderKind::Pinterest => "pinterest",
            ProviderKind::Pexels => "pexels",
            ProviderKind::Unsplash => "unsplash",
            ProviderKind::Wikipedia => "wikipedia",
            ProviderKind::MapRender => "map_render",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider grouping used for quality thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    WebSearch,
    Community,
    StockPhoto,
    Encyclopedic,
    MapRender,
}

/// Credit for a community image, as the source reports it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    /// Page the image was posted on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Attribution {
    pub fn is_empty(&self) -> bool {
        self == &Attribution::default()
    }
}

/// One image as returned by a provider, before filtering
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    pub url: String,
    pub provider: ProviderKind,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Likes, score, views: whatever the provider exposes
    pub popularity: Option<f64>,
    pub attribution: Option<Attribution>,
}

impl ImageCandidate {
    pub fn new(url: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            url: url.into(),
            provider,
            width: None,
            height: None,
            popularity: None,
            attribution: None,
        }
    }

    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width.filter(|w| *w > 0);
        self.height = height.filter(|h| *h > 0);
        self
    }

    pub fn with_popularity(mut self, popularity: Option<f64>) -> Self {
        self.popularity = popularity.filter(|p| p.is_finite());
        self
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = Some(attribution).filter(|a| !a.is_empty());
        self
    }

    /// Width / height, if both are known
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if h > 0 => Some(w as f64 / h as f64),
            _ => None,
        }
    }
}

/// Search request handed to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub term: String,
    pub coordinates: Option<Coordinates>,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>, limit: usize) -> Self {
        Self {
            term: term.into(),
            coordinates: None,
            limit,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Option<Coordinates>) -> Self {
        self.coordinates = coordinates;
        self
    }
}

/// Provider call error
///
/// Never escapes the adapter layer: `providers::query` logs it and
/// returns an empty candidate list.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Call exceeded its per-call timeout
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Non-2xx response
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Required credential or input missing
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Provider Adapter contract
///
/// One implementation per external source. Adapters normalise the
/// source's response shape into `ImageCandidate`s. They may return errors
/// freely; the caller-facing wrapper (`providers::query`) applies the
/// per-call timeout and converts every failure into an empty result.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Provider identity (also its priority position)
    fn kind(&self) -> ProviderKind;

    /// False when the provider's credential is absent
    fn is_enabled(&self) -> bool;

    /// Answers for the place itself rather than a free-text search
    ///
    /// Galleries query such adapters once, with the bare place name and
    /// its coordinates, instead of once per search variant.
    fn place_scoped(&self) -> bool {
        false
    }

    /// Query the provider
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError>;
}

// ============================================================================
// Resolved Images
// ============================================================================

/// Outcome of resolving one image
///
/// Placeholder-ness is carried as a variant, so storage and statistics
/// code never has to guess from the URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedImage {
    Real {
        url: String,
        provider: Option<ProviderKind>,
        resolved_at: DateTime<Utc>,
    },
    Placeholder {
        url: String,
        seed: String,
    },
}

impl ResolvedImage {
    pub fn real(url: impl Into<String>, provider: Option<ProviderKind>) -> Self {
        ResolvedImage::Real {
            url: url.into(),
            provider,
            resolved_at: Utc::now(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ResolvedImage::Real { url, .. } | ResolvedImage::Placeholder { url, .. } => url,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ResolvedImage::Placeholder { .. })
    }

    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            ResolvedImage::Real { provider, .. } => *provider,
            ResolvedImage::Placeholder { .. } => None,
        }
    }
}

/// Number of genuine images in a gallery
pub fn real_count(images: &[ResolvedImage]) -> usize {
    images.iter().filter(|image| !image.is_placeholder()).count()
}

/// URLs of a gallery, in order
pub fn urls(images: &[ResolvedImage]) -> Vec<String> {
    images.iter().map(|image| image.url().to_string()).collect()
}

// ============================================================================
// Tests
// ============================================================================
