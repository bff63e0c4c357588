//! Configuration resolution for tbr-images
//!
//! The service's TOML file extends the shared bootstrap config with
//! provider credentials and pipeline tuning:
//!
//! ```toml
//! bind_address = "127.0.0.1:5780"
//!
//! [credentials]
//! pexels_api_key = "..."
//! reddit_enabled = true
//! pinterest_enabled = false
//! flickr_public_feed = false
//!
//! [pipeline]
//! provider_timeout_ms = 2500
//!
//! [pipeline.quality]
//! stock_photo_min_width = 1920
//! ```
//!
//! Credentials resolve with **ENV → TOML** priority. An absent credential
//! is not an error: the matching provider is simply disabled.

use crate::types::ProviderCategory;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tbr_common::config::TomlConfig;
use tracing::{info, warn};

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5780";

/// Module name used to locate the TOML file
pub const MODULE_NAME: &str = "tbr-images";

pub const ENV_BRAVE_API_KEY: &str = "TBR_BRAVE_API_KEY";
pub const ENV_FLICKR_API_KEY: &str = "TBR_FLICKR_API_KEY";
pub const ENV_PEXELS_API_KEY: &str = "TBR_PEXELS_API_KEY";
pub const ENV_UNSPLASH_ACCESS_KEY: &str = "TBR_UNSPLASH_ACCESS_KEY";
pub const ENV_REDDIT_ENABLED: &str = "TBR_REDDIT_ENABLED";
pub const ENV_PINTEREST_ENABLED: &str = "TBR_PINTEREST_ENABLED";
pub const ENV_FLICKR_PUBLIC_FEED: &str = "TBR_FLICKR_PUBLIC_FEED";
pub const ENV_REDIS_URL: &str = "TBR_REDIS_URL";

/// Full TOML file for the images service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(flatten)]
    pub base: TomlConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Provider credentials as written in TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub brave_api_key: Option<String>,
    #[serde(default)]
    pub flickr_api_key: Option<String>,
    #[serde(default)]
    pub pexels_api_key: Option<String>,
    #[serde(default)]
    pub unsplash_access_key: Option<String>,
    /// Reddit's public search needs no key, so it is opt-in instead
    #[serde(default)]
    pub reddit_enabled: Option<bool>,
    /// Pinterest pin search, keyless and opt-in like Reddit
    #[serde(default)]
    pub pinterest_enabled: Option<bool>,
    /// Fall back to Flickr's keyless public tag feed when no API key is set
    #[serde(default)]
    pub flickr_public_feed: Option<bool>,
}

/// Resolved credentials, one entry per keyed provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderCredentials {
    pub brave_api_key: Option<String>,
    pub flickr_api_key: Option<String>,
    pub pexels_api_key: Option<String>,
    pub unsplash_access_key: Option<String>,
    pub reddit_enabled: bool,
    pub pinterest_enabled: bool,
    pub flickr_public_feed: bool,
}

impl ProviderCredentials {
    /// No keyed provider enabled
    pub fn none() -> Self {
        Self::default()
    }
}

/// Pipeline tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per provider call timeout
    pub provider_timeout_ms: u64,
    /// Results requested from each provider call
    pub per_call_limit: usize,
    /// Process-local cache entry lifetime
    pub hot_cache_ttl_secs: u64,
    /// Process-local cache capacity
    pub hot_cache_max_entries: usize,
    /// Distributed cache entry lifetime
    pub distributed_cache_ttl_secs: u64,
    /// Suffixes appended to the place name for gallery searches
    pub gallery_variants: Vec<String>,
    /// Gallery size when the caller does not specify one
    pub default_gallery_count: usize,
    /// Upper bound on requested gallery size
    pub max_gallery_count: usize,
    pub placeholder_base_url: String,
    pub placeholder_width: u32,
    pub placeholder_height: u32,
    pub quality: QualityThresholds,
    pub validation: ValidationThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 3000,
            per_call_limit: 10,
            hot_cache_ttl_secs: 24 * 60 * 60,
            hot_cache_max_entries: 10_000,
            distributed_cache_ttl_secs: 7 * 24 * 60 * 60,
            gallery_variants: default_gallery_variants(),
            default_gallery_count: 6,
            max_gallery_count: 50,
            placeholder_base_url: crate::placeholder::DEFAULT_PLACEHOLDER_BASE.to_string(),
            placeholder_width: 1200,
            placeholder_height: 800,
            quality: QualityThresholds::default(),
            validation: ValidationThresholds::default(),
        }
    }
}

impl PipelineConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms.max(1))
    }

    pub fn hot_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.hot_cache_ttl_secs)
    }

    pub fn distributed_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.distributed_cache_ttl_secs)
    }
}

fn default_gallery_variants() -> Vec<String> {
    ["landmark", "architecture", "cityscape", "culture", "tourism", "attractions"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Canonical quality thresholds, one minimum width per provider category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    pub web_search_min_width: u32,
    pub community_min_width: u32,
    pub stock_photo_min_width: u32,
    pub encyclopedic_min_width: u32,
    pub map_render_min_width: u32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_aspect_ratio: 1.3,
            max_aspect_ratio: 2.5,
            web_search_min_width: 1200,
            community_min_width: 1080,
            stock_photo_min_width: 1920,
            encyclopedic_min_width: 800,
            map_render_min_width: 0,
        }
    }
}

impl QualityThresholds {
    pub fn min_width(&self, category: ProviderCategory) -> u32 {
        match category {
            ProviderCategory::WebSearch => self.web_search_min_width,
            ProviderCategory::Community => self.community_min_width,
            ProviderCategory::StockPhoto => self.stock_photo_min_width,
            ProviderCategory::Encyclopedic => self.encyclopedic_min_width,
            ProviderCategory::MapRender => self.map_render_min_width,
        }
    }
}

/// Completeness bar for operator-facing payload validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    pub require_featured_image: bool,
    pub min_gallery_images: usize,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            require_featured_image: true,
            min_gallery_images: 3,
        }
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve one credential: ENV first, then TOML
///
/// Logs a warning when both sources carry a value.
pub fn resolve_key(name: &str, env_var: &str, toml_value: Option<&String>) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k)).cloned();

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            credential = name,
            "Credential found in both environment and TOML. Using environment (highest priority)."
        );
    }

    match (env_key, toml_key) {
        (Some(key), _) => {
            info!(credential = name, "Credential loaded from environment variable");
            Some(key.trim().to_string())
        }
        (None, Some(key)) => {
            info!(credential = name, "Credential loaded from TOML config");
            Some(key.trim().to_string())
        }
        (None, None) => {
            info!(credential = name, "Credential not configured, provider disabled");
            None
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolve an opt-in flag: ENV first, then TOML, default off
pub fn resolve_flag(env_var: &str, toml_value: Option<bool>) -> bool {
    std::env::var(env_var)
        .ok()
        .and_then(|v| parse_flag(&v))
        .or(toml_value)
        .unwrap_or(false)
}

/// Resolve every provider credential from ENV and TOML
pub fn resolve_provider_credentials(config: &CredentialsConfig) -> ProviderCredentials {
    ProviderCredentials {
        brave_api_key: resolve_key("brave_api_key", ENV_BRAVE_API_KEY, config.brave_api_key.as_ref()),
        flickr_api_key: resolve_key("flickr_api_key", ENV_FLICKR_API_KEY, config.flickr_api_key.as_ref()),
        pexels_api_key: resolve_key("pexels_api_key", ENV_PEXELS_API_KEY, config.pexels_api_key.as_ref()),
        unsplash_access_key: resolve_key(
            "unsplash_access_key",
            ENV_UNSPLASH_ACCESS_KEY,
            config.unsplash_access_key.as_ref(),
        ),
        reddit_enabled: resolve_flag(ENV_REDDIT_ENABLED, config.reddit_enabled),
        pinterest_enabled: resolve_flag(ENV_PINTEREST_ENABLED, config.pinterest_enabled),
        flickr_public_feed: resolve_flag(ENV_FLICKR_PUBLIC_FEED, config.flickr_public_feed),
    }
}

/// Resolve the Redis URL: ENV first, then TOML
pub fn resolve_redis_url(config: &ImagesConfig) -> Option<String> {
    std::env::var(ENV_REDIS_URL)
        .ok()
        .filter(|v| is_valid_key(v))
        .or_else(|| config.base.redis_url.clone().filter(|v| is_valid_key(v)))
}
