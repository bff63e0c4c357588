//! tbr-images library interface
//!
//! Place image acquisition for TravelBlogr: provider adapters, quality
//! filtering, the tiered cache, persistence rules and the HTTP surface.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod placeholder;
pub mod providers;
pub mod quality;
pub mod types;
pub mod validation;

pub use crate::error::{ApiError, ApiResult};

use crate::pipeline::ImagePipeline;
use crate::types::ProviderKind;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ImagePipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    pub enabled_providers: Vec<ProviderKind>,
    pub default_gallery_count: usize,
    pub max_gallery_count: usize,
}

impl AppState {
    pub fn new(
        pipeline: Arc<ImagePipeline>,
        enabled_providers: Vec<ProviderKind>,
        config: &crate::config::PipelineConfig,
    ) -> Self {
        Self {
            pipeline,
            startup_time: Utc::now(),
            enabled_providers,
            default_gallery_count: config.default_gallery_count,
            max_gallery_count: config.max_gallery_count,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::image_routes())
        .merge(api::admin_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
