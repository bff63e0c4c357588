//! Administrative endpoints
//!
//! The force refresh is the one sanctioned way to replace a stored genuine
//! image besides a manual override.

use super::images::{gallery_count, parse_coordinates, require_place, GalleryResponse};
use crate::pipeline::{PersistOutcome, Resolution};
use crate::types::PlaceIdentity;
use crate::validation::ValidationReport;
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// What a refresh re-resolves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTarget {
    Featured,
    Gallery,
    #[default]
    Both,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub place: Option<String>,
    pub slug: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub target: RefreshTarget,
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GalleryRefresh {
    #[serde(flatten)]
    pub gallery: GalleryResponse,
    pub persisted: PersistOutcome,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery: Option<GalleryRefresh>,
    /// Completeness of the place's images after the refresh
    pub validation: ValidationReport,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub slug: String,
    pub invalidated: bool,
}

/// POST /api/admin/images/refresh
///
/// **Request:** `{"place": "Paris", "slug": "paris", "target": "both", "count": 6}`
pub async fn refresh_images(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let place = require_place(request.place)?;
    let coordinates = parse_coordinates(request.lat, request.lon)?;
    let count = gallery_count(&state, request.count)?;

    let mut identity = PlaceIdentity::new(place.clone()).with_coordinates(coordinates);
    if let Some(slug) = request.slug {
        identity = identity.with_slug(slug);
    }

    info!(place = %place, target = ?request.target, "Admin image refresh requested");

    let featured = match request.target {
        RefreshTarget::Featured | RefreshTarget::Both => {
            Some(state.pipeline.force_refresh_featured(&identity).await)
        }
        RefreshTarget::Gallery => None,
    };

    let gallery = match request.target {
        RefreshTarget::Gallery | RefreshTarget::Both => {
            let (images, persisted) = state.pipeline.force_refresh_gallery(&identity, count).await;
            Some(GalleryRefresh {
                gallery: GalleryResponse::new(place, images),
                persisted,
            })
        }
        RefreshTarget::Featured => None,
    };

    let validation = state
        .pipeline
        .validate_refreshed(
            &identity,
            featured.as_ref().map(|f| &f.image),
            gallery.as_ref().map(|g| g.gallery.images.as_slice()),
        )
        .await;

    Ok(Json(RefreshResponse {
        slug: identity.slug(),
        featured,
        gallery,
        validation,
    }))
}

/// DELETE /api/admin/images/cache/:slug
///
/// Clears hot and distributed entries; the permanent store is untouched.
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Json<InvalidateResponse> {
    let identity = PlaceIdentity::new(slug.clone()).with_slug(slug);
    state.pipeline.invalidate(&identity).await;

    info!(slug = %identity.slug(), "Admin cache invalidation");

    Json(InvalidateResponse {
        slug: identity.slug(),
        invalidated: true,
    })
}

/// Build admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/images/refresh", post(refresh_images))
        .route("/api/admin/images/cache/:slug", delete(invalidate_cache))
}
