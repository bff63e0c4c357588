//! Image resolution endpoints
//!
//! - `GET /api/images/featured?place=&slug=&lat=&lon=&override=`
//! - `GET /api/images/gallery?place=&slug=&lat=&lon=&count=`
//! - `POST /api/images/validate`

use crate::pipeline::Resolution;
use crate::types::{real_count, urls, Coordinates, PlaceIdentity, ResolvedImage};
use crate::validation::{ImagePayload, ValidationReport};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub place: Option<String>,
    pub slug: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Manual override URL
    #[serde(rename = "override")]
    pub manual_override: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeaturedResponse {
    pub place: String,
    pub url: String,
    #[serde(flatten)]
    pub resolution: Resolution,
}

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub place: Option<String>,
    pub slug: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub place: String,
    pub count: usize,
    pub real_count: usize,
    pub urls: Vec<String>,
    pub images: Vec<ResolvedImage>,
}

impl GalleryResponse {
    pub fn new(place: String, images: Vec<ResolvedImage>) -> Self {
        Self {
            place,
            count: images.len(),
            real_count: real_count(&images),
            urls: urls(&images),
            images,
        }
    }
}

/// Non-blank `place` parameter
pub(crate) fn require_place(place: Option<String>) -> ApiResult<String> {
    place
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required parameter: place".to_string()))
}

/// Both or neither of `lat`/`lon`, within WGS84 bounds
pub(crate) fn parse_coordinates(lat: Option<f64>, lon: Option<f64>) -> ApiResult<Option<Coordinates>> {
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            let coordinates = Coordinates::new(lat, lon);
            if coordinates.is_valid() {
                Ok(Some(coordinates))
            } else {
                Err(ApiError::BadRequest(format!(
                    "Coordinates out of range: {}, {}",
                    lat, lon
                )))
            }
        }
        _ => Err(ApiError::BadRequest(
            "lat and lon must be supplied together".to_string(),
        )),
    }
}

/// Requested gallery size, default applied, bounded by the configured maximum
pub(crate) fn gallery_count(state: &AppState, count: Option<usize>) -> ApiResult<usize> {
    let count = count.unwrap_or(state.default_gallery_count);
    if count > state.max_gallery_count {
        return Err(ApiError::BadRequest(format!(
            "count {} exceeds maximum {}",
            count, state.max_gallery_count
        )));
    }
    Ok(count)
}

/// GET /api/images/featured
pub async fn get_featured(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> ApiResult<Json<FeaturedResponse>> {
    let place = require_place(query.place)?;
    let coordinates = parse_coordinates(query.lat, query.lon)?;

    let resolution = state
        .pipeline
        .fetch_featured_image(
            &place,
            query.manual_override.as_deref(),
            coordinates,
            query.slug.as_deref(),
        )
        .await;

    Ok(Json(FeaturedResponse {
        place,
        url: resolution.url().to_string(),
        resolution,
    }))
}

/// GET /api/images/gallery
pub async fn get_gallery(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> ApiResult<Json<GalleryResponse>> {
    let place = require_place(query.place)?;
    let coordinates = parse_coordinates(query.lat, query.lon)?;
    let count = gallery_count(&state, query.count)?;

    let mut identity = PlaceIdentity::new(place.clone()).with_coordinates(coordinates);
    if let Some(slug) = query.slug {
        identity = identity.with_slug(slug);
    }

    let images = state.pipeline.fetch_gallery_for(&identity, count).await;
    Ok(Json(GalleryResponse::new(place, images)))
}

/// POST /api/images/validate
pub async fn validate_payload(
    State(state): State<AppState>,
    Json(payload): Json<ImagePayload>,
) -> Json<ValidationReport> {
    Json(state.pipeline.validate_image_payload(&payload))
}

/// Build image routes
pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/api/images/featured", get(get_featured))
        .route("/api/images/gallery", get(get_gallery))
        .route("/api/images/validate", post(validate_payload))
}
