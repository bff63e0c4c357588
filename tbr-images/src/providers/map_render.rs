//! Static map render adapter
//!
//! Last-resort "image" for a place: a rendered OpenStreetMap tile centred
//! on its coordinates. When the caller has no coordinates the name is
//! geocoded through Nominatim first. Produces at most one candidate.
//!
//! # API Reference
//! - Geocoder: `GET https://nominatim.openstreetmap.org/search?format=jsonv2`
//! - Rate Limit: Nominatim usage policy allows 1 request/second

use super::http::{per_second, ProviderHttp};
use crate::types::{
    Coordinates, ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const STATIC_MAP_URL: &str = "https://staticmap.openstreetmap.de/staticmap.php";

pub const MAP_WIDTH: u32 = 1200;
pub const MAP_HEIGHT: u32 = 630;
const MAP_ZOOM: u8 = 12;

pub struct MapRenderProvider {
    geocoder: ProviderHttp,
    static_map_url: String,
}

impl MapRenderProvider {
    pub fn new(client: Client) -> Self {
        Self {
            geocoder: ProviderHttp::new(client, NOMINATIM_URL, per_second(1)),
            static_map_url: STATIC_MAP_URL.to_string(),
        }
    }

    /// Point the geocoder at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.geocoder.set_base_url(base_url);
        self
    }

    pub fn with_static_map_url(mut self, url: impl Into<String>) -> Self {
        self.static_map_url = url.into();
        self
    }

    /// Render URL for a centre point
    pub fn map_url(&self, coordinates: Coordinates) -> Result<String, ProviderError> {
        let center = format!("{:.6},{:.6}", coordinates.lat, coordinates.lon);
        let size = format!("{}x{}", MAP_WIDTH, MAP_HEIGHT);
        let zoom = MAP_ZOOM.to_string();

        let url = Url::parse_with_params(
            &self.static_map_url,
            &[
                ("center", center.as_str()),
                ("zoom", zoom.as_str()),
                ("size", size.as_str()),
                ("maptype", "mapnik"),
            ],
        )
        .map_err(|e| ProviderError::NotConfigured(format!("static map url: {}", e)))?;

        Ok(url.to_string())
    }

    async fn geocode(&self, term: &str) -> Result<Option<Coordinates>, ProviderError> {
        let request = self.geocoder.get("/search").query(&[
            ("q", term),
            ("format", "jsonv2"),
            ("limit", "1"),
        ]);

        let places: Vec<NominatimPlace> = self.geocoder.send_json(request).await?;

        Ok(places.into_iter().find_map(|place| {
            let lat = place.lat.trim().parse::<f64>().ok()?;
            let lon = place.lon.trim().parse::<f64>().ok()?;
            Some(Coordinates::new(lat, lon)).filter(Coordinates::is_valid)
        }))
    }
}

#[async_trait]
impl ImageProvider for MapRenderProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MapRender
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn place_scoped(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        let coordinates = match query.coordinates.filter(Coordinates::is_valid) {
            Some(c) => Some(c),
            None => self.geocode(&query.term).await?,
        };

        let Some(coordinates) = coordinates else {
            debug!(term = %query.term, "Map render: place could not be geocoded");
            return Ok(Vec::new());
        };

        let candidate = ImageCandidate::new(self.map_url(coordinates)?, ProviderKind::MapRender)
            .with_dimensions(Some(MAP_WIDTH), Some(MAP_HEIGHT));

        Ok(vec![candidate])
    }
}

// ============================================================================
// Nominatim Response Types
// ============================================================================

/// Nominatim returns coordinates as decimal strings
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}
