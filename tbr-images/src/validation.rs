//! Validation Service
//!
//! Pure check over an already-resolved payload, run before results reach
//! an operator-facing surface. Never fetches.
//!
//! Placeholders are flagged with an explicit `missing` slot instead of
//! passing as content. Gallery entries that are duplicates or not
//! http(s) URLs are dropped from the cleaned payload with a warning.

use crate::config::ValidationThresholds;
use crate::placeholder::PlaceholderGenerator;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Untyped payload as submitted by a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub gallery_images: Vec<String>,
}

/// Why a slot holds no genuine image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    Absent,
    Placeholder,
    InvalidUrl,
}

/// One image position in the cleaned payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageSlot {
    Present {
        url: String,
    },
    Missing {
        reason: MissingReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        original: Option<String>,
    },
}

impl ImageSlot {
    pub fn is_present(&self) -> bool {
        matches!(self, ImageSlot::Present { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ImageSlot::Present { url } => Some(url),
            ImageSlot::Missing { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedPayload {
    pub featured_image: ImageSlot,
    pub gallery_images: Vec<ImageSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub cleaned_payload: CleanedPayload,
    pub real_gallery_count: usize,
}

#[derive(Debug, Clone)]
pub struct ValidationService {
    placeholders: PlaceholderGenerator,
    thresholds: ValidationThresholds,
}

impl ValidationService {
    pub fn new(placeholders: PlaceholderGenerator, thresholds: ValidationThresholds) -> Self {
        Self {
            placeholders,
            thresholds,
        }
    }

    pub fn validate(&self, payload: &ImagePayload) -> ValidationReport {
        let mut warnings = Vec::new();

        let featured_image = match payload.featured_image.as_deref().map(str::trim) {
            None | Some("") => {
                warnings.push("Featured image is missing".to_string());
                ImageSlot::Missing {
                    reason: MissingReason::Absent,
                    original: None,
                }
            }
            Some(url) if !is_http_url(url) => {
                warnings.push(format!("Featured image is not an http(s) URL: {}", url));
                ImageSlot::Missing {
                    reason: MissingReason::InvalidUrl,
                    original: Some(url.to_string()),
                }
            }
            Some(url) if self.placeholders.is_placeholder_url(url) => {
                warnings.push(format!("Featured image is a placeholder: {}", url));
                ImageSlot::Missing {
                    reason: MissingReason::Placeholder,
                    original: Some(url.to_string()),
                }
            }
            Some(url) => ImageSlot::Present {
                url: url.to_string(),
            },
        };

        let mut seen = HashSet::new();
        let mut gallery_images = Vec::new();
        let mut real_gallery_count = 0;

        for (index, raw) in payload.gallery_images.iter().enumerate() {
            let url = raw.trim();
            if url.is_empty() {
                warnings.push(format!("Gallery image {} is empty, dropped", index));
                continue;
            }
            if !is_http_url(url) {
                warnings.push(format!(
                    "Gallery image {} is not an http(s) URL, dropped: {}",
                    index, url
                ));
                continue;
            }
            if !seen.insert(url.to_string()) {
                warnings.push(format!("Gallery image {} is a duplicate, dropped: {}", index, url));
                continue;
            }

            if self.placeholders.is_placeholder_url(url) {
                warnings.push(format!("Gallery image {} is a placeholder: {}", index, url));
                gallery_images.push(ImageSlot::Missing {
                    reason: MissingReason::Placeholder,
                    original: Some(url.to_string()),
                });
            } else {
                real_gallery_count += 1;
                gallery_images.push(ImageSlot::Present {
                    url: url.to_string(),
                });
            }
        }

        let min_gallery = self.thresholds.min_gallery_images;
        if real_gallery_count < min_gallery {
            warnings.push(format!(
                "Gallery has {} genuine images, at least {} required",
                real_gallery_count, min_gallery
            ));
        }

        let featured_ok = featured_image.is_present() || !self.thresholds.require_featured_image;
        let is_valid = featured_ok && real_gallery_count >= min_gallery;

        ValidationReport {
            is_valid,
            warnings,
            cleaned_payload: CleanedPayload {
                featured_image,
                gallery_images,
            },
            real_gallery_count,
        }
    }
}

fn is_http_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}
