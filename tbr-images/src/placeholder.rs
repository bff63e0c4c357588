//! Placeholder images
//!
//! Deterministic filler URLs seeded by place name and index. Placeholders
//! are always produced as `ResolvedImage::Placeholder`; the only place a
//! bare URL is classified is `is_placeholder_url`, used where untyped URLs
//! enter the pipeline (permanent store rows, operator payloads).

use crate::types::ResolvedImage;
use reqwest::Url;

/// Default placeholder service
pub const DEFAULT_PLACEHOLDER_BASE: &str = "https://picsum.photos/seed";

/// Hosts that only ever serve filler images
const KNOWN_PLACEHOLDER_HOSTS: &[&str] = &[
    "picsum.photos",
    "via.placeholder.com",
    "placeholder.com",
    "placehold.co",
    "placehold.it",
    "dummyimage.com",
];

/// Builds and recognises placeholder URLs
#[derive(Debug, Clone)]
pub struct PlaceholderGenerator {
    base_url: String,
    width: u32,
    height: u32,
}

impl Default for PlaceholderGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER_BASE, 1200, 800)
    }
}

impl PlaceholderGenerator {
    pub fn new(base_url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            width,
            height,
        }
    }

    /// Seed for the `index`th placeholder of a place: `<place>-picsum-<index>`
    pub fn seed(place_name: &str, index: usize) -> String {
        let name = place_name.trim();
        let name = if name.is_empty() { "place" } else { name };
        format!("{}-picsum-{}", name, index)
    }

    /// The `index`th placeholder for a place
    pub fn placeholder(&self, place_name: &str, index: usize) -> ResolvedImage {
        let seed = Self::seed(place_name, index);
        let url = self.url_for_seed(&seed);
        ResolvedImage::Placeholder { url, seed }
    }

    fn url_for_seed(&self, seed: &str) -> String {
        let size = [self.width.to_string(), self.height.to_string()];

        match Url::parse(&self.base_url) {
            Ok(mut url) if !url.cannot_be_a_base() => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(seed).extend(size.iter());
                }
                url.to_string()
            }
            _ => format!(
                "{}/{}/{}/{}",
                DEFAULT_PLACEHOLDER_BASE,
                seed.replace(' ', "%20"),
                self.width,
                self.height
            ),
        }
    }

    /// `url` is the base itself or a path below it
    fn is_under_base(&self, url: &str) -> bool {
        if self.base_url.is_empty() {
            return false;
        }
        match url.strip_prefix(self.base_url.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
            None => false,
        }
    }

    /// Whether an untyped URL points at a filler image
    pub fn is_placeholder_url(&self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        if self.is_under_base(url) {
            return true;
        }

        match Url::parse(url) {
            Ok(parsed) => parsed.host_str().is_some_and(|host| {
                let host = host.trim_start_matches("www.");
                KNOWN_PLACEHOLDER_HOSTS.contains(&host)
            }),
            Err(_) => false,
        }
    }
}
