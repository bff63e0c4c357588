//! tbr-scrape - one-off provider sweep
//!
//! Queries the selected providers once for a search term and prints the
//! merged candidates, with whatever attribution the source reports, as
//! JSON on stdout, most popular first. Logs go to stderr so the output can
//! be piped.
//!
//! ```text
//! tbr-scrape "Paris France" --max-images 20 --providers reddit pinterest flickr
//! ```

use anyhow::{bail, Result};
use clap::Parser;
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use tbr_images::config::{self, ImagesConfig, MODULE_NAME};
use tbr_images::providers::{self, ProviderRegistry};
use tbr_images::types::{Attribution, ImageCandidate, ProviderKind, SearchQuery};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "tbr-scrape", version, about = "Sweep image providers for a search term")]
struct Cli {
    /// Search query, e.g. "Paris France"
    query: String,

    /// Max images per provider
    #[arg(long, default_value_t = 20)]
    max_images: usize,

    /// Providers to query
    #[arg(
        long,
        num_args = 1..,
        default_values_t = [String::from("reddit"), String::from("pinterest"), String::from("flickr")]
    )]
    providers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ScrapedImage {
    url: String,
    provider: ProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    popularity: Option<f64>,
    #[serde(flatten)]
    attribution: Attribution,
}

impl From<ImageCandidate> for ScrapedImage {
    fn from(candidate: ImageCandidate) -> Self {
        Self {
            url: candidate.url,
            provider: candidate.provider,
            width: candidate.width,
            height: candidate.height,
            popularity: candidate.popularity,
            attribution: candidate.attribution.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ScrapeOutput {
    query: String,
    total_images: usize,
    images: Vec<ScrapedImage>,
}

fn parse_providers(names: &[String]) -> Result<Vec<ProviderKind>> {
    let mut kinds = Vec::new();
    for name in names {
        match ProviderKind::parse(name) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => {
                let known: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.as_str()).collect();
                bail!("Unknown provider '{}' (known: {})", name, known.join(", "));
            }
        }
    }
    Ok(kinds)
}

/// Merge, drop duplicate URLs, most popular first
fn merge(results: Vec<Vec<ImageCandidate>>) -> Vec<ImageCandidate> {
    let mut seen = HashSet::new();
    let mut merged: Vec<ImageCandidate> = results
        .into_iter()
        .flatten()
        .filter(|c| seen.insert(c.url.clone()))
        .collect();

    merged.sort_by(|a, b| {
        b.popularity
            .unwrap_or(0.0)
            .partial_cmp(&a.popularity.unwrap_or(0.0))
            .unwrap_or(Ordering::Equal)
    });
    merged
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let images_config: ImagesConfig = match tbr_common::config::config_file_path(MODULE_NAME) {
        Some(path) => tbr_common::config::load_toml_config(&path)?,
        None => ImagesConfig::default(),
    };
    tbr_common::logging::init(&images_config.base.logging)?;

    let kinds = parse_providers(&cli.providers)?;

    // The sweep is an explicit operator action, so keyless sources are always allowed
    let mut credentials = config::resolve_provider_credentials(&images_config.credentials);
    credentials.reddit_enabled = true;
    credentials.pinterest_enabled = true;
    credentials.flickr_public_feed = true;

    let timeout = images_config.pipeline.provider_timeout();
    let registry = ProviderRegistry::from_credentials(&credentials, timeout)?.only(&kinds);
    let query = SearchQuery::new(cli.query.clone(), cli.max_images);

    for provider in registry.all().iter().filter(|p| !p.is_enabled()) {
        warn!(provider = %provider.kind(), "Provider has no credential, skipped");
    }
    info!(query = %cli.query, providers = ?registry.enabled_kinds(), "Starting provider sweep");

    let results = join_all(
        registry
            .all()
            .iter()
            .map(|provider| providers::query(provider.as_ref(), &query, timeout)),
    )
    .await;

    for (provider, found) in registry.all().iter().zip(&results) {
        info!(provider = %provider.kind(), found = found.len(), "Provider sweep result");
    }

    let images: Vec<ScrapedImage> = merge(results).into_iter().map(ScrapedImage::from).collect();
    let output = ScrapeOutput {
        query: cli.query,
        total_images: images.len(),
        images,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
