//! Integration tests for the image acquisition pipeline
//!
//! Exercises `ImagePipeline` end to end over in-memory SQLite with
//! instrumented providers (and real adapters against a local upstream
//! where the adapter's own behavior matters): cache idempotence,
//! placeholder handling, gallery invariants and provider priority.

mod helpers;

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use helpers::{
    capture_logs, setup_pipeline, setup_pipeline_with, spawn_mock_server, test_config,
    CountingProvider,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tbr_images::cache::CacheTier;
use tbr_images::config::PipelineConfig;
use tbr_images::db::PlaceStore;
use tbr_images::pipeline::{PersistOutcome, ResolutionSource};
use tbr_images::providers::http::build_http_client;
use tbr_images::providers::{MapRenderProvider, ProviderRegistry, WikipediaProvider};
use tbr_images::types::{real_count, ImageProvider, PlaceIdentity, ProviderKind};
use tracing::Level;

fn total_calls(providers: &[Arc<CountingProvider>]) -> usize {
    providers.iter().map(|p| p.calls()).sum()
}

// ============================================================================
// Cache idempotence
// ============================================================================

#[tokio::test]
async fn test_second_fetch_makes_no_provider_calls() {
    let providers = vec![
        Arc::new(CountingProvider::new(ProviderKind::Pexels, &["https://p/paris.jpg"])),
        Arc::new(CountingProvider::new(ProviderKind::Wikipedia, &["https://w/paris.jpg"])),
    ];
    let t = setup_pipeline(&providers, test_config()).await;

    let first = t.pipeline.fetch_featured_image("Paris", None, None, None).await;
    assert_eq!(first.url(), "https://p/paris.jpg");
    assert_eq!(
        first.source,
        ResolutionSource::Provider {
            provider: ProviderKind::Pexels
        }
    );
    assert_eq!(first.persisted, Some(PersistOutcome::Written));
    let calls_after_first = total_calls(&providers);
    assert_eq!(calls_after_first, 1);

    let second = t.pipeline.fetch_featured_image("PARIS", None, None, None).await;
    assert_eq!(second.url(), "https://p/paris.jpg");
    assert_eq!(second.source, ResolutionSource::Cache { tier: CacheTier::Hot });
    assert_eq!(total_calls(&providers), calls_after_first);
}

#[tokio::test]
async fn test_persisted_paris_served_with_zero_calls() {
    let providers = vec![Arc::new(CountingProvider::new(
        ProviderKind::BraveImages,
        &["https://brave/other.jpg"],
    ))];
    let t = setup_pipeline(&providers, test_config()).await;
    t.store
        .save_featured("paris", "Paris", "https://provider/real.jpg")
        .await
        .unwrap();

    let resolution = t
        .pipeline
        .fetch_featured_image("Paris", None, None, Some("paris"))
        .await;

    assert_eq!(resolution.url(), "https://provider/real.jpg");
    assert_eq!(
        resolution.source,
        ResolutionSource::Cache {
            tier: CacheTier::Permanent
        }
    );
    assert_eq!(total_calls(&providers), 0);
}

#[tokio::test]
async fn test_stored_value_never_overwritten_by_normal_fetch() {
    let providers = vec![Arc::new(CountingProvider::new(
        ProviderKind::Flickr,
        &["https://f/new.jpg"],
    ))];
    let t = setup_pipeline(&providers, test_config()).await;
    t.store
        .save_featured("rome", "Rome", "https://provider/rome.jpg")
        .await
        .unwrap();

    for _ in 0..3 {
        let resolution = t.pipeline.fetch_featured_image("Rome", None, None, None).await;
        assert_eq!(resolution.url(), "https://provider/rome.jpg");
    }

    let stored = t.store.load("rome").await.unwrap().unwrap();
    assert_eq!(stored.featured_image.as_deref(), Some("https://provider/rome.jpg"));
    assert_eq!(providers[0].calls(), 0);
}

// ============================================================================
// Placeholders
// ============================================================================

#[tokio::test]
async fn test_placeholder_never_persisted() {
    let providers = vec![
        Arc::new(CountingProvider::failing(ProviderKind::BraveImages)),
        Arc::new(CountingProvider::empty(ProviderKind::Wikipedia)),
        Arc::new(CountingProvider::empty(ProviderKind::MapRender)),
    ];
    let t = setup_pipeline(&providers, test_config()).await;

    let resolution = t.pipeline.fetch_featured_image("Nowhereton", None, None, None).await;
    assert!(resolution.image.is_placeholder());
    assert_eq!(resolution.source, ResolutionSource::Placeholder);
    assert_eq!(resolution.persisted, Some(PersistOutcome::SkippedPlaceholder));

    let gallery = t.pipeline.fetch_gallery("Nowhereton", 4).await;
    assert_eq!(real_count(&gallery), 0);

    assert!(t.store.load("nowhereton").await.unwrap().is_none());

    // Nothing cached either: a second fetch queries providers again
    let before = total_calls(&providers);
    t.pipeline.fetch_featured_image("Nowhereton", None, None, None).await;
    assert!(total_calls(&providers) > before);
}

#[tokio::test]
async fn test_fallback_never_throws() {
    let providers = vec![
        Arc::new(CountingProvider::disabled(ProviderKind::Pexels, &["https://p/1.jpg"])),
        Arc::new(CountingProvider::disabled(ProviderKind::Unsplash, &["https://u/1.jpg"])),
    ];
    let t = setup_pipeline(&providers, test_config()).await;

    for name in ["", "   ", "Paris"] {
        let resolution = t.pipeline.fetch_featured_image(name, None, None, None).await;
        assert!(resolution.image.is_placeholder());
        assert!(reqwest::Url::parse(resolution.url()).is_ok());
    }
    assert_eq!(total_calls(&providers), 0);
}

#[tokio::test]
async fn test_exhaustion_is_logged() {
    let (logs, _guard) = capture_logs();
    let providers = vec![Arc::new(CountingProvider::failing(ProviderKind::Reddit))];
    let t = setup_pipeline(&providers, test_config()).await;

    t.pipeline.fetch_featured_image("Atlantis", None, None, None).await;

    assert_eq!(logs.count_at(Level::WARN, "Provider query failed"), 1);
    logs.assert_contains("All providers exhausted");
    logs.assert_no_match("Featured image persisted");
}

// ============================================================================
// Priority
// ============================================================================

#[tokio::test]
async fn test_priority_beats_response_time() {
    let slow_first = Arc::new(
        CountingProvider::new(ProviderKind::BraveImages, &["https://brave/x.jpg"])
            .with_delay(Duration::from_millis(100)),
    );
    let fast_second = Arc::new(CountingProvider::new(ProviderKind::Reddit, &["https://reddit/y.jpg"]));
    let providers = vec![fast_second.clone(), slow_first.clone()];
    let t = setup_pipeline(&providers, test_config()).await;

    let resolution = t.pipeline.fetch_featured_image("Paris", None, None, None).await;
    assert_eq!(resolution.url(), "https://brave/x.jpg");
    assert_eq!(fast_second.calls(), 0);

    let gallery = t.pipeline.fetch_gallery("Lisbon", 2).await;
    assert_eq!(gallery[0].url(), "https://brave/x.jpg");
    assert_eq!(gallery[1].url(), "https://reddit/y.jpg");
}

#[tokio::test]
async fn test_timed_out_provider_is_skipped() {
    let slow = Arc::new(
        CountingProvider::new(ProviderKind::BraveImages, &["https://brave/slow.jpg"])
            .with_delay(Duration::from_secs(5)),
    );
    let backup = Arc::new(CountingProvider::new(ProviderKind::Wikipedia, &["https://w/ok.jpg"]));
    let t = setup_pipeline(&[slow.clone(), backup.clone()], test_config()).await;

    let started = std::time::Instant::now();
    let resolution = t.pipeline.fetch_featured_image("Paris", None, None, None).await;
    assert_eq!(resolution.url(), "https://w/ok.jpg");
    assert!(started.elapsed() < Duration::from_secs(2));
}

// ============================================================================
// Galleries
// ============================================================================

#[tokio::test]
async fn test_gallery_length_and_uniqueness() {
    let providers = vec![
        Arc::new(CountingProvider::new(
            ProviderKind::Flickr,
            &["https://f/1.jpg", "https://f/2.jpg", "https://shared/1.jpg"],
        )),
        Arc::new(CountingProvider::new(
            ProviderKind::Pexels,
            &["https://shared/1.jpg", "https://p/1.jpg"],
        )),
    ];

    for count in 0..=8 {
        let t = setup_pipeline(&providers, test_config()).await;
        let gallery = t.pipeline.fetch_gallery("Paris", count).await;

        assert_eq!(gallery.len(), count, "count {}", count);
        let unique: HashSet<&str> = gallery.iter().map(|i| i.url()).collect();
        assert_eq!(unique.len(), count, "duplicates at count {}", count);
    }
}

/// Encyclopedic article lookup plus geocoder for a place with one article
/// and no other coverage. Counts geocoder hits.
fn nowhereton_upstream(geocodes: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/w/api.php",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let title = params.get("titles").cloned().unwrap_or_default();
                if title == "Nowhereton" {
                    Json(json!({"query": {"pages": [{
                        "pageid": 4242, "title": "Nowhereton",
                        "original": {"source": "https://upload.wikimedia.org/nowhereton.jpg", "width": 1600, "height": 1067}
                    }]}}))
                } else {
                    Json(json!({"query": {"pages": [{"title": title, "missing": true}]}}))
                }
            }),
        )
        .route(
            "/search",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let geocodes = geocodes.clone();
                async move {
                    geocodes.fetch_add(1, Ordering::SeqCst);
                    // A different point per phrase, as a real geocoder would give
                    let q = params.get("q").cloned().unwrap_or_default();
                    let lat = 50.0 + q.len() as f64 / 100.0;
                    Json(json!([{"lat": lat.to_string(), "lon": "4.25", "display_name": q}]))
                }
            }),
        )
}

#[tokio::test]
async fn test_nowhereton_scenario() {
    let geocodes = Arc::new(AtomicUsize::new(0));
    let base = spawn_mock_server(nowhereton_upstream(geocodes.clone())).await;
    let client = build_http_client(Duration::from_secs(5)).unwrap();
    let registry = ProviderRegistry::new(vec![
        Arc::new(WikipediaProvider::new(client.clone()).with_base_url(format!("{}/w/api.php", base)))
            as Arc<dyn ImageProvider>,
        Arc::new(MapRenderProvider::new(client).with_base_url(base.clone())),
    ]);
    // Default gallery variants: several search phrases per place
    let t = setup_pipeline_with(registry, test_config()).await;
    assert!(t.config.gallery_variants.len() > 1);

    let started = std::time::Instant::now();
    let gallery = t.pipeline.fetch_gallery("Nowhereton", 5).await;

    assert_eq!(gallery.len(), 5);
    assert_eq!(real_count(&gallery), 2);
    assert_eq!(gallery[0].url(), "https://upload.wikimedia.org/nowhereton.jpg");
    assert!(gallery[1].url().starts_with("https://staticmap.openstreetmap.de/"));
    assert_eq!(
        gallery
            .iter()
            .filter(|i| i.provider() == Some(ProviderKind::MapRender))
            .count(),
        1
    );
    for (i, image) in gallery[2..].iter().enumerate() {
        assert!(image.is_placeholder());
        assert!(
            image.url().contains(&format!("Nowhereton-picsum-{}", i)),
            "unexpected placeholder {}",
            image.url()
        );
    }

    // The place is geocoded once, not once per variant
    assert_eq!(geocodes.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_gallery_variants_reach_search_providers() {
    let providers = vec![Arc::new(CountingProvider::new(
        ProviderKind::Pexels,
        &["https://p/nowhereton.jpg"],
    ))];
    let t = setup_pipeline(&providers, test_config()).await;

    t.pipeline.fetch_gallery("Nowhereton", 3).await;

    let variants = test_config().gallery_variants.len();
    assert_eq!(providers[0].calls(), variants);
    assert!(providers[0].terms().contains(&"Nowhereton landmark".to_string()));
}

#[tokio::test]
async fn test_gallery_persists_genuine_subset_and_pads_from_cache() {
    let providers = vec![Arc::new(CountingProvider::new(
        ProviderKind::Unsplash,
        &["https://u/1.jpg", "https://u/2.jpg"],
    ))];
    let config = PipelineConfig {
        gallery_variants: vec!["landmark".to_string()],
        ..test_config()
    };
    let t = setup_pipeline(&providers, config).await;

    let gallery = t.pipeline.fetch_gallery("Oslo", 4).await;
    assert_eq!(real_count(&gallery), 2);

    let stored = t.store.load("oslo").await.unwrap().unwrap();
    assert_eq!(
        stored.gallery_images,
        vec!["https://u/1.jpg".to_string(), "https://u/2.jpg".to_string()]
    );
    let calls = providers[0].calls();

    let again = t.pipeline.fetch_gallery("Oslo", 3).await;
    assert_eq!(again.len(), 3);
    assert_eq!(again[0].url(), "https://u/1.jpg");
    assert!(again[2].url().contains("Oslo-picsum-0"));
    assert_eq!(providers[0].calls(), calls);
}

// ============================================================================
// Manual override and admin refresh
// ============================================================================

#[tokio::test]
async fn test_manual_override_replaces_stored_value() {
    let providers = vec![Arc::new(CountingProvider::new(ProviderKind::Pexels, &["https://p/x.jpg"]))];
    let t = setup_pipeline(&providers, test_config()).await;
    t.store
        .save_featured("paris", "Paris", "https://provider/old.jpg")
        .await
        .unwrap();

    let resolution = t
        .pipeline
        .fetch_featured_image("Paris", Some("https://cms/manual.jpg"), None, Some("paris"))
        .await;
    assert_eq!(resolution.url(), "https://cms/manual.jpg");
    assert_eq!(resolution.source, ResolutionSource::ManualOverride);
    assert_eq!(resolution.persisted, Some(PersistOutcome::Written));

    let next = t.pipeline.fetch_featured_image("Paris", None, None, None).await;
    assert_eq!(next.url(), "https://cms/manual.jpg");
    assert_eq!(providers[0].calls(), 0);
}

#[tokio::test]
async fn test_placeholder_override_not_persisted() {
    let t = setup_pipeline(&[], test_config()).await;
    let resolution = t
        .pipeline
        .fetch_featured_image("Paris", Some("https://via.placeholder.com/800x600"), None, None)
        .await;

    assert!(resolution.image.is_placeholder());
    assert_eq!(resolution.persisted, Some(PersistOutcome::SkippedPlaceholder));
    assert!(t.store.load("paris").await.unwrap().is_none());
}

#[tokio::test]
async fn test_force_refresh_bypasses_caches() {
    let providers = vec![Arc::new(CountingProvider::new(
        ProviderKind::Wikipedia,
        &["https://w/fresh.jpg"],
    ))];
    let t = setup_pipeline(&providers, test_config()).await;
    t.store
        .save_featured("paris", "Paris", "https://provider/stale.jpg")
        .await
        .unwrap();
    t.pipeline.fetch_featured_image("Paris", None, None, None).await;

    let place = PlaceIdentity::new("Paris");
    let refreshed = t.pipeline.force_refresh_featured(&place).await;
    assert_eq!(refreshed.url(), "https://w/fresh.jpg");
    assert_eq!(refreshed.persisted, Some(PersistOutcome::Written));

    let next = t.pipeline.fetch_featured_image("Paris", None, None, None).await;
    assert_eq!(next.url(), "https://w/fresh.jpg");
    assert_eq!(next.source, ResolutionSource::Cache { tier: CacheTier::Hot });
}

#[tokio::test]
async fn test_failed_refresh_keeps_stored_value() {
    let providers = vec![Arc::new(CountingProvider::failing(ProviderKind::Wikipedia))];
    let t = setup_pipeline(&providers, test_config()).await;
    t.store
        .save_featured("paris", "Paris", "https://provider/keep.jpg")
        .await
        .unwrap();

    let refreshed = t.pipeline.force_refresh_featured(&PlaceIdentity::new("Paris")).await;
    assert!(refreshed.image.is_placeholder());

    let stored = t.store.load("paris").await.unwrap().unwrap();
    assert_eq!(stored.featured_image.as_deref(), Some("https://provider/keep.jpg"));
}

#[tokio::test]
async fn test_force_refresh_gallery_overwrites() {
    let providers = vec![Arc::new(CountingProvider::new(ProviderKind::Flickr, &["https://f/new.jpg"]))];
    let config = PipelineConfig {
        gallery_variants: vec!["landmark".to_string()],
        ..test_config()
    };
    let t = setup_pipeline(&providers, config).await;
    t.store
        .save_gallery("kyoto", "Kyoto", &["https://old/1.jpg".to_string()])
        .await
        .unwrap();

    let (gallery, outcome) = t
        .pipeline
        .force_refresh_gallery(&PlaceIdentity::new("Kyoto"), 2)
        .await;
    assert_eq!(gallery.len(), 2);
    assert_eq!(outcome, PersistOutcome::Written);

    let stored = t.store.load("kyoto").await.unwrap().unwrap();
    assert_eq!(stored.gallery_images, vec!["https://f/new.jpg".to_string()]);
}
