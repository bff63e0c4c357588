//! Pipeline fixtures over in-memory SQLite

use super::mock_provider::CountingProvider;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tbr_images::cache::{CacheTierManager, HotCache, InMemoryDistributedCache};
use tbr_images::config::PipelineConfig;
use tbr_images::db::SqlitePlaceStore;
use tbr_images::pipeline::ImagePipeline;
use tbr_images::placeholder::PlaceholderGenerator;
use tbr_images::providers::ProviderRegistry;
use tbr_images::types::ImageProvider;

pub struct TestPipeline {
    pub pipeline: Arc<ImagePipeline>,
    pub store: Arc<SqlitePlaceStore>,
    pub pool: SqlitePool,
    pub config: PipelineConfig,
}

/// Short timeout, default variants
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        provider_timeout_ms: 300,
        ..PipelineConfig::default()
    }
}

pub async fn setup_pipeline(
    providers: &[Arc<CountingProvider>],
    config: PipelineConfig,
) -> TestPipeline {
    let registry = ProviderRegistry::new(
        providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn ImageProvider>)
            .collect(),
    );
    setup_pipeline_with(registry, config).await
}

/// Pipeline over any registry, e.g. real adapters pointed at a mock server
pub async fn setup_pipeline_with(registry: ProviderRegistry, config: PipelineConfig) -> TestPipeline {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    tbr_images::db::init_tables(&pool).await.unwrap();

    let store = Arc::new(SqlitePlaceStore::new(pool.clone()));
    let cache = Arc::new(CacheTierManager::new(
        Arc::new(HotCache::new(Duration::from_secs(60), 100)),
        Arc::new(InMemoryDistributedCache::new()),
        store.clone(),
        PlaceholderGenerator::default(),
        Duration::from_secs(60),
    ));

    TestPipeline {
        pipeline: Arc::new(ImagePipeline::new(registry, cache, &config)),
        store,
        pool,
        config,
    }
}
