//! tbr-images - Place Image Service
//!
//! Resolves featured images and galleries for places over HTTP.
//! Default bind address: 127.0.0.1:5780

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tbr_common::config::{RootFolderInitializer, RootFolderResolver};
use tracing::{info, warn};

use tbr_images::cache::{CacheTierManager, DistributedCache, HotCache, InMemoryDistributedCache};
use tbr_images::config::{self, ImagesConfig, DEFAULT_BIND_ADDRESS, MODULE_NAME};
use tbr_images::db::{self, SqlitePlaceStore};
use tbr_images::pipeline::ImagePipeline;
use tbr_images::placeholder::PlaceholderGenerator;
use tbr_images::providers::ProviderRegistry;
use tbr_images::AppState;

#[derive(Debug, Parser)]
#[command(name = "tbr-images", version, about = "TravelBlogr place image service")]
struct Cli {
    /// Root folder holding travelblogr.db
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (overrides TBR_CONFIG and the default location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind, e.g. 127.0.0.1:5780
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(|| tbr_common::config::config_file_path(MODULE_NAME));
    let images_config: ImagesConfig = match &config_path {
        Some(path) => tbr_common::config::load_toml_config(path)?,
        None => ImagesConfig::default(),
    };

    tbr_common::logging::init(&images_config.base.logging)?;

    info!(
        "Starting tbr-images v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => warn!("No config directory available, using defaults"),
    }

    // Root folder: CLI -> ENV -> TOML -> default
    let root_folder =
        RootFolderResolver::new(cli.root_folder, images_config.base.root_folder.clone()).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let pipeline_config = &images_config.pipeline;
    let credentials = config::resolve_provider_credentials(&images_config.credentials);
    let registry = ProviderRegistry::from_credentials(&credentials, pipeline_config.provider_timeout())
        .context("Failed to build provider HTTP client")?;

    let cache = Arc::new(CacheTierManager::new(
        Arc::new(HotCache::new(
            pipeline_config.hot_cache_ttl(),
            pipeline_config.hot_cache_max_entries,
        )),
        distributed_cache(&images_config)?,
        Arc::new(SqlitePlaceStore::new(db_pool)),
        PlaceholderGenerator::new(
            pipeline_config.placeholder_base_url.clone(),
            pipeline_config.placeholder_width,
            pipeline_config.placeholder_height,
        ),
        pipeline_config.distributed_cache_ttl(),
    ));

    let enabled = registry.enabled_kinds();
    let pipeline = Arc::new(ImagePipeline::new(registry, cache, pipeline_config));
    let state = AppState::new(pipeline, enabled, pipeline_config);

    let app = tbr_images::build_router(state);

    let bind_address = cli
        .bind
        .or_else(|| images_config.base.bind_address.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "redis")]
fn distributed_cache(images_config: &ImagesConfig) -> Result<Arc<dyn DistributedCache>> {
    match config::resolve_redis_url(images_config) {
        Some(url) => {
            let cache = tbr_images::cache::RedisCache::new(&url, "tbr-images")
                .context("Invalid Redis URL")?;
            info!("Distributed cache: redis");
            Ok(Arc::new(cache))
        }
        None => {
            info!("Distributed cache: in-memory (no Redis URL configured)");
            Ok(Arc::new(InMemoryDistributedCache::new()))
        }
    }
}

#[cfg(not(feature = "redis"))]
fn distributed_cache(images_config: &ImagesConfig) -> Result<Arc<dyn DistributedCache>> {
    if config::resolve_redis_url(images_config).is_some() {
        warn!("Redis URL configured but built without the `redis` feature; using in-memory cache");
    }
    info!("Distributed cache: in-memory");
    Ok(Arc::new(InMemoryDistributedCache::new()))
}
