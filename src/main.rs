// Load configuration
// Set up logging
// Build the listings client and shared query cache
// Start the freshness coordinator
// Start HTTP server

use price_board::{
    api, cache,
    cache::{CacheKey, KeyPrefix},
    clock::{Clock, SystemClock},
    config::Config,
    freshness::FreshnessCoordinator,
    source::{CoinMarketCapClient, ListingsSource},
    state::AppState,
};

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting price-board");

    // Load configuration
    let config = Config::from_env();
    if config.cmc_api_key.is_empty() {
        tracing::warn!("CMC_API_KEY is not set; upstream requests will be rejected");
    }

    // Listings client and cache
    let source: Arc<dyn ListingsSource> = Arc::new(CoinMarketCapClient::new(&config)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let query_cache = cache::init_cache(&config, source, clock.clone());
    tracing::info!(
        "Cache initialized with capacity: {}, idle TTL: {:?}",
        config.cache_max_capacity,
        config.cache_idle_ttl
    );

    // The first page is always on screen
    let _first_page = query_cache.subscribe(CacheKey::listings(config.page_size, 1));
    if let Err(e) = query_cache.fetch(CacheKey::listings(config.page_size, 1)).await {
        tracing::warn!("Initial listings fetch failed: {}", e);
    }

    // Freshness coordinator
    let coordinator = Arc::new(FreshnessCoordinator::new(
        Arc::new(query_cache.clone()),
        KeyPrefix::listings(),
        config.refresh_interval,
        clock,
    ));
    let coordinator_handle = coordinator.start();

    // Create shared state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        cache: query_cache,
        coordinator,
    });

    // Start HTTP server
    let app = api::create_router(app_state);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    coordinator_handle.join().await;
    Ok(())
}
