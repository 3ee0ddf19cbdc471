use crate::{
    api::{
        error::ApiError,
        response::{with_freshness, ApiResponse},
    },
    cache::CacheKey,
    freshness::{Phase, RefreshOutcome},
    listing::{filter_and_sort, SortKey},
    models::{
        format::{detail_rows, DetailRow},
        AssetRecord, BuyRequest, ListingsPage, PageMeta,
    },
    state::AppState,
    validation::{start_for_page, validate_buy, validate_limit, validate_page, validate_start},
};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

// GET /api/crypto query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListingsQuery {
    pub limit: Option<String>,
    pub start: Option<String>,
    pub page: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub prefetch: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AssetDetail {
    pub asset: AssetRecord,
    pub rows: Vec<DetailRow>,
}

#[derive(Debug, Serialize)]
pub struct RefreshStatus {
    pub seconds: Option<u64>,
    pub phase: Phase,
    pub refreshing: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct RefreshResult {
    pub status: RefreshOutcome,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/crypto", get(get_listings).post(buy))
        .route("/api/crypto/{id}", get(get_asset))
        .route("/api/refresh", get(refresh_status).post(refresh_now))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

async fn health() -> &'static str {
    "ok"
}

/// Resolve `limit`, `page` and `start` into a page fingerprint.
/// `page` wins over `start` when both are given.
fn resolve_page(params: &ListingsQuery, default_limit: u32) -> Result<(u32, u32, u32), ApiError> {
    let limit = match params.limit.as_deref() {
        Some(limit) => validate_limit(limit)?,
        None => default_limit,
    };

    let (page, start) = match (params.page.as_deref(), params.start.as_deref()) {
        (Some(page), _) => {
            let page = validate_page(page)?;
            (page, start_for_page(page, limit)?)
        }
        (None, Some(start)) => {
            let start = validate_start(start)?;
            ((start - 1) / limit + 1, start)
        }
        (None, None) => (1, 1),
    };

    Ok((limit, start, page))
}

// GET /api/crypto handler
async fn get_listings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingsQuery>,
) -> Result<Response, ApiError> {
    let (limit, start, page) = resolve_page(&params, state.config.page_size)?;
    let sort: SortKey = params.sort.as_deref().unwrap_or_default().parse()?;
    let query = params.q.as_deref().unwrap_or_default();

    let key = CacheKey::listings(limit, start);
    state.cache.touch(key);
    let cached = state.cache.get_or_fetch(key).await?;

    if params.prefetch.unwrap_or(false) {
        if let Some(next_start) = start.checked_add(limit) {
            let cache = state.cache.clone();
            let next = CacheKey::listings(limit, next_start);
            tokio::spawn(async move {
                if let Err(e) = cache.prefetch(next).await {
                    warn!("Prefetch of {} failed: {}", next, e);
                }
            });
        }
    }

    let data = filter_and_sort(&cached.records, query, sort);
    debug!(
        "Serving {} of {} listings for {} (q='{}', sort={:?})",
        data.len(),
        cached.records.len(),
        key,
        query,
        sort
    );

    let body = ListingsPage {
        data,
        meta: PageMeta {
            limit,
            start,
            page,
            updated_at: cached.updated_at,
            stale: cached.stale,
        },
    };
    Ok(with_freshness(body, cached.updated_at, cached.stale))
}

// GET /api/crypto/{id} handler; answers from cache only
async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let asset = state
        .cache
        .find_by_id(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Asset {} is not in any loaded page", id)))?;

    let rows = detail_rows(&asset);
    Ok(ApiResponse::new(AssetDetail { asset, rows }).into_response())
}

// POST /api/crypto handler; validates and echoes, nothing is executed
async fn buy(Json(request): Json<BuyRequest>) -> Result<Response, ApiError> {
    let accepted = validate_buy(&request)?;
    info!(
        "Buy submitted: {} USD of {}",
        accepted.amount_usd, accepted.symbol
    );
    Ok(ApiResponse::new(accepted).into_response())
}

// GET /api/refresh handler
async fn refresh_status(State(state): State<Arc<AppState>>) -> Response {
    let coordinator = &state.coordinator;
    let countdown = coordinator.countdown();
    let refreshing =
        coordinator.is_refreshing() || state.cache.is_fetching(coordinator.prefix());

    ApiResponse::new(RefreshStatus {
        seconds: countdown.seconds,
        phase: countdown.phase,
        refreshing,
        interval_ms: u64::try_from(coordinator.interval().as_millis()).unwrap_or(u64::MAX),
    })
    .into_response()
}

// POST /api/refresh handler
async fn refresh_now(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let status = state.coordinator.manual_refresh().await?;
    Ok(ApiResponse::new(RefreshResult { status }).into_response())
}
