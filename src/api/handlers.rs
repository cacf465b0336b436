//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints and the cached
//! upstream proxy.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    Json,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::cache::{CacheSnapshot, CacheStats, CacheStore, SharedCache};
use crate::config::Config;
use crate::error::{ApiError, CacheError, Result};
use crate::executor::{ApiRequest, RequestExecutor, StaticCredentials};
use crate::loader::CacheLoader;
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, ImportResponse, KeysResponse,
    SetRequest, SetResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedCache,
    /// Read-through loader over the same cache
    pub loader: Arc<CacheLoader>,
}

impl AppState {
    pub fn new(loader: Arc<CacheLoader>) -> Self {
        Self {
            cache: loader.cache().clone(),
            loader,
        }
    }

    /// Builds the cache, executor and loader from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = CacheStore::new(config.cache.clone())?;
        let credentials = Arc::new(StaticCredentials::from_api_key(
            config.upstream.api_key.as_deref(),
        ));
        let executor = RequestExecutor::new(&config.upstream, config.retry.clone(), credentials)?;

        let cache = Arc::new(RwLock::new(store));
        Ok(Self::new(Arc::new(CacheLoader::new(cache, executor))))
    }
}

// == Cache Endpoints ==

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Write lock: reads update access order and stats
    let mut cache = state.cache.write().await;
    let value = cache
        .get(&key)
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;
    let ttl = cache.ttl(&key);

    Ok(Json(GetResponse { key, value, ttl }))
}

/// Handler for PUT /cache/:key
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let mut cache = state.cache.write().await;
    cache.set(key.clone(), req.value, req.ttl)?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let mut cache = state.cache.write().await;
    if !cache.delete(&key) {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let mut cache = state.cache.write().await;
    let cleared = cache.len();
    cache.clear();
    info!(cleared, "cache cleared");

    Json(ClearResponse::new(cleared))
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    let keys = state.cache.write().await.keys();
    Json(KeysResponse::new(keys))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.write().await.stats())
}

/// Handler for GET /export
pub async fn export_handler(State(state): State<AppState>) -> Json<CacheSnapshot> {
    Json(state.cache.read().await.export())
}

/// Handler for POST /import
pub async fn import_handler(
    State(state): State<AppState>,
    Json(snapshot): Json<CacheSnapshot>,
) -> Json<ImportResponse> {
    let offered = snapshot.len();
    let imported = state.cache.write().await.import(snapshot);
    info!(offered, imported, "cache snapshot imported");

    Json(ImportResponse { imported })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Upstream Proxy ==

/// Handler for GET /api/*path
///
/// Served from the cache when possible; concurrent misses share one
/// upstream call.
pub async fn proxy_get_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> std::result::Result<Json<Value>, ApiError> {
    let request = with_query(ApiRequest::get(path), query);
    let value = state.loader.fetch(&request, None).await?;
    Ok(Json(value))
}

/// Handler for POST/PUT/DELETE /api/*path
///
/// Never cached. A successful write drops cached reads of the same
/// resource collection.
pub async fn proxy_write_handler(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> std::result::Result<(StatusCode, Json<Value>), ApiError> {
    let mut request = with_query(ApiRequest::new(method, path), query);
    if !body.is_empty() {
        let json = serde_json::from_slice(&body).map_err(|e| {
            ApiError::client(400, format!("Invalid JSON body: {}", e)).with_code("INVALID_REQUEST")
        })?;
        request = request.with_body(json);
    }

    let response = state.loader.executor().execute(&request).await?;

    let collection = collection_of(&request.path);
    let invalidated = state.loader.invalidate_collection(collection).await;
    if invalidated > 0 {
        info!(collection, invalidated, "invalidated cached reads after write");
    }

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    Ok((status, Json(response.body)))
}

fn with_query(request: ApiRequest, query: Vec<(String, String)>) -> ApiRequest {
    query
        .into_iter()
        .fold(request, |request, (name, value)| request.with_query(name, value))
}

/// First path segment, the resource collection a write belongs to.
fn collection_of(path: &str) -> &str {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}
