//! API routes for the relist server.

pub mod auth;
pub mod listings;
pub mod receipts;
pub mod scans;

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use axum::response::AppendHeaders;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::notify::Notifier;
use crate::storage::ImageStore;

/// Application state shared across handlers.
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub images: ImageStore,
    pub notifier: Notifier,
}

/// Wraps handler data in the `{"status":"ok","data":...}` envelope.
pub(crate) fn ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "data": data}))
}

/// Cache-defeating headers for inventory reads; listings and pending
/// scans change too often for any intermediary cache to be useful.
pub(crate) fn no_store() -> AppendHeaders<[(header::HeaderName, &'static str); 3]> {
    AppendHeaders([
        (
            header::CACHE_CONTROL,
            "no-store, no-cache, must-revalidate, proxy-revalidate",
        ),
        (header::PRAGMA, "no-cache"),
        (header::EXPIRES, "0"),
    ])
}

/// Checks the shared operator bearer token on mutating endpoints.
///
/// When no token is configured the gate is open (development mode; warned
/// about at startup). Comparison is constant-time.
pub(crate) fn require_operator(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.config.operator_token.as_deref() else {
        return Ok(());
    };

    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(AppError::Unauthorized(
            "Invalid or missing operator token".to_string(),
        ));
    }
    Ok(())
}

/// Creates the main API router with all routes mounted.
pub fn create_router(state: Arc<AppState>) -> Router {
    let media_root = state.config.media_root.clone();

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api_routes())
        .nest_service("/media", ServeDir::new(media_root))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/scans", scans::router())
        .nest("/listings", listings::router())
        .nest("/receipts", receipts::router())
        .nest("/auth", auth::router())
}
