//! Router assembly shared by the server binary and the route tests.

use crate::handlers::{self, AppState};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Largest accepted request body (PDF uploads): 10 MiB.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Every data route. Rate limiting is layered on by the caller.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/zillow", get(handlers::zillow))
        .route("/census", get(handlers::census))
        .route("/api/census", get(handlers::census))
        .route("/api/news", get(handlers::news))
        .route("/api/news/:preset", get(handlers::news_preset))
        .route("/api/rates", get(handlers::rates))
        .route("/api/geocode", get(handlers::geocode))
        .route("/api/report", get(handlers::report))
        .route("/api/upload", post(handlers::upload))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
}

/// Adds `/health` (outside any layers on `api`), tracing and CORS.
pub fn build_app(api: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// The full application without per-IP rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    build_app(api_routes(), state)
}

/// Allows the configured origins; entries that are not valid header values
/// are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
