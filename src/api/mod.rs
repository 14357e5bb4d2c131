//! API layer - HTTP handlers and routing
//!
//! The REST API lives under `/api/v1`; every endpoint except registration,
//! login and the health check requires credentials. The HTML pages from [`crate::web`] are
//! merged into the same router.

pub mod auth;
pub mod content;
pub mod middleware;
pub mod publishers;
pub mod responses;
pub mod subscriptions;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

use crate::models::ContentKind;

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/articles", content::router(ContentKind::Article))
        .nest("/newsletters", content::router(ContentKind::Newsletter))
        .nest("/publishers", publishers::router())
        .merge(subscriptions::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::public_router())
        .merge(protected_routes)
}

/// GET /api/v1/health - database reachability, no credentials needed
async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    crate::db::ping(&state.pool).await.map_err(|e| {
        tracing::error!("Health check failed: {:#}", e);
        ApiError::internal_error("Database unavailable")
    })?;
    Ok(Json(json!({ "status": "ok" })))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::COOKIE,
        ])
        .allow_credentials(true);
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", cors_origin, e);
            cors
        }
    };

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .merge(crate::web::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
