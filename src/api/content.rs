//! Article and newsletter API endpoints
//!
//! The same router is mounted twice, once per [`ContentKind`]:
//! - GET /api/v1/{articles,newsletters} - Reader feed (own or `?client_id=`)
//! - POST /api/v1/{articles,newsletters} - Create (journalists)
//! - GET /api/v1/{articles,newsletters}/publisher/{id} - Everything of a publisher
//! - POST /api/v1/{articles,newsletters}/{id}/approve - Approve and notify (editors)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::api::responses::{ApproveResponse, Format};
use crate::models::{ContentInput, ContentKind};
use crate::services::ContentServiceError;

/// Query for feed listings
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub client_id: Option<i64>,
}

/// Build the router for one content kind
pub fn router(kind: ContentKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_feed).post(create))
        .route("/publisher/{id}", get(list_by_publisher))
        .route("/{id}/approve", post(approve))
        .layer(Extension(kind))
}

/// GET feed of approved, subscribed items
///
/// With `client_id` the feed of that reader is returned; otherwise the
/// caller must be a reader.
async fn list_feed(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    format: Format,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<FeedQuery>,
) -> Result<Response, ApiError> {
    let client = match query.client_id {
        Some(client_id) => state.subscription_service.client(client_id).await?,
        None if user.is_reader() => user,
        None => return Err(ApiError::forbidden("Invalid client")),
    };

    let items = state.content_service.feed(kind, client.id).await?;
    Ok(format.render_list(&items))
}

/// POST create an unapproved item authored by the caller
async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    format: Format,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<ApiJson<ContentInput>, ApiError>,
) -> Result<Response, ApiError> {
    // The role decides before the body does
    if !user.is_journalist() {
        return Err(ApiError::forbidden(format!(
            "Only journalists can create {}",
            kind.plural()
        )));
    }
    let ApiJson(body) = body?;
    let item = state.content_service.create(&user, kind, body).await?;

    let mut response = format.render(&item);
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

/// GET all items of a publisher, approved or not
async fn list_by_publisher(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    format: Format,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(publisher_id): Path<i64>,
) -> Result<Response, ApiError> {
    let items = state
        .content_service
        .by_publisher(&user, kind, publisher_id)
        .await?;
    Ok(format.render_list(&items))
}

/// POST approve an item and notify its subscribers
async fn approve(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    format: Format,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let outcome = state
        .content_service
        .approve(&user, kind, id)
        .await
        .map_err(|e| match e {
            ContentServiceError::InternalError(e) => {
                tracing::error!("Approving {} {} failed: {:#}", kind, id, e);
                ApiError::internal_error(format!("Error approving: {}", e))
            }
            other => other.into(),
        })?;

    let item = outcome.item();
    Ok(format.render(&ApproveResponse {
        id: item.id,
        approved: item.approved,
    }))
}
