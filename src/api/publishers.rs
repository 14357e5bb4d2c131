//! Publisher API endpoints
//!
//! - GET /api/v1/publishers - Publishers with their member ids
//! - POST /api/v1/publishers - Create a publisher (editors)
//! - POST /api/v1/publishers/{id}/members - Attach an editor or journalist (editors)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::api::responses::Format;
use crate::models::PublisherWithMembers;

#[derive(Debug, Deserialize)]
pub struct CreatePublisherRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: i64,
}

/// Publisher as exposed by the API
///
/// Flattened structs do not serialize to XML, so the fields are spelled out.
#[derive(Debug, Serialize)]
pub struct PublisherResponse {
    pub id: i64,
    pub name: String,
    pub editors: Vec<i64>,
    pub journalists: Vec<i64>,
}

impl From<PublisherWithMembers> for PublisherResponse {
    fn from(p: PublisherWithMembers) -> Self {
        Self {
            id: p.publisher.id,
            name: p.publisher.name,
            editors: p.editors,
            journalists: p.journalists,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}/members", post(add_member))
}

async fn list(
    State(state): State<AppState>,
    format: Format,
    _user: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let publishers: Vec<PublisherResponse> = state
        .publisher_service
        .list_with_members()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(format.render_list(&publishers))
}

async fn create(
    State(state): State<AppState>,
    format: Format,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(body): ApiJson<CreatePublisherRequest>,
) -> Result<Response, ApiError> {
    let publisher = state.publisher_service.create(&user, &body.name).await?;

    let mut response = format.render(&PublisherResponse {
        id: publisher.id,
        name: publisher.name,
        editors: Vec::new(),
        journalists: Vec::new(),
    });
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

async fn add_member(
    State(state): State<AppState>,
    format: Format,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(publisher_id): Path<i64>,
    ApiJson(body): ApiJson<AddMemberRequest>,
) -> Result<Response, ApiError> {
    let publisher = state
        .publisher_service
        .add_member(&user, publisher_id, body.user_id)
        .await?;
    Ok(format.render(&PublisherResponse::from(publisher)))
}
