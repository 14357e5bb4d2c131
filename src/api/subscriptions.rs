//! Subscription API endpoints
//!
//! - POST /api/v1/subscribe - Follow a publisher and/or journalist for a reader
//! - POST /api/v1/unsubscribe - Drop them again

use axum::{extract::State, response::Response, routing::post, Router};
use serde::Deserialize;

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::api::responses::{Format, SuccessResponse};
use crate::services::SubscriptionTarget;

/// Request body shared by subscribe and unsubscribe
#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub client_id: Option<i64>,
    #[serde(flatten)]
    pub target: SubscriptionTarget,
}

impl SubscriptionRequest {
    fn client_id(&self) -> Result<i64, ApiError> {
        self.client_id
            .ok_or_else(|| ApiError::validation_error("client_id required"))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
}

async fn subscribe(
    State(state): State<AppState>,
    format: Format,
    _user: AuthenticatedUser,
    ApiJson(body): ApiJson<SubscriptionRequest>,
) -> Result<Response, ApiError> {
    let client_id = body.client_id()?;
    state
        .subscription_service
        .subscribe(client_id, body.target)
        .await?;

    Ok(format.render(&SuccessResponse {
        success: "Subscribed",
    }))
}

async fn unsubscribe(
    State(state): State<AppState>,
    format: Format,
    _user: AuthenticatedUser,
    ApiJson(body): ApiJson<SubscriptionRequest>,
) -> Result<Response, ApiError> {
    let client_id = body.client_id()?;
    state
        .subscription_service
        .unsubscribe(client_id, body.target)
        .await?;

    Ok(format.render(&SuccessResponse {
        success: "Unsubscribed",
    }))
}
