//! Page error responses
//!
//! Pages answer errors with plain text or a redirect rather than the JSON
//! body used by the API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::services::{
    ContentServiceError, PublisherServiceError, SubscriptionServiceError, UserServiceError,
};

#[derive(Debug, Error)]
pub enum WebError {
    /// Anonymous caller on a page that needs a session
    #[error("Login required")]
    LoginRequired,

    /// Role or ownership check failed
    #[error("Unauthorized: {0}")]
    Forbidden(String),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Approval failed after the role check passed
    #[error("Error approving: {0}")]
    Approval(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WebError {
    pub fn forbidden() -> Self {
        WebError::Forbidden("Unauthorized".to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::LoginRequired => Redirect::to("/login").into_response(),
            WebError::Forbidden(msg) if msg == "Unauthorized" => {
                (StatusCode::FORBIDDEN, msg).into_response()
            }
            WebError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, format!("Unauthorized: {}", msg)).into_response()
            }
            WebError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            e @ WebError::Approval(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
            WebError::Internal(e) => {
                tracing::error!("Page error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

impl From<ContentServiceError> for WebError {
    fn from(e: ContentServiceError) -> Self {
        match e {
            ContentServiceError::Validation(errors) => WebError::BadRequest(errors.to_string()),
            ContentServiceError::NotFound => WebError::NotFound,
            ContentServiceError::Forbidden(msg) => WebError::Forbidden(msg),
            ContentServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::ValidationError(errors) => WebError::BadRequest(errors.to_string()),
            UserServiceError::NotFound => WebError::NotFound,
            UserServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::BadRequest(other.to_string()),
        }
    }
}

impl From<SubscriptionServiceError> for WebError {
    fn from(e: SubscriptionServiceError) -> Self {
        match e {
            SubscriptionServiceError::Validation(errors) => WebError::BadRequest(errors.to_string()),
            SubscriptionServiceError::NotFound(_) => WebError::NotFound,
            SubscriptionServiceError::Forbidden(msg) => WebError::Forbidden(msg),
            SubscriptionServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<PublisherServiceError> for WebError {
    fn from(e: PublisherServiceError) -> Self {
        match e {
            PublisherServiceError::Validation(errors) => WebError::BadRequest(errors.to_string()),
            PublisherServiceError::NotFound(_) => WebError::NotFound,
            PublisherServiceError::Forbidden(msg) => WebError::Forbidden(msg),
            PublisherServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}
