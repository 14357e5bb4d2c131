//! API middleware
//!
//! Contains:
//! - Shared application state
//! - Authentication (HTTP Basic credentials, bearer token or session cookie)
//! - The JSON error type returned by every API handler, and the body
//!   extractor that reports through it

use axum::{
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tera::Tera;

use crate::config::Config;
use crate::db::repositories::{
    SqlxContentRepository, SqlxPermissionRepository, SqlxPublisherRepository,
    SqlxSessionRepository, SqlxSubscriptionRepository, SqlxUserRepository,
};
use crate::models::{Session, User};
use crate::services::{
    ContentService, Mailer, NotificationDispatcher, PermissionService, PublisherService,
    SocialPoster, SubscriptionService, UserService, UserServiceError,
};

/// Name of the session cookie shared by the API and the HTML pages
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub user_service: Arc<UserService>,
    pub permission_service: Arc<PermissionService>,
    pub content_service: Arc<ContentService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub publisher_service: Arc<PublisherService>,
    pub templates: Arc<Tera>,
}

impl AppState {
    /// Wire repositories and services over `pool`
    pub fn new(
        pool: SqlitePool,
        config: &Config,
        mailer: Arc<dyn Mailer>,
        poster: Arc<dyn SocialPoster>,
    ) -> anyhow::Result<Self> {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let publisher_repo = SqlxPublisherRepository::boxed(pool.clone());
        let subscription_repo = SqlxSubscriptionRepository::boxed(pool.clone());

        let permission_service = Arc::new(PermissionService::new(SqlxPermissionRepository::boxed(
            pool.clone(),
        )));
        let user_service = Arc::new(
            UserService::new(
                user_repo.clone(),
                SqlxSessionRepository::boxed(pool.clone()),
                subscription_repo.clone(),
                permission_service.clone(),
            )
            .with_session_expiration(config.session.expiration_days),
        );
        let content_service = Arc::new(ContentService::new(
            SqlxContentRepository::boxed(pool.clone()),
            publisher_repo.clone(),
            subscription_repo.clone(),
            Arc::new(NotificationDispatcher::new(mailer, poster)),
        ));
        let subscription_service = Arc::new(SubscriptionService::new(
            subscription_repo,
            user_repo.clone(),
            publisher_repo.clone(),
        ));
        let publisher_service = Arc::new(PublisherService::new(publisher_repo, user_repo));

        Ok(Self {
            pool,
            user_service,
            permission_service,
            content_service,
            subscription_service,
            publisher_service,
            templates: Arc::new(crate::web::templates::load()?),
        })
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::UNAUTHORIZED {
            return (
                status,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"api\"")],
                Json(self),
            )
                .into_response();
        }
        (status, Json(self)).into_response()
    }
}

/// JSON request body that rejects with an [`ApiError`] instead of axum's
/// plain-text 422
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Credentials presented with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Token(String),
}

/// Read credentials from the `Authorization` header, falling back to the
/// session cookie
pub fn extract_credentials(headers: &HeaderMap) -> Option<Credentials> {
    if let Some(auth_str) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(encoded) = auth_str.strip_prefix("Basic ") {
            return decode_basic(encoded.trim());
        }
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Some(Credentials::Token(token.trim().to_string()));
        }
    }

    session_cookie(headers).map(Credentials::Token)
}

/// Value of the session cookie, if any
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(str::trim)
        .find_map(|c| c.strip_prefix(prefix.as_str()))
        .filter(|token| !token.is_empty())
        .map(String::from)
}

fn decode_basic(encoded: &str) -> Option<Credentials> {
    let decoded = BASE64.decode(encoded.as_bytes()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials::Basic {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// `Set-Cookie` value opening a browser session
pub fn session_cookie_header(session: &Session) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        session.max_age_secs()
    )
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie_header() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Resolve request credentials to a user.
///
/// `Ok(None)` means no usable credentials were presented.
pub async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    match extract_credentials(headers) {
        Some(Credentials::Basic { username, password }) => {
            match state.user_service.authenticate(&username, &password).await {
                Ok(user) => Ok(Some(user)),
                Err(UserServiceError::AuthenticationError(_)) => {
                    Err(ApiError::unauthorized("Invalid username/password."))
                }
                Err(e) => Err(ApiError::internal_error(e.to_string())),
            }
        }
        Some(Credentials::Token(token)) => state
            .user_service
            .validate_session(&token)
            .await
            .map_err(|e| ApiError::internal_error(format!("Session validation failed: {}", e))),
        None => Ok(None),
    }
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let has_credentials = extract_credentials(request.headers()).is_some();
    let user = resolve_user(&state, request.headers()).await?.ok_or_else(|| {
        if has_credentials {
            ApiError::unauthorized("Invalid or expired session")
        } else {
            ApiError::unauthorized("Authentication credentials were not provided.")
        }
    })?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_extract_bearer_token() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer test-token-123")]);
        assert_eq!(
            extract_credentials(&h),
            Some(Credentials::Token("test-token-123".to_string()))
        );
    }

    #[test]
    fn test_extract_cookie_token() {
        let h = headers(&[(header::COOKIE, "theme=dark; session=test-token-456")]);
        assert_eq!(
            extract_credentials(&h),
            Some(Credentials::Token("test-token-456".to_string()))
        );
    }

    #[test]
    fn test_authorization_header_wins_over_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer bearer-token"),
            (header::COOKIE, "session=cookie-token"),
        ]);
        assert_eq!(
            extract_credentials(&h),
            Some(Credentials::Token("bearer-token".to_string()))
        );
    }

    #[test]
    fn test_extract_basic_credentials() {
        let encoded = BASE64.encode(b"ed:pa:ss");
        let h = headers(&[(header::AUTHORIZATION, &format!("Basic {}", encoded))]);
        assert_eq!(
            extract_credentials(&h),
            Some(Credentials::Basic {
                username: "ed".to_string(),
                password: "pa:ss".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_basic_is_ignored() {
        let h = headers(&[(header::AUTHORIZATION, "Basic !!!")]);
        assert!(extract_credentials(&h).is_none());
        assert!(extract_credentials(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_empty_session_cookie_is_ignored() {
        let h = headers(&[(header::COOKIE, "session=")]);
        assert!(session_cookie(&h).is_none());
    }

    #[test]
    fn test_api_error_status_mapping() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::new("WHATEVER", "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_error_with_details() {
        let details = serde_json::json!({"title": ["This field is required."]});
        let error = ApiError::with_details("VALIDATION_ERROR", "Invalid input", details.clone());
        assert_eq!(error.error.details, Some(details));
    }

    #[test]
    fn test_unauthorized_response_challenges_basic() {
        let response = ApiError::unauthorized("nope").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
