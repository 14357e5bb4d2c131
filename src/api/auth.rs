//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - User registration
//! - POST /api/v1/auth/login - User login
//! - POST /api/v1/auth/logout - User logout
//! - GET /api/v1/auth/me - Current user with groups and permissions

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::api::middleware::{
    clear_session_cookie_header, extract_credentials, session_cookie_header, ApiError, AppState,
    ApiJson, AuthenticatedUser, Credentials,
};
use crate::api::responses::{AuthResponse, Format, MeResponse};
use crate::models::UserRole;
use crate::services::{FieldErrors, LoginInput, RegisterInput};

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub password_confirm: Option<String>,
    pub role: Option<String>,
}

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    format: Format,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    let role = match body.role.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<UserRole>().map_err(|_| {
            let errors = FieldErrors::single(
                "role",
                format!("\"{}\" is not a valid choice.", raw),
            );
            ApiError::with_details(
                "VALIDATION_ERROR",
                "Invalid input",
                serde_json::to_value(&errors).unwrap_or_default(),
            )
        })?),
    };

    let password = body.password.clone();
    let user = state
        .user_service
        .register(RegisterInput {
            username: body.username,
            email: body.email,
            password: body.password,
            password_confirm: body.password_confirm,
            role,
        })
        .await?;

    let (user, session) = state
        .user_service
        .login(LoginInput::new(&user.username, password))
        .await?;

    let mut response = format.render(&AuthResponse::new(&user, &session));
    *response.status_mut() = StatusCode::CREATED;
    set_cookie(&mut response, session_cookie_header(&session));
    Ok(response)
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    format: Format,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let (user, session) = state
        .user_service
        .login(LoginInput::new(body.username, body.password))
        .await?;

    let mut response = format.render(&AuthResponse::new(&user, &session));
    set_cookie(&mut response, session_cookie_header(&session));
    Ok(response)
}

/// POST /api/v1/auth/logout
///
/// Drops the session the request was made with. Basic credentials have no
/// session, so only the cookie is cleared.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(Credentials::Token(token)) = extract_credentials(&headers) {
        state.user_service.logout(&token).await?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie_header())],
    ))
}

/// GET /api/v1/auth/me
async fn me(
    State(state): State<AppState>,
    format: Format,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, ApiError> {
    let groups = state
        .permission_service
        .groups_for(user.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let permissions = state
        .permission_service
        .permissions_for(user.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(format.render(&MeResponse {
        user: (&user).into(),
        groups,
        permissions,
    }))
}

fn set_cookie(response: &mut Response, cookie: String) {
    match cookie.parse() {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!("Invalid session cookie header: {}", e),
    }
}

