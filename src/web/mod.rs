//! Server-rendered pages
//!
//! Browser sessions use the same `session` cookie as the API. Pages that
//! need a user redirect anonymous visitors to `/login`; role violations get a
//! plain `403 Unauthorized`.

pub mod content;
pub mod error;
pub mod pages;
pub mod templates;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    routing::get,
    Router,
};
use serde::Serialize;
use tera::Context;

pub use error::WebError;

use crate::api::middleware::{session_cookie, AppState};
use crate::models::{Content, ContentKind, Publisher, User};

/// Build the page router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/register", get(pages::register_form).post(pages::register))
        .route("/login", get(pages::login_form).post(pages::login))
        .route("/logout", get(pages::logout).post(pages::logout))
        .route("/journalist", get(pages::journalist_dashboard))
        .route("/editor", get(pages::editor_dashboard))
        .route("/subscribe", get(pages::subscribe_form).post(pages::subscribe))
        .nest("/articles", content::router(ContentKind::Article))
        .nest("/newsletters", content::router(ContentKind::Newsletter))
}

/// Logged-in user of a page request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_cookie(&parts.headers).ok_or(WebError::LoginRequired)?;
        state
            .user_service
            .validate_session(&token)
            .await?
            .map(CurrentUser)
            .ok_or(WebError::LoginRequired)
    }
}

/// Submitted form fields in arrival order.
///
/// Checkbox groups repeat their key, so fields are kept as pairs.
#[derive(Debug, Default)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First value of `key`, empty when absent
    pub fn value(&self, key: &str) -> &str {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Every non-empty value of `key` parsed as an id
    pub fn ids(&self, key: &str) -> Result<Vec<i64>, String> {
        self.0
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| {
                v.trim()
                    .parse::<i64>()
                    .map_err(|_| format!("\"{}\" is not a valid value.", v))
            })
            .collect()
    }
}

/// Base template context with the logged-in user
pub fn page_context(user: Option<&User>) -> Context {
    let mut context = Context::new();
    if let Some(user) = user {
        context.insert("current_user", user);
    }
    context
}

/// An item together with its publisher's name for display
#[derive(Debug, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Content,
    pub publisher_name: Option<String>,
}

pub fn item_views(items: Vec<Content>, publishers: &[Publisher]) -> Vec<ItemView> {
    items
        .into_iter()
        .map(|item| {
            let publisher_name = item.publisher.and_then(|id| {
                publishers
                    .iter()
                    .find(|p| p.id == id)
                    .map(|p| p.name.clone())
            });
            ItemView {
                item,
                publisher_name,
            }
        })
        .collect()
}

/// Where a staff member lands after changing content
pub fn dashboard_path(user: &User) -> &'static str {
    if user.is_journalist() {
        "/journalist"
    } else {
        "/editor"
    }
}
