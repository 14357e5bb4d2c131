//! Shared API response types
//!
//! Content negotiation between JSON and XML, the response bodies shared by
//! several endpoints, and the conversions from service errors to
//! [`ApiError`].

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::api::middleware::ApiError;
use crate::models::{Session, User};
use crate::services::{
    ContentServiceError, FieldErrors, PublisherServiceError, SubscriptionServiceError,
    UserServiceError,
};

/// Response representation chosen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    /// `?format=xml` wins over the `Accept` header
    pub fn negotiate(query: Option<&str>, accept: Option<&str>) -> Self {
        if let Some(query) = query {
            for pair in query.split('&') {
                match pair.split_once('=') {
                    Some(("format", "xml")) => return Format::Xml,
                    Some(("format", "json")) => return Format::Json,
                    _ => {}
                }
            }
        }

        match accept {
            Some(accept) if accept.contains("application/xml") || accept.contains("text/xml") => {
                Format::Xml
            }
            _ => Format::Json,
        }
    }

    /// Render a single value
    pub fn render<T: Serialize>(self, value: &T) -> Response {
        match self {
            Format::Json => Json(value).into_response(),
            Format::Xml => xml_response(quick_xml::se::to_string_with_root("root", value)),
        }
    }

    /// Render a list as `<root><list-item>..</list-item></root>` in XML
    pub fn render_list<T: Serialize>(self, items: &[T]) -> Response {
        #[derive(Serialize)]
        struct XmlList<'a, T> {
            #[serde(rename = "list-item")]
            items: &'a [T],
        }

        match self {
            Format::Json => Json(items).into_response(),
            Format::Xml => xml_response(quick_xml::se::to_string_with_root(
                "root",
                &XmlList { items },
            )),
        }
    }
}

fn xml_response(body: Result<String, quick_xml::SeError>) -> Response {
    match body {
        Ok(body) => ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], body).into_response(),
        Err(e) => {
            tracing::error!("XML serialization failed: {}", e);
            ApiError::internal_error("Failed to render XML").into_response()
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Format {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let accept = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok());
        Ok(Format::negotiate(parts.uri.query(), accept))
    }
}

// ============================================================================
// Response bodies
// ============================================================================

/// User as exposed by the API
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
        }
    }
}

/// Login and registration response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: String,
}

impl AuthResponse {
    pub fn new(user: &User, session: &Session) -> Self {
        Self {
            user: user.into(),
            token: session.id.clone(),
            expires_at: session.expires_at.to_rfc3339(),
        }
    }
}

/// Current user with derived groups and permissions
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub groups: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub id: i64,
    pub approved: bool,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: &'static str,
}

// ============================================================================
// Service error conversions
// ============================================================================

fn validation(errors: FieldErrors) -> ApiError {
    let details = serde_json::to_value(&errors).unwrap_or_default();
    ApiError::with_details("VALIDATION_ERROR", "Invalid input", details)
}

/// Bodies that are not valid JSON for the endpoint report under `body`
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        validation(FieldErrors::single("body", rejection.body_text()))
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(errors) => validation(errors),
            UserServiceError::UserExists(_) => {
                ApiError::conflict("A user with that username already exists.")
            }
            UserServiceError::NotFound => ApiError::not_found("User not found"),
            UserServiceError::InternalError(e) => {
                tracing::error!("User service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<ContentServiceError> for ApiError {
    fn from(e: ContentServiceError) -> Self {
        match e {
            ContentServiceError::Validation(errors) => validation(errors),
            ContentServiceError::NotFound => ApiError::not_found("Not found."),
            ContentServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ContentServiceError::InternalError(e) => {
                tracing::error!("Content service error: {:#}", e);
                ApiError::internal_error(e.to_string())
            }
        }
    }
}

impl From<SubscriptionServiceError> for ApiError {
    fn from(e: SubscriptionServiceError) -> Self {
        match e {
            SubscriptionServiceError::Validation(errors) => validation(errors),
            SubscriptionServiceError::NotFound(what) => {
                ApiError::not_found(format!("{} not found", capitalize(&what)))
            }
            SubscriptionServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            SubscriptionServiceError::InternalError(e) => {
                tracing::error!("Subscription service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<PublisherServiceError> for ApiError {
    fn from(e: PublisherServiceError) -> Self {
        match e {
            PublisherServiceError::Validation(errors) => validation(errors),
            PublisherServiceError::NotFound(what) => {
                ApiError::not_found(format!("{} not found", capitalize(&what)))
            }
            PublisherServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            PublisherServiceError::InternalError(e) => {
                tracing::error!("Publisher service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    #[derive(Serialize)]
    struct Item {
        id: i64,
        title: String,
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_negotiate() {
        assert_eq!(Format::negotiate(None, None), Format::Json);
        assert_eq!(Format::negotiate(Some("format=xml"), None), Format::Xml);
        assert_eq!(Format::negotiate(Some("client_id=3&format=xml"), None), Format::Xml);
        assert_eq!(Format::negotiate(None, Some("application/xml")), Format::Xml);
        assert_eq!(Format::negotiate(None, Some("text/html, text/xml;q=0.9")), Format::Xml);
        assert_eq!(
            Format::negotiate(Some("format=json"), Some("application/xml")),
            Format::Json
        );
        assert_eq!(Format::negotiate(None, Some("*/*")), Format::Json);
    }

    #[tokio::test]
    async fn test_render_list_xml() {
        let items = vec![
            Item { id: 1, title: "One".to_string() },
            Item { id: 2, title: "Two".to_string() },
        ];
        let response = Format::Xml.render_list(&items);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/xml; charset=utf-8"
        );
        let body = body_string(response).await;
        assert!(body.starts_with("<root>"));
        assert_eq!(body.matches("<list-item>").count(), 2);
        assert!(body.contains("<title>Two</title>"));
    }

    #[tokio::test]
    async fn test_render_xml_escapes_and_handles_empty_lists() {
        let item = Item { id: 2, title: "A & <b>".to_string() };
        let body = body_string(Format::Xml.render(&item)).await;
        assert!(body.contains("<title>A &amp; &lt;b&gt;</title>"));

        let empty: Vec<Item> = Vec::new();
        let body = body_string(Format::Xml.render_list(&empty)).await;
        assert_eq!(body, "<root/>");
    }

    #[tokio::test]
    async fn test_render_json() {
        let response = Format::Json.render(&Item { id: 5, title: "Five".to_string() });
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["id"], 5);
    }

    #[test]
    fn test_service_error_mapping() {
        let e: ApiError = ContentServiceError::Forbidden("Invalid client".to_string()).into();
        assert_eq!(e.error.code, "FORBIDDEN");
        assert_eq!(e.error.message, "Invalid client");

        let e: ApiError = SubscriptionServiceError::NotFound("client".to_string()).into();
        assert_eq!(e.error.code, "NOT_FOUND");
        assert_eq!(e.error.message, "Client not found");

        let e: ApiError = UserServiceError::UserExists("ed".to_string()).into();
        assert_eq!(e.error.code, "CONFLICT");

        let e: ApiError =
            PublisherServiceError::Validation(FieldErrors::single("name", "This field is required."))
                .into();
        assert_eq!(e.error.code, "VALIDATION_ERROR");
        assert_eq!(
            e.error.details.unwrap()["name"][0],
            "This field is required."
        );
    }
}
