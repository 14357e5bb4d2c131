//! Services layer - Business logic
//!
//! Services own the role rules, validation and side effects. Handlers in
//! `api` and `web` only translate between HTTP and these calls.

pub mod content;
pub mod email;
pub mod markdown;
pub mod notification;
pub mod password;
pub mod permission;
pub mod publisher;
pub mod social;
pub mod subscription;
pub mod user;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub use content::{ApprovalOutcome, ContentLists, ContentService, ContentServiceError, EditorDashboard};
pub use email::{mailer_from_config, LogMailer, Mailer, OutgoingEmail, SmtpMailer};
pub use markdown::render_markdown;
pub use notification::{DispatchReport, NotificationBatch, NotificationDispatcher};
pub use password::{hash_password, verify_password};
pub use permission::PermissionService;
pub use publisher::{PublisherService, PublisherServiceError};
pub use social::{compose_post, poster_from_config, DisabledPoster, HttpSocialPoster, SocialPoster};
pub use subscription::{SubscriptionService, SubscriptionServiceError, SubscriptionTarget};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};

/// Validation messages keyed by field name.
///
/// Serializes as `{"field": ["message", ...]}`, which is what both the API
/// error details and the form templates consume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field shorthand
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

impl From<Vec<(&'static str, String)>> for FieldErrors {
    fn from(pairs: Vec<(&'static str, String)>) -> Self {
        let mut errors = Self::new();
        for (field, message) in pairs {
            errors.add(field, message);
        }
        errors
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collect_and_display() {
        let mut errors = FieldErrors::from(vec![
            ("title", "This field is required.".to_string()),
            ("content", "This field is required.".to_string()),
        ]);
        errors.add("title", "Second.");

        assert!(errors.has("title"));
        assert_eq!(errors.get("title").len(), 2);
        assert!(errors.get("publisher").is_empty());
        assert_eq!(
            errors.to_string(),
            "content: This field is required.; title: This field is required. Second."
        );

        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["content"][0], "This field is required.");
    }
}
