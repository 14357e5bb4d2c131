//! Approval notifications
//!
//! When an item is approved its subscribers get one email each and the
//! item is announced once on the social feed. The work is first collected
//! into a [`NotificationBatch`], then handed to the
//! [`NotificationDispatcher`]. Delivery failures are logged and counted,
//! never returned to the caller.

use crate::models::{Content, User};
use crate::services::email::{Mailer, OutgoingEmail};
use crate::services::social::{compose_post, SocialPoster};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Everything one approval sends out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationBatch {
    pub emails: Vec<OutgoingEmail>,
    pub social_post: String,
}

impl NotificationBatch {
    /// Build the batch for `item`. Subscribers without an email address
    /// are skipped, and each user receives at most one email.
    pub fn build(item: &Content, subscribers: &[User]) -> Self {
        let subject = format!("New {}: {}", item.kind.label(), item.title);
        let mut seen = HashSet::new();

        let emails = subscribers
            .iter()
            .filter(|u| u.has_email() && seen.insert(u.id))
            .map(|u| OutgoingEmail {
                to: u.email.trim().to_string(),
                subject: subject.clone(),
                body: item.content.clone(),
            })
            .collect();

        Self {
            emails,
            social_post: compose_post(item),
        }
    }
}

/// Outcome counts of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub posted: bool,
}

pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    poster: Arc<dyn SocialPoster>,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, poster: Arc<dyn SocialPoster>) -> Self {
        Self { mailer, poster }
    }

    pub async fn dispatch(&self, batch: &NotificationBatch) -> DispatchReport {
        let mut report = DispatchReport::default();

        for email in &batch.emails {
            match self.mailer.send(email).await {
                Ok(()) => report.emails_sent += 1,
                Err(e) => {
                    report.emails_failed += 1;
                    tracing::warn!(to = %email.to, error = %e, "Notification email failed");
                }
            }
        }

        match self.poster.post(&batch.social_post).await {
            Ok(()) => report.posted = true,
            Err(e) => tracing::warn!(error = %e, "Social post failed"),
        }

        tracing::info!(
            sent = report.emails_sent,
            failed = report.emails_failed,
            posted = report.posted,
            "Notifications dispatched"
        );
        report
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingMailer, RecordingPoster};
    use super::*;
    use crate::models::{ContentKind, UserRole};
    use chrono::Utc;

    fn article() -> Content {
        Content {
            id: 5,
            kind: ContentKind::Article,
            title: "Budget passes".to_string(),
            content: "The council voted.".to_string(),
            publisher: Some(1),
            journalist: Some(2),
            approved: true,
            date: Utc::now(),
        }
    }

    fn reader(id: i64, email: &str) -> User {
        let mut user = User::new(format!("r{}", id), email.to_string(), "h".to_string(), UserRole::Reader);
        user.id = id;
        user
    }

    #[test]
    fn test_batch_skips_missing_emails_and_duplicates() {
        let subscribers = vec![
            reader(1, "a@example.com"),
            reader(2, ""),
            reader(3, "  "),
            reader(1, "a@example.com"),
            reader(4, "d@example.com"),
        ];
        let batch = NotificationBatch::build(&article(), &subscribers);

        let to: Vec<_> = batch.emails.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(to, vec!["a@example.com", "d@example.com"]);
        assert_eq!(batch.emails[0].subject, "New Article: Budget passes");
        assert_eq!(batch.emails[0].body, "The council voted.");
        assert_eq!(batch.social_post, "New Article: Budget passes - The council voted....");
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let mailer = Arc::new(RecordingMailer {
            failing: vec!["a@example.com".to_string()],
            ..Default::default()
        });
        let poster = Arc::new(RecordingPoster {
            fail: true,
            ..Default::default()
        });
        let dispatcher = NotificationDispatcher::new(mailer.clone(), poster.clone());

        let batch = NotificationBatch::build(
            &article(),
            &[reader(1, "a@example.com"), reader(2, "b@example.com")],
        );
        let report = dispatcher.dispatch(&batch).await;

        assert_eq!(
            report,
            DispatchReport {
                emails_sent: 1,
                emails_failed: 1,
                posted: false
            }
        );
        assert_eq!(mailer.sent().len(), 1);
        assert!(poster.posts().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_posts_once_without_subscribers() {
        let mailer = Arc::new(RecordingMailer::default());
        let poster = Arc::new(RecordingPoster::default());
        let dispatcher = NotificationDispatcher::new(mailer.clone(), poster.clone());

        let report = dispatcher.dispatch(&NotificationBatch::build(&article(), &[])).await;

        assert!(report.posted);
        assert_eq!(report.emails_sent, 0);
        assert_eq!(poster.posts().len(), 1);
    }
}
