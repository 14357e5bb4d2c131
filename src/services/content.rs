//! Article and newsletter service
//!
//! Role rules for writing, editing, approving and reading content. Both
//! kinds follow the same rules, so every operation takes a [`ContentKind`].
//!
//! - create: journalists only, the caller becomes the author
//! - edit/delete: editors any item, journalists their own
//! - approve: editors only; fans out notifications once
//! - read: readers see approved items they subscribe to

use crate::db::repositories::{ContentRepository, PublisherRepository, SubscriptionRepository};
use crate::models::{Content, ContentInput, ContentKind, User, UserRole};
use crate::services::notification::{DispatchReport, NotificationBatch, NotificationDispatcher};
use crate::services::FieldErrors;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, thiserror::Error)]
pub enum ContentServiceError {
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Not found")]
    NotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of an approval request
#[derive(Debug)]
pub enum ApprovalOutcome {
    /// The item went from unapproved to approved and notifications went out
    Approved {
        item: Content,
        batch: NotificationBatch,
        report: DispatchReport,
    },
    /// Nothing changed and nobody was notified
    AlreadyApproved(Content),
}

impl ApprovalOutcome {
    pub fn item(&self) -> &Content {
        match self {
            ApprovalOutcome::Approved { item, .. } => item,
            ApprovalOutcome::AlreadyApproved(item) => item,
        }
    }
}

/// Articles and newsletters side by side
#[derive(Debug, Default, Serialize)]
pub struct ContentLists {
    pub articles: Vec<Content>,
    pub newsletters: Vec<Content>,
}

#[derive(Debug, Default, Serialize)]
pub struct EditorDashboard {
    pub unapproved_articles: Vec<Content>,
    pub approved_articles: Vec<Content>,
    pub unapproved_newsletters: Vec<Content>,
    pub approved_newsletters: Vec<Content>,
}

pub struct ContentService {
    content_repo: Arc<dyn ContentRepository>,
    publisher_repo: Arc<dyn PublisherRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl ContentService {
    pub fn new(
        content_repo: Arc<dyn ContentRepository>,
        publisher_repo: Arc<dyn PublisherRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            content_repo,
            publisher_repo,
            subscription_repo,
            dispatcher,
        }
    }

    /// Create an unapproved item authored by `actor`
    pub async fn create(
        &self,
        actor: &User,
        kind: ContentKind,
        input: ContentInput,
    ) -> Result<Content, ContentServiceError> {
        if !actor.is_journalist() {
            return Err(ContentServiceError::Forbidden(format!(
                "Only journalists can create {}",
                kind.plural()
            )));
        }

        let input = self.clean(input).await?;
        let item = self
            .content_repo
            .create(kind, actor.id, &input)
            .await
            .with_context(|| format!("Failed to create {}", kind))?;

        tracing::info!("{} {} created by {}", kind.label(), item.id, actor.username);
        Ok(item)
    }

    pub async fn get(&self, kind: ContentKind, id: i64) -> Result<Content, ContentServiceError> {
        self.content_repo
            .get(kind, id)
            .await
            .with_context(|| format!("Failed to get {}", kind))?
            .ok_or(ContentServiceError::NotFound)
    }

    /// Load an item `actor` is allowed to edit or delete.
    ///
    /// The role is checked before the lookup, ownership after it.
    pub async fn get_for_edit(
        &self,
        actor: &User,
        kind: ContentKind,
        id: i64,
    ) -> Result<Content, ContentServiceError> {
        if actor.is_reader() {
            return Err(ContentServiceError::Forbidden("Unauthorized".to_string()));
        }
        let item = self.get(kind, id).await?;
        if !actor.can_modify(item.journalist) {
            return Err(ContentServiceError::Forbidden(format!(
                "You can only edit your own {}",
                kind.plural()
            )));
        }
        Ok(item)
    }

    pub async fn update(
        &self,
        actor: &User,
        kind: ContentKind,
        id: i64,
        input: ContentInput,
    ) -> Result<Content, ContentServiceError> {
        self.get_for_edit(actor, kind, id).await?;
        let input = self.clean(input).await?;

        self.content_repo
            .update(kind, id, &input)
            .await
            .with_context(|| format!("Failed to update {}", kind))?
            .ok_or(ContentServiceError::NotFound)
    }

    pub async fn delete(
        &self,
        actor: &User,
        kind: ContentKind,
        id: i64,
    ) -> Result<(), ContentServiceError> {
        self.get_for_edit(actor, kind, id).await?;
        let deleted = self
            .content_repo
            .delete(kind, id)
            .await
            .with_context(|| format!("Failed to delete {}", kind))?;
        if !deleted {
            return Err(ContentServiceError::NotFound);
        }

        tracing::info!("{} {} deleted by {}", kind.label(), id, actor.username);
        Ok(())
    }

    /// Approve an item and notify its audience.
    ///
    /// The audience is every user subscribed to the item's publisher or to
    /// its journalist. Only the request that actually flips the flag sends
    /// notifications.
    pub async fn approve(
        &self,
        actor: &User,
        kind: ContentKind,
        id: i64,
    ) -> Result<ApprovalOutcome, ContentServiceError> {
        if !actor.is_editor() {
            return Err(ContentServiceError::Forbidden(format!(
                "Only editors can approve {}",
                kind.plural()
            )));
        }

        let mut item = self.get(kind, id).await?;
        if item.approved {
            tracing::debug!("{} {} was already approved", kind.label(), id);
            return Ok(ApprovalOutcome::AlreadyApproved(item));
        }

        // Collect the audience before flipping the flag; a failed collection
        // must leave the item unapproved.
        let subscribers = self
            .subscription_repo
            .subscribers_of(item.publisher, item.journalist)
            .await
            .context("Failed to collect subscribers")?;

        let transitioned = self
            .content_repo
            .mark_approved(kind, id)
            .await
            .with_context(|| format!("Failed to approve {}", kind))?;
        item.approved = true;

        if !transitioned {
            tracing::debug!("{} {} was approved concurrently", kind.label(), id);
            return Ok(ApprovalOutcome::AlreadyApproved(item));
        }

        let batch = NotificationBatch::build(&item, &subscribers);
        let report = self.dispatcher.dispatch(&batch).await;

        tracing::info!(
            "{} {} approved by {}, {} subscriber(s)",
            kind.label(),
            id,
            actor.username,
            subscribers.len()
        );
        Ok(ApprovalOutcome::Approved { item, batch, report })
    }

    /// Approved items of one kind visible to a reader
    pub async fn feed(&self, kind: ContentKind, reader_id: i64) -> Result<Vec<Content>, ContentServiceError> {
        let items = self
            .content_repo
            .list_feed(kind, reader_id)
            .await
            .context("Failed to load feed")?;
        Ok(items)
    }

    /// Both feeds of a reader
    pub async fn feed_for(&self, reader: &User) -> Result<ContentLists, ContentServiceError> {
        if !reader.is_reader() {
            return Err(ContentServiceError::Forbidden("Invalid client".to_string()));
        }
        Ok(ContentLists {
            articles: self.feed(ContentKind::Article, reader.id).await?,
            newsletters: self.feed(ContentKind::Newsletter, reader.id).await?,
        })
    }

    /// Everything the journalist wrote, approved or not.
    ///
    /// Items without a publisher in this list are the journalist's
    /// independent work.
    pub async fn journalist_dashboard(&self, actor: &User) -> Result<ContentLists, ContentServiceError> {
        if !actor.is_journalist() {
            return Err(ContentServiceError::Forbidden("Unauthorized".to_string()));
        }
        let mut lists = ContentLists::default();
        for kind in ContentKind::ALL {
            let items = self
                .content_repo
                .list_by_journalist(kind, actor.id)
                .await
                .context("Failed to load journalist content")?;
            match kind {
                ContentKind::Article => lists.articles = items,
                ContentKind::Newsletter => lists.newsletters = items,
            }
        }
        Ok(lists)
    }

    pub async fn editor_dashboard(&self, actor: &User) -> Result<EditorDashboard, ContentServiceError> {
        if !actor.is_editor() {
            return Err(ContentServiceError::Forbidden("Unauthorized".to_string()));
        }
        Ok(EditorDashboard {
            unapproved_articles: self.by_approval(ContentKind::Article, false).await?,
            approved_articles: self.by_approval(ContentKind::Article, true).await?,
            unapproved_newsletters: self.by_approval(ContentKind::Newsletter, false).await?,
            approved_newsletters: self.by_approval(ContentKind::Newsletter, true).await?,
        })
    }

    /// All items of a publisher, for editors and journalists
    pub async fn by_publisher(
        &self,
        actor: &User,
        kind: ContentKind,
        publisher_id: i64,
    ) -> Result<Vec<Content>, ContentServiceError> {
        if actor.role == UserRole::Reader {
            return Err(ContentServiceError::Forbidden(
                "Only editors and journalists".to_string(),
            ));
        }
        let items = self
            .content_repo
            .list_by_publisher(kind, publisher_id)
            .await
            .context("Failed to load publisher content")?;
        Ok(items)
    }

    async fn by_approval(&self, kind: ContentKind, approved: bool) -> Result<Vec<Content>, ContentServiceError> {
        let items = self
            .content_repo
            .list_by_approval(kind, approved)
            .await
            .context("Failed to load content")?;
        Ok(items)
    }

    /// Trim and validate input, including that the publisher exists
    async fn clean(&self, input: ContentInput) -> Result<ContentInput, ContentServiceError> {
        let input = ContentInput::new(input.title.trim(), input.content.trim(), input.publisher);
        let mut errors = FieldErrors::from(input.validate());

        if let Some(publisher_id) = input.publisher {
            let exists = self
                .publisher_repo
                .get_by_id(publisher_id)
                .await
                .context("Failed to look up publisher")?
                .is_some();
            if !exists {
                errors.add("publisher", INVALID_CHOICE);
            }
        }

        if errors.is_empty() {
            Ok(input)
        } else {
            Err(ContentServiceError::Validation(errors))
        }
    }
}
