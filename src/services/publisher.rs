//! Publisher service
//!
//! Editors create publishers and attach staff. A member joins the side that
//! matches their role; readers cannot join.

use crate::db::repositories::{MemberRole, PublisherRepository, UserRepository};
use crate::models::{Publisher, PublisherWithMembers, User, UserRole, MAX_TITLE_LEN};
use crate::services::FieldErrors;
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PublisherServiceError {
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PublisherService {
    publisher_repo: Arc<dyn PublisherRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl PublisherService {
    pub fn new(publisher_repo: Arc<dyn PublisherRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            publisher_repo,
            user_repo,
        }
    }

    pub async fn create(&self, actor: &User, name: &str) -> Result<Publisher, PublisherServiceError> {
        require_editor(actor)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(PublisherServiceError::Validation(FieldErrors::single(
                "name",
                "This field is required.",
            )));
        }
        if name.chars().count() > MAX_TITLE_LEN {
            return Err(PublisherServiceError::Validation(FieldErrors::single(
                "name",
                format!("Ensure this field has no more than {} characters.", MAX_TITLE_LEN),
            )));
        }

        let publisher = self
            .publisher_repo
            .create(name)
            .await
            .context("Failed to create publisher")?;
        tracing::info!("Publisher {} created by {}", publisher.name, actor.username);
        Ok(publisher)
    }

    /// Plain publisher list, for form choices
    pub async fn list(&self) -> Result<Vec<Publisher>, PublisherServiceError> {
        let publishers = self
            .publisher_repo
            .list()
            .await
            .context("Failed to list publishers")?;
        Ok(publishers)
    }

    pub async fn list_with_members(&self) -> Result<Vec<PublisherWithMembers>, PublisherServiceError> {
        let mut result = Vec::new();
        for publisher in self.list().await? {
            result.push(self.with_members(publisher).await?);
        }
        Ok(result)
    }

    /// Attach a user on the side matching their role
    pub async fn add_member(
        &self,
        actor: &User,
        publisher_id: i64,
        user_id: i64,
    ) -> Result<PublisherWithMembers, PublisherServiceError> {
        require_editor(actor)?;

        let publisher = self
            .publisher_repo
            .get_by_id(publisher_id)
            .await
            .context("Failed to get publisher")?
            .ok_or_else(|| PublisherServiceError::NotFound("publisher".to_string()))?;
        let member = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| PublisherServiceError::NotFound("user".to_string()))?;

        let side = match member.role {
            UserRole::Editor => MemberRole::Editor,
            UserRole::Journalist => MemberRole::Journalist,
            UserRole::Reader => {
                return Err(PublisherServiceError::Validation(FieldErrors::single(
                    "user_id",
                    "Only editors and journalists can join a publisher.",
                )))
            }
        };

        self.publisher_repo
            .add_member(publisher.id, member.id, side)
            .await
            .context("Failed to add publisher member")?;
        tracing::info!("{} joined {} as {}", member.username, publisher.name, member.role);

        self.with_members(publisher).await
    }

    async fn with_members(&self, publisher: Publisher) -> Result<PublisherWithMembers, PublisherServiceError> {
        let editors = self
            .publisher_repo
            .members(publisher.id, MemberRole::Editor)
            .await
            .context("Failed to list editors")?;
        let journalists = self
            .publisher_repo
            .members(publisher.id, MemberRole::Journalist)
            .await
            .context("Failed to list journalists")?;
        Ok(PublisherWithMembers {
            publisher,
            editors,
            journalists,
        })
    }
}

fn require_editor(actor: &User) -> Result<(), PublisherServiceError> {
    if actor.is_editor() {
        Ok(())
    } else {
        Err(PublisherServiceError::Forbidden(
            "Only editors can manage publishers".to_string(),
        ))
    }
}
