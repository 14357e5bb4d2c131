//! Reader subscription management
//!
//! Only readers hold subscriptions. A reader can follow publishers and
//! journalists; the subscribe form replaces both sets at once while the API
//! adds or removes single edges on behalf of a client reader.

use crate::db::repositories::{PublisherRepository, SubscriptionRepository, UserRepository};
use crate::models::{Subscriptions, User};
use crate::services::FieldErrors;
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionServiceError {
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// A referenced client, publisher or journalist does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Publisher and/or journalist to follow or drop
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SubscriptionTarget {
    #[serde(default)]
    pub publisher_id: Option<i64>,
    #[serde(default)]
    pub journalist_id: Option<i64>,
}

pub struct SubscriptionService {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    user_repo: Arc<dyn UserRepository>,
    publisher_repo: Arc<dyn PublisherRepository>,
}

impl SubscriptionService {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        user_repo: Arc<dyn UserRepository>,
        publisher_repo: Arc<dyn PublisherRepository>,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
            publisher_repo,
        }
    }

    pub async fn get(&self, reader_id: i64) -> Result<Subscriptions, SubscriptionServiceError> {
        let subs = self
            .subscription_repo
            .get(reader_id)
            .await
            .context("Failed to load subscriptions")?;
        Ok(subs)
    }

    /// Replace both subscription sets of `reader`
    pub async fn replace(
        &self,
        reader: &User,
        mut wanted: Subscriptions,
    ) -> Result<Subscriptions, SubscriptionServiceError> {
        if !reader.is_reader() {
            return Err(SubscriptionServiceError::Forbidden("Unauthorized".to_string()));
        }

        wanted.publishers.sort_unstable();
        wanted.publishers.dedup();
        wanted.journalists.sort_unstable();
        wanted.journalists.dedup();

        let mut errors = FieldErrors::new();
        for &id in &wanted.publishers {
            if !self.publisher_exists(id).await? {
                errors.add("publishers", invalid_choice(id));
            }
        }
        for &id in &wanted.journalists {
            if !self.is_journalist(id).await? {
                errors.add("journalists", invalid_choice(id));
            }
        }
        if !errors.is_empty() {
            return Err(SubscriptionServiceError::Validation(errors));
        }

        self.subscription_repo
            .replace(reader.id, &wanted)
            .await
            .context("Failed to save subscriptions")?;

        tracing::debug!(
            "{} now follows {} publisher(s) and {} journalist(s)",
            reader.username,
            wanted.publishers.len(),
            wanted.journalists.len()
        );
        Ok(wanted)
    }

    /// Add edges for the reader `client_id`.
    ///
    /// Every referenced id is checked before anything is written.
    pub async fn subscribe(
        &self,
        client_id: i64,
        target: SubscriptionTarget,
    ) -> Result<(), SubscriptionServiceError> {
        let client = self.resolve(client_id, target).await?;

        if let Some(publisher_id) = target.publisher_id {
            self.subscription_repo
                .add_publisher(client.id, publisher_id)
                .await
                .context("Failed to subscribe to publisher")?;
        }
        if let Some(journalist_id) = target.journalist_id {
            self.subscription_repo
                .add_journalist(client.id, journalist_id)
                .await
                .context("Failed to subscribe to journalist")?;
        }
        Ok(())
    }

    /// Remove edges for the reader `client_id`
    pub async fn unsubscribe(
        &self,
        client_id: i64,
        target: SubscriptionTarget,
    ) -> Result<(), SubscriptionServiceError> {
        let client = self.resolve(client_id, target).await?;

        if let Some(publisher_id) = target.publisher_id {
            self.subscription_repo
                .remove_publisher(client.id, publisher_id)
                .await
                .context("Failed to unsubscribe from publisher")?;
        }
        if let Some(journalist_id) = target.journalist_id {
            self.subscription_repo
                .remove_journalist(client.id, journalist_id)
                .await
                .context("Failed to unsubscribe from journalist")?;
        }
        Ok(())
    }

    /// Look up a reader by id; anyone else counts as missing
    pub async fn client(&self, client_id: i64) -> Result<User, SubscriptionServiceError> {
        self.user_repo
            .get_by_id(client_id)
            .await
            .context("Failed to load client")?
            .filter(User::is_reader)
            .ok_or_else(|| SubscriptionServiceError::NotFound("client".to_string()))
    }

    async fn resolve(
        &self,
        client_id: i64,
        target: SubscriptionTarget,
    ) -> Result<User, SubscriptionServiceError> {
        let client = self.client(client_id).await?;
        if let Some(id) = target.publisher_id {
            if !self.publisher_exists(id).await? {
                return Err(SubscriptionServiceError::NotFound("publisher".to_string()));
            }
        }
        if let Some(id) = target.journalist_id {
            if !self.is_journalist(id).await? {
                return Err(SubscriptionServiceError::NotFound("journalist".to_string()));
            }
        }
        Ok(client)
    }

    async fn publisher_exists(&self, id: i64) -> Result<bool, SubscriptionServiceError> {
        Ok(self
            .publisher_repo
            .get_by_id(id)
            .await
            .context("Failed to look up publisher")?
            .is_some())
    }

    async fn is_journalist(&self, id: i64) -> Result<bool, SubscriptionServiceError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to look up journalist")?
            .is_some_and(|u| u.is_journalist()))
    }
}

fn invalid_choice(id: i64) -> String {
    format!("Select a valid choice. {} is not one of the available choices.", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxPublisherRepository, SqlxSubscriptionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    struct Fixture {
        service: SubscriptionService,
        reader: User,
        journalist: User,
        editor: User,
        publisher_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::boxed(pool.clone());
        let publishers = SqlxPublisherRepository::boxed(pool.clone());
        let mut created = Vec::new();
        for (name, role) in [
            ("rita", UserRole::Reader),
            ("jo", UserRole::Journalist),
            ("ed", UserRole::Editor),
        ] {
            let user = User::new(name.to_string(), String::new(), "h".to_string(), role);
            created.push(users.create(&user).await.unwrap());
        }
        let publisher = publishers.create("Gazette").await.unwrap();

        let mut created = created.into_iter();
        Fixture {
            service: SubscriptionService::new(
                SqlxSubscriptionRepository::boxed(pool.clone()),
                users,
                publishers,
            ),
            reader: created.next().unwrap(),
            journalist: created.next().unwrap(),
            editor: created.next().unwrap(),
            publisher_id: publisher.id,
        }
    }

    #[tokio::test]
    async fn test_replace_sets_both_lists() {
        let f = setup().await;
        let saved = f
            .service
            .replace(
                &f.reader,
                Subscriptions {
                    publishers: vec![f.publisher_id, f.publisher_id],
                    journalists: vec![f.journalist.id],
                },
            )
            .await
            .unwrap();
        assert_eq!(saved.publishers, vec![f.publisher_id]);
        assert_eq!(f.service.get(f.reader.id).await.unwrap(), saved);

        f.service.replace(&f.reader, Subscriptions::default()).await.unwrap();
        assert!(f.service.get(f.reader.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_rejects_invalid_choices_and_non_readers() {
        let f = setup().await;
        let err = f
            .service
            .replace(
                &f.reader,
                Subscriptions {
                    publishers: vec![404],
                    journalists: vec![f.editor.id],
                },
            )
            .await
            .unwrap_err();
        match err {
            SubscriptionServiceError::Validation(errors) => {
                assert!(errors.has("publishers"));
                assert!(errors.has("journalists"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let err = f
            .service
            .replace(&f.journalist, Subscriptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_subscribe_and_unsubscribe() {
        let f = setup().await;
        let target = SubscriptionTarget {
            publisher_id: Some(f.publisher_id),
            journalist_id: Some(f.journalist.id),
        };

        f.service.subscribe(f.reader.id, target).await.unwrap();
        let subs = f.service.get(f.reader.id).await.unwrap();
        assert!(subs.follows_publisher(f.publisher_id));
        assert!(subs.follows_journalist(f.journalist.id));

        f.service
            .unsubscribe(
                f.reader.id,
                SubscriptionTarget {
                    publisher_id: Some(f.publisher_id),
                    journalist_id: None,
                },
            )
            .await
            .unwrap();
        let subs = f.service.get(f.reader.id).await.unwrap();
        assert!(!subs.follows_publisher(f.publisher_id));
        assert!(subs.follows_journalist(f.journalist.id));
    }

    #[tokio::test]
    async fn test_subscribe_not_found_cases() {
        let f = setup().await;
        let nothing = SubscriptionTarget::default();

        let err = f.service.subscribe(f.editor.id, nothing).await.unwrap_err();
        assert!(matches!(err, SubscriptionServiceError::NotFound(ref what) if what == "client"));

        let bad_publisher = SubscriptionTarget {
            publisher_id: Some(999),
            journalist_id: Some(f.journalist.id),
        };
        let err = f.service.subscribe(f.reader.id, bad_publisher).await.unwrap_err();
        assert!(matches!(err, SubscriptionServiceError::NotFound(ref what) if what == "publisher"));
        // Nothing was written
        assert!(f.service.get(f.reader.id).await.unwrap().is_empty());

        let not_journalist = SubscriptionTarget {
            publisher_id: None,
            journalist_id: Some(f.editor.id),
        };
        let err = f.service.subscribe(f.reader.id, not_journalist).await.unwrap_err();
        assert!(matches!(err, SubscriptionServiceError::NotFound(ref what) if what == "journalist"));
    }
}
