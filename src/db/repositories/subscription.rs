//! Subscription graph repository
//!
//! Two edge tables: reader→publisher and reader→journalist. Visible content
//! is computed from them at read time.

use super::user::{row_to_user, SELECT_USER};
use crate::models::{Subscriptions, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn get(&self, reader_id: i64) -> Result<Subscriptions>;

    /// Replace both edge sets of a reader atomically
    async fn replace(&self, reader_id: i64, subscriptions: &Subscriptions) -> Result<()>;

    async fn add_publisher(&self, reader_id: i64, publisher_id: i64) -> Result<()>;

    async fn add_journalist(&self, reader_id: i64, journalist_id: i64) -> Result<()>;

    async fn remove_publisher(&self, reader_id: i64, publisher_id: i64) -> Result<()>;

    async fn remove_journalist(&self, reader_id: i64, journalist_id: i64) -> Result<()>;

    /// Drop every subscription held by `user_id`
    async fn clear(&self, user_id: i64) -> Result<()>;

    /// Distinct users subscribed to the publisher or to the journalist
    async fn subscribers_of(
        &self,
        publisher_id: Option<i64>,
        journalist_id: Option<i64>,
    ) -> Result<Vec<User>>;
}

pub struct SqlxSubscriptionRepository {
    pool: SqlitePool,
}

impl SqlxSubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn SubscriptionRepository> {
        Arc::new(Self::new(pool))
    }

    async fn run(&self, sql: &str, a: i64, b: i64, what: &str) -> Result<()> {
        sqlx::query(sql)
            .bind(a)
            .bind(b)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to {}", what))?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for SqlxSubscriptionRepository {
    async fn get(&self, reader_id: i64) -> Result<Subscriptions> {
        let publishers = sqlx::query(
            "SELECT publisher_id FROM subscriptions_publishers WHERE reader_id = ? ORDER BY publisher_id",
        )
        .bind(reader_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load publisher subscriptions")?;
        let journalists = sqlx::query(
            "SELECT journalist_id FROM subscriptions_journalists WHERE reader_id = ? ORDER BY journalist_id",
        )
        .bind(reader_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load journalist subscriptions")?;

        Ok(Subscriptions {
            publishers: publishers.iter().map(|r| r.get("publisher_id")).collect(),
            journalists: journalists.iter().map(|r| r.get("journalist_id")).collect(),
        })
    }

    async fn replace(&self, reader_id: i64, subscriptions: &Subscriptions) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM subscriptions_publishers WHERE reader_id = ?")
            .bind(reader_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM subscriptions_journalists WHERE reader_id = ?")
            .bind(reader_id)
            .execute(&mut *tx)
            .await?;

        for publisher_id in &subscriptions.publishers {
            sqlx::query(
                "INSERT OR IGNORE INTO subscriptions_publishers (reader_id, publisher_id) VALUES (?, ?)",
            )
            .bind(reader_id)
            .bind(*publisher_id)
            .execute(&mut *tx)
            .await
            .context("Failed to subscribe to publisher")?;
        }
        for journalist_id in &subscriptions.journalists {
            sqlx::query(
                "INSERT OR IGNORE INTO subscriptions_journalists (reader_id, journalist_id) VALUES (?, ?)",
            )
            .bind(reader_id)
            .bind(*journalist_id)
            .execute(&mut *tx)
            .await
            .context("Failed to subscribe to journalist")?;
        }

        tx.commit().await.context("Failed to replace subscriptions")?;
        Ok(())
    }

    async fn add_publisher(&self, reader_id: i64, publisher_id: i64) -> Result<()> {
        self.run(
            "INSERT OR IGNORE INTO subscriptions_publishers (reader_id, publisher_id) VALUES (?, ?)",
            reader_id,
            publisher_id,
            "subscribe to publisher",
        )
        .await
    }

    async fn add_journalist(&self, reader_id: i64, journalist_id: i64) -> Result<()> {
        self.run(
            "INSERT OR IGNORE INTO subscriptions_journalists (reader_id, journalist_id) VALUES (?, ?)",
            reader_id,
            journalist_id,
            "subscribe to journalist",
        )
        .await
    }

    async fn remove_publisher(&self, reader_id: i64, publisher_id: i64) -> Result<()> {
        self.run(
            "DELETE FROM subscriptions_publishers WHERE reader_id = ? AND publisher_id = ?",
            reader_id,
            publisher_id,
            "unsubscribe from publisher",
        )
        .await
    }

    async fn remove_journalist(&self, reader_id: i64, journalist_id: i64) -> Result<()> {
        self.run(
            "DELETE FROM subscriptions_journalists WHERE reader_id = ? AND journalist_id = ?",
            reader_id,
            journalist_id,
            "unsubscribe from journalist",
        )
        .await
    }

    async fn clear(&self, user_id: i64) -> Result<()> {
        self.replace(user_id, &Subscriptions::default()).await
    }

    async fn subscribers_of(
        &self,
        publisher_id: Option<i64>,
        journalist_id: Option<i64>,
    ) -> Result<Vec<User>> {
        // NULL never matches, so a missing side contributes nobody.
        let sql = format!(
            r#"{}
            WHERE id IN (SELECT reader_id FROM subscriptions_publishers WHERE publisher_id = ?)
               OR id IN (SELECT reader_id FROM subscriptions_journalists WHERE journalist_id = ?)
            ORDER BY id"#,
            SELECT_USER
        );
        let rows = sqlx::query(&sql)
            .bind(publisher_id)
            .bind(journalist_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to collect subscribers")?;

        rows.iter().map(row_to_user).collect()
    }
}
