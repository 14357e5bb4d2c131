//! Publisher repository

use crate::models::Publisher;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Membership side of a publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Editor,
    Journalist,
}

impl MemberRole {
    fn table(&self) -> &'static str {
        match self {
            MemberRole::Editor => "publisher_editors",
            MemberRole::Journalist => "publisher_journalists",
        }
    }
}

#[async_trait]
pub trait PublisherRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Publisher>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Publisher>>;

    /// All publishers ordered by name
    async fn list(&self) -> Result<Vec<Publisher>>;

    /// Add a member; adding an existing member is a no-op
    async fn add_member(&self, publisher_id: i64, user_id: i64, role: MemberRole) -> Result<()>;

    /// Member user ids of one side, ascending
    async fn members(&self, publisher_id: i64, role: MemberRole) -> Result<Vec<i64>>;
}

pub struct SqlxPublisherRepository {
    pool: SqlitePool,
}

impl SqlxPublisherRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn PublisherRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PublisherRepository for SqlxPublisherRepository {
    async fn create(&self, name: &str) -> Result<Publisher> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO publishers (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to create publisher")?;

        Ok(Publisher {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Publisher>> {
        let row = sqlx::query("SELECT id, name, created_at FROM publishers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get publisher")?;
        Ok(row.as_ref().map(row_to_publisher))
    }

    async fn list(&self) -> Result<Vec<Publisher>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM publishers ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list publishers")?;
        Ok(rows.iter().map(row_to_publisher).collect())
    }

    async fn add_member(&self, publisher_id: i64, user_id: i64, role: MemberRole) -> Result<()> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (publisher_id, user_id) VALUES (?, ?)",
            role.table()
        );
        sqlx::query(&sql)
            .bind(publisher_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to add publisher member")?;
        Ok(())
    }

    async fn members(&self, publisher_id: i64, role: MemberRole) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT user_id FROM {} WHERE publisher_id = ? ORDER BY user_id",
            role.table()
        );
        let rows = sqlx::query(&sql)
            .bind(publisher_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list publisher members")?;
        Ok(rows.iter().map(|r| r.get("user_id")).collect())
    }
}

fn row_to_publisher(row: &sqlx::sqlite::SqliteRow) -> Publisher {
    Publisher {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxPublisherRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, role) VALUES (1, 'ed', 'h', 'editor'), (2, 'jo', 'h', 'journalist')",
        )
        .execute(&pool)
        .await
        .unwrap();
        SqlxPublisherRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_list_publishers() {
        let repo = setup().await;
        repo.create("Zeta Times").await.unwrap();
        let alpha = repo.create("Alpha Daily").await.unwrap();

        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Alpha Daily", "Zeta Times"]);

        let found = repo.get_by_id(alpha.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Alpha Daily");
        assert!(repo.get_by_id(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_members_by_side() {
        let repo = setup().await;
        let publisher = repo.create("Gazette").await.unwrap();

        repo.add_member(publisher.id, 1, MemberRole::Editor).await.unwrap();
        repo.add_member(publisher.id, 2, MemberRole::Journalist).await.unwrap();
        repo.add_member(publisher.id, 2, MemberRole::Journalist).await.unwrap();

        assert_eq!(repo.members(publisher.id, MemberRole::Editor).await.unwrap(), vec![1]);
        assert_eq!(
            repo.members(publisher.id, MemberRole::Journalist).await.unwrap(),
            vec![2]
        );
    }
}
