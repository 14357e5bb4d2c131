//! Article and newsletter repository
//!
//! One implementation serves both kinds; `ContentKind::plural()` picks the
//! table. Lists are ordered newest first.

use crate::models::{Content, ContentInput, ContentKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Insert an unapproved item written by `journalist_id`
    async fn create(
        &self,
        kind: ContentKind,
        journalist_id: i64,
        input: &ContentInput,
    ) -> Result<Content>;

    async fn get(&self, kind: ContentKind, id: i64) -> Result<Option<Content>>;

    /// Replace title, body and publisher; authorship and approval are untouched
    async fn update(&self, kind: ContentKind, id: i64, input: &ContentInput) -> Result<Option<Content>>;

    /// Returns whether a row was deleted
    async fn delete(&self, kind: ContentKind, id: i64) -> Result<bool>;

    /// Flip `approved` from false to true.
    ///
    /// Returns `false` when the item was already approved (or does not exist),
    /// so concurrent approvals transition the row exactly once.
    async fn mark_approved(&self, kind: ContentKind, id: i64) -> Result<bool>;

    async fn list_by_journalist(&self, kind: ContentKind, journalist_id: i64) -> Result<Vec<Content>>;

    async fn list_by_approval(&self, kind: ContentKind, approved: bool) -> Result<Vec<Content>>;

    /// Every item of a publisher, approved or not
    async fn list_by_publisher(&self, kind: ContentKind, publisher_id: i64) -> Result<Vec<Content>>;

    /// Approved items whose publisher or journalist the reader subscribes to
    async fn list_feed(&self, kind: ContentKind, reader_id: i64) -> Result<Vec<Content>>;
}

pub struct SqlxContentRepository {
    pool: SqlitePool,
}

impl SqlxContentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn ContentRepository> {
        Arc::new(Self::new(pool))
    }

    async fn list_where(
        &self,
        kind: ContentKind,
        predicate: &str,
        binds: &[i64],
    ) -> Result<Vec<Content>> {
        let sql = format!(
            "{} WHERE {} ORDER BY created_at DESC, id DESC",
            select_sql(kind),
            predicate
        );
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {}", kind.plural()))?;

        Ok(rows.iter().map(|row| row_to_content(kind, row)).collect())
    }
}

fn select_sql(kind: ContentKind) -> String {
    format!(
        "SELECT id, title, content, publisher_id, journalist_id, approved, created_at FROM {}",
        kind.plural()
    )
}

fn row_to_content(kind: ContentKind, row: &sqlx::sqlite::SqliteRow) -> Content {
    Content {
        id: row.get("id"),
        kind,
        title: row.get("title"),
        content: row.get("content"),
        publisher: row.get("publisher_id"),
        journalist: row.get("journalist_id"),
        approved: row.get::<i64, _>("approved") != 0,
        date: row.get("created_at"),
    }
}

#[async_trait]
impl ContentRepository for SqlxContentRepository {
    async fn create(
        &self,
        kind: ContentKind,
        journalist_id: i64,
        input: &ContentInput,
    ) -> Result<Content> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO {} (title, content, publisher_id, journalist_id, approved, created_at) VALUES (?, ?, ?, ?, 0, ?)",
            kind.plural()
        );
        let result = sqlx::query(&sql)
            .bind(input.title.trim())
            .bind(&input.content)
            .bind(input.publisher)
            .bind(journalist_id)
            .bind(now)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create {}", kind))?;

        Ok(Content {
            id: result.last_insert_rowid(),
            kind,
            title: input.title.trim().to_string(),
            content: input.content.clone(),
            publisher: input.publisher,
            journalist: Some(journalist_id),
            approved: false,
            date: now,
        })
    }

    async fn get(&self, kind: ContentKind, id: i64) -> Result<Option<Content>> {
        let sql = format!("{} WHERE id = ?", select_sql(kind));
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to get {}", kind))?;
        Ok(row.map(|row| row_to_content(kind, &row)))
    }

    async fn update(&self, kind: ContentKind, id: i64, input: &ContentInput) -> Result<Option<Content>> {
        let sql = format!(
            "UPDATE {} SET title = ?, content = ?, publisher_id = ? WHERE id = ?",
            kind.plural()
        );
        let result = sqlx::query(&sql)
            .bind(input.title.trim())
            .bind(&input.content)
            .bind(input.publisher)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update {}", kind))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(kind, id).await
    }

    async fn delete(&self, kind: ContentKind, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.plural());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {}", kind))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_approved(&self, kind: ContentKind, id: i64) -> Result<bool> {
        let sql = format!(
            "UPDATE {} SET approved = 1 WHERE id = ? AND approved = 0",
            kind.plural()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to approve {}", kind))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_by_journalist(&self, kind: ContentKind, journalist_id: i64) -> Result<Vec<Content>> {
        self.list_where(kind, "journalist_id = ?", &[journalist_id]).await
    }

    async fn list_by_approval(&self, kind: ContentKind, approved: bool) -> Result<Vec<Content>> {
        self.list_where(kind, "approved = ?", &[approved as i64]).await
    }

    async fn list_by_publisher(&self, kind: ContentKind, publisher_id: i64) -> Result<Vec<Content>> {
        self.list_where(kind, "publisher_id = ?", &[publisher_id]).await
    }

    async fn list_feed(&self, kind: ContentKind, reader_id: i64) -> Result<Vec<Content>> {
        self.list_where(
            kind,
            r#"approved = 1 AND (
                publisher_id IN (SELECT publisher_id FROM subscriptions_publishers WHERE reader_id = ?)
                OR journalist_id IN (SELECT journalist_id FROM subscriptions_journalists WHERE reader_id = ?)
            )"#,
            &[reader_id, reader_id],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (SqlitePool, SqlxContentRepository) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        sqlx::query(
            r#"INSERT INTO users (id, username, password_hash, role) VALUES
                (1, 'jo', 'h', 'journalist'),
                (2, 'jay', 'h', 'journalist'),
                (3, 'rae', 'h', 'reader')"#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO publishers (id, name) VALUES (10, 'Daily'), (11, 'Weekly')")
            .execute(&pool)
            .await
            .unwrap();
        (pool.clone(), SqlxContentRepository::new(pool))
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let (_pool, repo) = setup().await;
        let created = repo
            .create(ContentKind::Article, 1, &ContentInput::new(" Title ", "Body", Some(10)))
            .await
            .unwrap();

        assert_eq!(created.title, "Title");
        assert!(!created.approved);
        assert_eq!(created.journalist, Some(1));

        let updated = repo
            .update(ContentKind::Article, created.id, &ContentInput::new("New", "Text", None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.publisher, None);
        assert_eq!(updated.journalist, Some(1));

        assert!(repo.delete(ContentKind::Article, created.id).await.unwrap());
        assert!(!repo.delete(ContentKind::Article, created.id).await.unwrap());
        assert!(repo.get(ContentKind::Article, created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_kinds_use_separate_tables() {
        let (_pool, repo) = setup().await;
        let article = repo
            .create(ContentKind::Article, 1, &ContentInput::new("A", "a", None))
            .await
            .unwrap();

        assert!(repo.get(ContentKind::Newsletter, article.id).await.unwrap().is_none());
        assert_eq!(
            repo.list_by_journalist(ContentKind::Newsletter, 1).await.unwrap().len(),
            0
        );
    }

    #[tokio::test]
    async fn test_mark_approved_transitions_once() {
        let (_pool, repo) = setup().await;
        let item = repo
            .create(ContentKind::Newsletter, 1, &ContentInput::new("N", "n", None))
            .await
            .unwrap();

        assert!(repo.mark_approved(ContentKind::Newsletter, item.id).await.unwrap());
        assert!(!repo.mark_approved(ContentKind::Newsletter, item.id).await.unwrap());
        assert!(!repo.mark_approved(ContentKind::Newsletter, 999).await.unwrap());

        let approved = repo.list_by_approval(ContentKind::Newsletter, true).await.unwrap();
        assert_eq!(approved.len(), 1);
        assert!(repo
            .list_by_approval(ContentKind::Newsletter, false)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_feed_filters_by_subscription_and_approval() {
        let (pool, repo) = setup().await;
        let input = |t: &str, p: Option<i64>| ContentInput::new(t, "body", p);

        let via_publisher = repo.create(ContentKind::Article, 2, &input("daily", Some(10))).await.unwrap();
        let via_journalist = repo.create(ContentKind::Article, 1, &input("indie", None)).await.unwrap();
        let unapproved = repo.create(ContentKind::Article, 1, &input("draft", Some(10))).await.unwrap();
        let unrelated = repo.create(ContentKind::Article, 2, &input("weekly", Some(11))).await.unwrap();

        for id in [via_publisher.id, via_journalist.id, unrelated.id] {
            repo.mark_approved(ContentKind::Article, id).await.unwrap();
        }

        sqlx::query("INSERT INTO subscriptions_publishers (reader_id, publisher_id) VALUES (3, 10)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO subscriptions_journalists (reader_id, journalist_id) VALUES (3, 1)")
            .execute(&pool)
            .await
            .unwrap();

        let feed = repo.list_feed(ContentKind::Article, 3).await.unwrap();
        let mut ids: Vec<_> = feed.iter().map(|c| c.id).collect();
        ids.sort();
        assert_eq!(ids, vec![via_publisher.id, via_journalist.id]);
        assert!(!ids.contains(&unapproved.id));
        assert!(!ids.contains(&unrelated.id));
    }

    #[tokio::test]
    async fn test_list_by_publisher_includes_unapproved() {
        let (_pool, repo) = setup().await;
        repo.create(ContentKind::Article, 1, &ContentInput::new("a", "b", Some(10)))
            .await
            .unwrap();
        repo.create(ContentKind::Article, 2, &ContentInput::new("c", "d", Some(10)))
            .await
            .unwrap();
        repo.create(ContentKind::Article, 2, &ContentInput::new("e", "f", Some(11)))
            .await
            .unwrap();

        assert_eq!(repo.list_by_publisher(ContentKind::Article, 10).await.unwrap().len(), 2);
    }
}
