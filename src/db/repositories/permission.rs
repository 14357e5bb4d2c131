//! Group and permission repository
//!
//! Groups and permissions are keyed by name and codename, and every write is
//! an upsert, so assigning a role any number of times converges on the same
//! rows.

use crate::models::Permission;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Ensure the group exists and holds at least `permissions`.
    /// Returns the group id.
    async fn upsert_group(&self, name: &str, permissions: &[Permission]) -> Result<i64>;

    /// Make `group_id` the user's only group
    async fn set_user_group(&self, user_id: i64, group_id: i64) -> Result<()>;

    /// Group names the user belongs to
    async fn groups_for_user(&self, user_id: i64) -> Result<Vec<String>>;

    /// Distinct permission codenames granted through the user's groups, sorted
    async fn permissions_for_user(&self, user_id: i64) -> Result<Vec<String>>;

    /// Permission codenames of a group, sorted
    async fn permissions_for_group(&self, name: &str) -> Result<Vec<String>>;
}

pub struct SqlxPermissionRepository {
    pool: SqlitePool,
}

impl SqlxPermissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn PermissionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PermissionRepository for SqlxPermissionRepository {
    async fn upsert_group(&self, name: &str, permissions: &[Permission]) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO auth_groups (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&mut *tx)
            .await
            .context("Failed to upsert group")?;
        let group_id: i64 = sqlx::query("SELECT id FROM auth_groups WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to load group")?
            .get("id");

        for permission in permissions {
            let codename = permission.codename();
            sqlx::query(
                r#"
                INSERT INTO auth_permissions (codename, content_type) VALUES (?, ?)
                ON CONFLICT(codename) DO NOTHING
                "#,
            )
            .bind(&codename)
            .bind(permission.kind.as_str())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to upsert permission {}", codename))?;

            sqlx::query(
                r#"
                INSERT OR IGNORE INTO auth_group_permissions (group_id, permission_id)
                SELECT ?, id FROM auth_permissions WHERE codename = ?
                "#,
            )
            .bind(group_id)
            .bind(&codename)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to grant {} to {}", codename, name))?;
        }

        tx.commit().await?;
        Ok(group_id)
    }

    async fn set_user_group(&self, user_id: i64, group_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM auth_user_groups WHERE user_id = ? AND group_id <> ?")
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await
            .context("Failed to leave previous groups")?;
        sqlx::query("INSERT OR IGNORE INTO auth_user_groups (user_id, group_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await
            .context("Failed to join group")?;

        tx.commit().await?;
        Ok(())
    }

    async fn groups_for_user(&self, user_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT g.name FROM auth_groups g
            JOIN auth_user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = ?
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list user groups")?;

        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    async fn permissions_for_user(&self, user_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT p.codename FROM auth_permissions p
            JOIN auth_group_permissions gp ON gp.permission_id = p.id
            JOIN auth_user_groups ug ON ug.group_id = gp.group_id
            WHERE ug.user_id = ?
            ORDER BY p.codename
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list user permissions")?;

        Ok(rows.iter().map(|r| r.get("codename")).collect())
    }

    async fn permissions_for_group(&self, name: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT p.codename FROM auth_permissions p
            JOIN auth_group_permissions gp ON gp.permission_id = p.id
            JOIN auth_groups g ON g.id = gp.group_id
            WHERE g.name = ?
            ORDER BY p.codename
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list group permissions")?;

        Ok(rows.iter().map(|r| r.get("codename")).collect())
    }
}
