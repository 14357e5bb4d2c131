//! Role to group/permission assignment
//!
//! Each role owns one group ("Readers", "Editors", "Journalists") holding the
//! role's fixed permission set. Assignment upserts the group and its
//! permissions, then makes it the user's only group. Running it again for
//! the same role changes nothing.

use crate::db::repositories::PermissionRepository;
use crate::models::{Permission, User};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct PermissionService {
    repo: Arc<dyn PermissionRepository>,
}

impl PermissionService {
    pub fn new(repo: Arc<dyn PermissionRepository>) -> Self {
        Self { repo }
    }

    /// Put `user` in the group of its current role, creating the group and
    /// granting its permissions if needed. Membership of other role groups
    /// is dropped.
    pub async fn assign_role(&self, user: &User) -> Result<()> {
        let group_name = user.role.group_name();
        let group_id = self
            .repo
            .upsert_group(&group_name, &user.role.permissions())
            .await
            .with_context(|| format!("Failed to prepare group {}", group_name))?;

        self.repo
            .set_user_group(user.id, group_id)
            .await
            .with_context(|| format!("Failed to add {} to {}", user.username, group_name))?;

        tracing::debug!("User {} assigned to group {}", user.username, group_name);
        Ok(())
    }

    /// Permission codenames held by the user, sorted
    pub async fn permissions_for(&self, user_id: i64) -> Result<Vec<String>> {
        self.repo.permissions_for_user(user_id).await
    }

    /// Group names the user belongs to
    pub async fn groups_for(&self, user_id: i64) -> Result<Vec<String>> {
        self.repo.groups_for_user(user_id).await
    }

    pub async fn has_permission(&self, user_id: i64, permission: Permission) -> Result<bool> {
        let codename = permission.codename();
        Ok(self
            .repo
            .permissions_for_user(user_id)
            .await?
            .iter()
            .any(|p| *p == codename))
    }
}
