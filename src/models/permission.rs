//! Role permissions
//!
//! Every role maps to one group and a fixed set of permissions on both
//! content kinds:
//!
//! | role       | actions                   |
//! |------------|---------------------------|
//! | reader     | view                      |
//! | editor     | view, change, delete      |
//! | journalist | add, view, change, delete |

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ContentKind, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    Add,
    View,
    Change,
    Delete,
}

impl PermissionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionAction::Add => "add",
            PermissionAction::View => "view",
            PermissionAction::Change => "change",
            PermissionAction::Delete => "delete",
        }
    }
}

/// A permission such as `change_article`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    pub action: PermissionAction,
    pub kind: ContentKind,
}

impl Permission {
    pub fn new(action: PermissionAction, kind: ContentKind) -> Self {
        Self { action, kind }
    }

    /// Codename stored in the permissions table, e.g. `view_newsletter`
    pub fn codename(&self) -> String {
        format!("{}_{}", self.action.as_str(), self.kind.as_str())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.action.as_str(), self.kind.as_str())
    }
}

impl UserRole {
    /// Actions granted to this role on every content kind
    pub fn actions(&self) -> &'static [PermissionAction] {
        use PermissionAction::*;
        match self {
            UserRole::Reader => &[View],
            UserRole::Editor => &[View, Change, Delete],
            UserRole::Journalist => &[Add, View, Change, Delete],
        }
    }

    /// Full permission set of this role, articles first
    pub fn permissions(&self) -> Vec<Permission> {
        ContentKind::ALL
            .iter()
            .flat_map(|kind| {
                self.actions()
                    .iter()
                    .map(move |action| Permission::new(*action, *kind))
            })
            .collect()
    }
}
