//! User model
//!
//! A user is a reader, an editor or a journalist. The role decides which
//! permission group the account belongs to and whether it may hold
//! subscriptions (only readers may).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address, may be empty
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new unsaved user.
    ///
    /// The password must already be hashed with `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_reader(&self) -> bool {
        self.role == UserRole::Reader
    }

    pub fn is_editor(&self) -> bool {
        self.role == UserRole::Editor
    }

    pub fn is_journalist(&self) -> bool {
        self.role == UserRole::Journalist
    }

    /// Whether this user may edit or delete an item written by `journalist_id`.
    ///
    /// Editors may touch any item; journalists only their own.
    pub fn can_modify(&self, journalist_id: Option<i64>) -> bool {
        match self.role {
            UserRole::Editor => true,
            UserRole::Journalist => journalist_id == Some(self.id),
            UserRole::Reader => false,
        }
    }

    /// Whether a notification can be mailed to this user
    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }
}

/// User role.
///
/// - Reader: subscribes to publishers and journalists, sees approved content
/// - Editor: reviews, edits and approves content
/// - Journalist: writes articles and newsletters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Reader,
    Editor,
    Journalist,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Reader, UserRole::Editor, UserRole::Journalist];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Reader => "reader",
            UserRole::Editor => "editor",
            UserRole::Journalist => "journalist",
        }
    }

    /// Human readable label, as shown in the registration form
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Reader => "Reader",
            UserRole::Editor => "Editor",
            UserRole::Journalist => "Journalist",
        }
    }

    /// Name of the permission group for this role: "Readers", "Editors", "Journalists"
    pub fn group_name(&self) -> String {
        format!("{}s", self.label())
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not one of the known roles
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid role: {0}")]
pub struct InvalidRole(pub String);

impl FromStr for UserRole {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reader" => Ok(UserRole::Reader),
            "editor" => Ok(UserRole::Editor),
            "journalist" => Ok(UserRole::Journalist),
            _ => Err(InvalidRole(s.to_string())),
        }
    }
}
