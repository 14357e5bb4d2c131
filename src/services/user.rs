//! User service
//!
//! Registration, credential checks, sessions and role changes. Every path
//! that persists a user goes through [`UserService::save`], which keeps two
//! rules true: the user sits in exactly the group of its role, and only
//! readers hold subscriptions.

use crate::db::repositories::{SessionRepository, SubscriptionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use crate::services::permission::PermissionService;
use crate::services::FieldErrors;
use anyhow::Context;
use chrono::{Duration, Utc};
use regex::Regex;
use once_cell::sync::Lazy;
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("valid username regex"));

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// Username already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    permissions: Arc<PermissionService>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        permissions: Arc<PermissionService>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            subscription_repo,
            permissions,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Override the session lifetime
    pub fn with_session_expiration(mut self, days: i64) -> Self {
        self.session_expiration_days = days.max(1);
        self
    }

    /// Register a new user.
    ///
    /// The role defaults to reader. The new account is placed in its role
    /// group before this returns.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for malformed username, email or password fields
    /// - `UserExists` if the username is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let errors = validate_register_input(&input);
        if !errors.is_empty() {
            return Err(UserServiceError::ValidationError(errors));
        }

        let username = input.username.trim().to_string();
        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(username));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(
            username,
            input.email.trim().to_string(),
            password_hash,
            input.role.unwrap_or_default(),
        );
        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        self.permissions.assign_role(&created).await?;

        tracing::info!("Registered {} as {}", created.username, created.role);
        Ok(created)
    }

    /// Check a username/password pair without opening a session.
    ///
    /// Used for HTTP Basic credentials as well as by [`UserService::login`].
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to get user by username")?
            .ok_or_else(|| UserServiceError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        let valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        Ok(user)
    }

    /// Verify credentials and open a session
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let user = self.authenticate(&input.username, &input.password).await?;
        let session = self.create_session(user.id).await?;
        tracing::debug!("User {} logged in", user.username);
        Ok((user, session))
    }

    /// Invalidate a session. Unknown ids are not an error.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are deleted and yield `None`.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?;
        Ok(user)
    }

    /// All journalists, for subscription choices
    pub async fn list_journalists(&self) -> Result<Vec<User>, UserServiceError> {
        let users = self
            .user_repo
            .list_by_role(UserRole::Journalist)
            .await
            .context("Failed to list journalists")?;
        Ok(users)
    }

    /// Persist changes to an existing user.
    ///
    /// Non-readers lose any subscriptions and the group membership is
    /// re-derived from the role.
    pub async fn save(&self, user: &User) -> Result<User, UserServiceError> {
        let updated = self
            .user_repo
            .update(user)
            .await
            .context("Failed to update user")?;

        if !updated.is_reader() {
            self.subscription_repo
                .clear(updated.id)
                .await
                .context("Failed to clear subscriptions")?;
        }
        self.permissions.assign_role(&updated).await?;

        Ok(updated)
    }

    /// Change a user's role and save
    pub async fn change_role(&self, user_id: i64, role: UserRole) -> Result<User, UserServiceError> {
        let mut user = self.get_by_id(user_id).await?.ok_or(UserServiceError::NotFound)?;
        if user.role != role {
            tracing::info!("Changing role of {} from {} to {}", user.username, user.role, role);
        }
        user.role = role;
        self.save(&user).await
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }
}

fn validate_register_input(input: &RegisterInput) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let username = input.username.trim();
    if username.is_empty() {
        errors.add("username", "This field is required.");
    } else if !USERNAME_PATTERN.is_match(username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    let email = input.email.trim();
    if !email.is_empty() && !EMAIL_PATTERN.is_match(email) {
        errors.add("email", "Enter a valid email address.");
    }

    if input.password.is_empty() {
        errors.add("password1", "This field is required.");
    }
    if let Some(confirm) = &input.password_confirm {
        if confirm.is_empty() {
            errors.add("password2", "This field is required.");
        } else if *confirm != input.password {
            errors.add("password2", "The two password fields didn't match.");
        }
    }

    errors
}

/// Input for user registration
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub username: String,
    /// Optional, may be empty
    pub email: String,
    pub password: String,
    /// Checked against `password` when present
    pub password_confirm: Option<String>,
    /// Defaults to reader
    pub role: Option<UserRole>,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            password_confirm: None,
            role: Some(role),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}
