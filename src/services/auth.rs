//! Staff authentication and account management
//!
//! - First-run setup of the initial admin
//! - Login with bearer session tokens, throttled per username and per IP
//! - Session validation, logout and expiry purge
//! - Admin-only account creation, listing and access changes

use crate::db::repositories::{AdminUserRepository, SessionRepository};
use crate::models::{
    AdminRole, AdminUser, CreateAdminUserInput, NewAuditLog, Session, UpdateAdminUserInput,
};
use crate::services::audit::AuditService;
use crate::services::password::{check_password_strength, hash_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wrong username/email or password; deliberately vague
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Too many login attempts, retry in {retry_after} seconds")]
    RateLimited { retry_after: i64 },

    #[error("Setup has already been completed")]
    AlreadySetUp,

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Login request body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Username or email
    pub login: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

pub struct AuthService {
    users: Arc<dyn AdminUserRepository>,
    sessions: Arc<dyn SessionRepository>,
    limiter: Arc<LoginRateLimiter>,
    audit: Arc<AuditService>,
    session_ttl_hours: i64,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn AdminUserRepository>,
        sessions: Arc<dyn SessionRepository>,
        limiter: Arc<LoginRateLimiter>,
        audit: Arc<AuditService>,
        session_ttl_hours: i64,
    ) -> Self {
        Self {
            users,
            sessions,
            limiter,
            audit,
            session_ttl_hours,
        }
    }

    /// Whether the first admin still has to be created
    pub async fn needs_setup(&self) -> Result<bool, AuthError> {
        let count = self.users.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Create the first admin account. Fails once any staff account exists.
    pub async fn setup(&self, input: CreateAdminUserInput) -> Result<AdminUser, AuthError> {
        if !self.needs_setup().await? {
            return Err(AuthError::AlreadySetUp);
        }

        let user = self
            .prepare_user(CreateAdminUserInput {
                role: Some(AdminRole::Admin),
                ..input
            })
            .await?;
        // Re-checked atomically with the insert
        let user = self
            .users
            .create_first(&user)
            .await
            .context("Failed to create initial admin")?
            .ok_or(AuthError::AlreadySetUp)?;

        tracing::info!(user_id = user.id, username = %user.username, "Initial admin created");
        self.audit
            .record(
                NewAuditLog::new("auth.setup", "admin_user")
                    .by(user.id)
                    .entity(user.id),
            )
            .await;
        Ok(user)
    }

    /// Check credentials and open a session
    pub async fn login(
        &self,
        input: LoginInput,
        ip: Option<IpAddr>,
    ) -> Result<(Session, AdminUser), AuthError> {
        let login = input.login.trim();
        if login.is_empty() || input.password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        if let Some(ip) = ip {
            if let Some(retry_after) = self.limiter.ip_retry_after(ip).await {
                tracing::warn!(%ip, "Login throttled by IP");
                return Err(AuthError::RateLimited { retry_after });
            }
            self.limiter.record_ip_request(ip).await;
        }
        if let Some(retry_after) = self.limiter.username_retry_after(login).await {
            tracing::warn!(login, "Login throttled by username");
            return Err(AuthError::RateLimited { retry_after });
        }

        let user = match self
            .users
            .get_by_login(login)
            .await
            .context("Failed to look up user")?
        {
            Some(user) => user,
            None => {
                self.limiter.record_failed_attempt(login).await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        let valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            self.limiter.record_failed_attempt(login).await;
            tracing::info!(user_id = user.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.limiter.clear_username_attempts(login).await;

        let now = Utc::now();
        let session = self
            .sessions
            .create(&Session {
                id: Uuid::new_v4().to_string(),
                admin_user_id: user.id,
                expires_at: now + Duration::hours(self.session_ttl_hours),
                created_at: now,
            })
            .await
            .context("Failed to create session")?;
        self.users
            .touch_last_login(user.id, now)
            .await
            .context("Failed to record login time")?;

        tracing::info!(user_id = user.id, username = %user.username, "Login succeeded");
        self.audit
            .record(
                NewAuditLog::new("auth.login", "admin_user")
                    .by(user.id)
                    .entity(user.id)
                    .ip(ip.map(|ip| ip.to_string())),
            )
            .await;

        Ok((session, user))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// User behind a live session, or `None` when the token is unknown,
    /// expired or belongs to a disabled account
    pub async fn validate_session(&self, token: &str) -> Result<Option<AdminUser>, AuthError> {
        let session = match self
            .sessions
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.sessions
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .users
            .get_by_id(session.admin_user_id)
            .await
            .context("Failed to get session user")?;

        Ok(user.filter(|u| u.is_active))
    }

    /// Remove expired sessions, returning how many were deleted
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let count = self
            .sessions
            .delete_expired()
            .await
            .context("Failed to purge expired sessions")?;
        Ok(count)
    }

    pub async fn create_user(
        &self,
        actor: &AdminUser,
        input: CreateAdminUserInput,
    ) -> Result<AdminUser, AuthError> {
        let user = self.insert_user(input).await?;

        self.audit
            .record(
                NewAuditLog::new("admin_user.create", "admin_user")
                    .by(actor.id)
                    .entity(user.id)
                    .details(json!({ "username": user.username, "role": user.role })),
            )
            .await;
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<AdminUser>, AuthError> {
        Ok(self.users.list().await.context("Failed to list users")?)
    }

    /// Change a user's role or active flag. Disabling an account ends its
    /// sessions. Admins cannot lock themselves out.
    pub async fn update_user(
        &self,
        actor: &AdminUser,
        id: i64,
        input: UpdateAdminUserInput,
    ) -> Result<AdminUser, AuthError> {
        let user = self
            .users
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(AuthError::UserNotFound)?;

        let role = input.role.unwrap_or(user.role);
        let is_active = input.is_active.unwrap_or(user.is_active);

        if actor.id == user.id && (!is_active || role != AdminRole::Admin) {
            return Err(AuthError::Forbidden(
                "You cannot deactivate or demote your own account".to_string(),
            ));
        }

        self.users
            .update_access(id, role, is_active)
            .await
            .context("Failed to update user")?;
        if !is_active {
            self.sessions
                .delete_by_user(id)
                .await
                .context("Failed to end sessions")?;
        }

        self.audit
            .record(
                NewAuditLog::new("admin_user.update", "admin_user")
                    .by(actor.id)
                    .entity(id)
                    .details(json!({
                        "role": { "from": user.role, "to": role },
                        "is_active": { "from": user.is_active, "to": is_active },
                    })),
            )
            .await;

        self.users
            .get_by_id(id)
            .await
            .context("Failed to reload user")?
            .ok_or(AuthError::UserNotFound)
    }

    async fn insert_user(&self, input: CreateAdminUserInput) -> Result<AdminUser, AuthError> {
        let user = self.prepare_user(input).await?;
        Ok(self.users.create(&user).await.context("Failed to create user")?)
    }

    /// Validate the input and hash the password; nothing is written
    async fn prepare_user(&self, input: CreateAdminUserInput) -> Result<AdminUser, AuthError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if username.is_empty() {
            return Err(AuthError::Validation("Username cannot be empty".to_string()));
        }
        if username.chars().count() > 50 {
            return Err(AuthError::Validation(
                "Username must be at most 50 characters".to_string(),
            ));
        }
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AuthError::Validation("Invalid email format".to_string()));
        }
        check_password_strength(&input.password).map_err(AuthError::Validation)?;

        if self
            .users
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(AuthError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        if self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(AuthError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password)?;
        let mut user = AdminUser::new(username, email, password_hash, input.role.unwrap_or_default());
        user.first_name = input.first_name.filter(|s| !s.trim().is_empty());
        user.last_name = input.last_name.filter(|s| !s.trim().is_empty());
        Ok(user)
    }
}
