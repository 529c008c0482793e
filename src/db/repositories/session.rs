//! Session repository
//!
//! Database operations for bearer sessions.

use crate::db::{DatabasePool, DynDatabasePool};
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a staff member
    async fn delete_by_user(&self, admin_user_id: i64) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        on_backend!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO sessions (id, admin_user_id, expires_at, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&session.id)
            .bind(session.admin_user_id)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(p)
            .await
            .map(|_| ())
        })
        .context("Failed to create session")?;

        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let session = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, Session>(
                r#"
                SELECT id, admin_user_id, expires_at, created_at
                FROM sessions
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(p)
            .await
        })
        .context("Failed to get session by ID")?;

        Ok(session)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        on_backend!(self.pool, |p| {
            sqlx::query("DELETE FROM sessions WHERE id = $1")
                .bind(id)
                .execute(p)
                .await
                .map(|_| ())
        })
        .context("Failed to delete session")?;

        Ok(())
    }

    async fn delete_by_user(&self, admin_user_id: i64) -> Result<()> {
        on_backend!(self.pool, |p| {
            sqlx::query("DELETE FROM sessions WHERE admin_user_id = $1")
                .bind(admin_user_id)
                .execute(p)
                .await
                .map(|_| ())
        })
        .context("Failed to delete sessions by user")?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let deleted = on_backend!(self.pool, |p| {
            sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
                .bind(now)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })
        .context("Failed to delete expired sessions")?;

        Ok(deleted)
    }
}
