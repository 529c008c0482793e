//! Admin user repository
//!
//! Database operations for newsroom staff accounts.
//!
//! This module provides:
//! - `AdminUserRepository` trait defining the interface for staff data access
//! - `SqlxAdminUserRepository` implementing the trait for SQLite and PostgreSQL

use crate::config::DatabaseDriver;
use crate::db::{DatabasePool, DynDatabasePool};
use crate::models::{AdminRole, AdminUser};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Admin user repository trait
#[async_trait]
pub trait AdminUserRepository: Send + Sync {
    /// Create a new staff account
    async fn create(&self, user: &AdminUser) -> Result<AdminUser>;

    /// Create the account only if the table is empty; `None` when staff already exist
    async fn create_first(&self, user: &AdminUser) -> Result<Option<AdminUser>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<AdminUser>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<AdminUser>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<AdminUser>>;

    /// Look up by username, falling back to email
    async fn get_by_login(&self, login: &str) -> Result<Option<AdminUser>>;

    /// Count all staff accounts
    async fn count(&self) -> Result<i64>;

    /// List all staff accounts, oldest first
    async fn list(&self) -> Result<Vec<AdminUser>>;

    /// Change role and active flag
    async fn update_access(&self, id: i64, role: AdminRole, is_active: bool) -> Result<bool>;

    /// Record a successful login
    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
}

/// SQLx-based admin user repository implementation
pub struct SqlxAdminUserRepository {
    pool: DynDatabasePool,
}

impl SqlxAdminUserRepository {
    /// Create a new SQLx admin user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AdminUserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<AdminUser>> {
        let sql = format!("{} WHERE {} = $1", SELECT_ADMIN_USER, clause);
        let row = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, AdminUserRow>(&sql)
                .bind(value)
                .fetch_optional(p)
                .await
        })
        .with_context(|| format!("Failed to get admin user by {}", clause))?;

        row.map(AdminUser::try_from).transpose()
    }
}

const SELECT_ADMIN_USER: &str = r#"
    SELECT id, username, email, password_hash, first_name, last_name, role,
           is_active, last_login_at, created_at, updated_at
    FROM admin_users
"#;

#[derive(sqlx::FromRow)]
struct AdminUserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role: String,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = anyhow::Error;

    fn try_from(row: AdminUserRow) -> Result<Self> {
        Ok(AdminUser {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role.parse()?,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl AdminUserRepository for SqlxAdminUserRepository {
    async fn create(&self, user: &AdminUser) -> Result<AdminUser> {
        let now = Utc::now();
        let (id,) = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, (i64,)>(
                r#"
                INSERT INTO admin_users
                    (username, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
                RETURNING id
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(now)
            .fetch_one(p)
            .await
        })
        .context("Failed to create admin user")?;

        Ok(AdminUser {
            id,
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn create_first(&self, user: &AdminUser) -> Result<Option<AdminUser>> {
        let now = Utc::now();
        // SQLite serializes writers; Postgres needs the table lock to stop two
        // transactions both seeing an empty table.
        let lock_table = self.pool.driver() == DatabaseDriver::Postgres;
        let inserted = on_backend!(self.pool, |p| {
            let mut tx = p.begin().await?;
            if lock_table {
                sqlx::query("LOCK TABLE admin_users IN SHARE ROW EXCLUSIVE MODE")
                    .execute(&mut *tx)
                    .await?;
            }

            let inserted = sqlx::query_as::<_, (i64,)>(
                r#"
                INSERT INTO admin_users
                    (username, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at)
                SELECT $1, $2, $3, $4, $5, $6, $7, $8, $8
                WHERE NOT EXISTS (SELECT 1 FROM admin_users)
                RETURNING id
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(inserted)
        })
        .context("Failed to create first admin user")?;

        Ok(inserted.map(|(id,)| AdminUser {
            id,
            created_at: now,
            updated_at: now,
            ..user.clone()
        }))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AdminUser>> {
        let sql = format!("{} WHERE id = $1", SELECT_ADMIN_USER);
        let row = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, AdminUserRow>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
        })
        .context("Failed to get admin user by ID")?;

        row.map(AdminUser::try_from).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        self.fetch_one_where("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<AdminUser>> {
        self.fetch_one_where("email", email).await
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<AdminUser>> {
        match self.get_by_username(login).await? {
            Some(user) => Ok(Some(user)),
            None => self.get_by_email(login).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        let (count,) = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM admin_users")
                .fetch_one(p)
                .await
        })
        .context("Failed to count admin users")?;

        Ok(count)
    }

    async fn list(&self) -> Result<Vec<AdminUser>> {
        let sql = format!("{} ORDER BY id ASC", SELECT_ADMIN_USER);
        let rows = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, AdminUserRow>(&sql).fetch_all(p).await
        })
        .context("Failed to list admin users")?;

        rows.into_iter().map(AdminUser::try_from).collect()
    }

    async fn update_access(&self, id: i64, role: AdminRole, is_active: bool) -> Result<bool> {
        let now = Utc::now();
        let result = on_backend!(self.pool, |p| {
            sqlx::query(
                "UPDATE admin_users SET role = $1, is_active = $2, updated_at = $3 WHERE id = $4",
            )
            .bind(role.as_str())
            .bind(is_active)
            .bind(now)
            .bind(id)
            .execute(p)
            .await
            .map(|r| r.rows_affected())
        })
        .context("Failed to update admin user access")?;

        Ok(result > 0)
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        on_backend!(self.pool, |p| {
            sqlx::query("UPDATE admin_users SET last_login_at = $1 WHERE id = $2")
                .bind(at)
                .bind(id)
                .execute(p)
                .await
                .map(|_| ())
        })
        .context("Failed to record last login")?;

        Ok(())
    }
}
