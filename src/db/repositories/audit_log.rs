//! Audit log repository

use crate::db::{Conditions, DatabasePool, DynDatabasePool, SqlParam};
use crate::models::{AuditLog, AuditLogQuery, ListParams, NewAuditLog};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn insert(&self, entry: &NewAuditLog) -> Result<i64>;

    /// Matching entries newest first, with the total match count
    async fn list(&self, query: &AuditLogQuery, params: &ListParams)
        -> Result<(Vec<AuditLog>, i64)>;
}

pub struct SqlxAuditLogRepository {
    pool: DynDatabasePool,
}

impl SqlxAuditLogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuditLogRepository> {
        Arc::new(Self::new(pool))
    }
}

#[derive(sqlx::FromRow)]
struct AuditLogRow {
    id: i64,
    admin_user_id: Option<i64>,
    admin_username: Option<String>,
    action: String,
    entity_type: String,
    entity_id: Option<i64>,
    details: Option<String>,
    ip_address: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLog {
    fn from(row: AuditLogRow) -> Self {
        // Details are written by us as JSON; anything unreadable is dropped
        let details = row
            .details
            .and_then(|raw| serde_json::from_str(&raw).ok());

        AuditLog {
            id: row.id,
            admin_user_id: row.admin_user_id,
            admin_username: row.admin_username,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            details,
            ip_address: row.ip_address,
            created_at: row.created_at,
        }
    }
}

fn build_conditions(query: &AuditLogQuery) -> Conditions {
    let mut conditions = Conditions::new();
    if let Some(entity_type) = &query.entity_type {
        conditions.push("l.entity_type = {}", SqlParam::Text(entity_type.clone()));
    }
    if let Some(entity_id) = query.entity_id {
        conditions.push("l.entity_id = {}", SqlParam::Int(entity_id));
    }
    if let Some(admin_user_id) = query.admin_user_id {
        conditions.push("l.admin_user_id = {}", SqlParam::Int(admin_user_id));
    }
    if let Some(prefix) = query.action_prefix.as_deref().filter(|p| !p.is_empty()) {
        conditions.push("l.action LIKE {}", SqlParam::Text(format!("{}%", prefix)));
    }
    conditions
}

#[async_trait]
impl AuditLogRepository for SqlxAuditLogRepository {
    async fn insert(&self, entry: &NewAuditLog) -> Result<i64> {
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize audit details")?;
        let now = Utc::now();

        let (id,) = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, (i64,)>(
                r#"
                INSERT INTO audit_logs
                    (admin_user_id, action, entity_type, entity_id, details, ip_address, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(entry.admin_user_id)
            .bind(&entry.action)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(details.as_deref())
            .bind(entry.ip_address.as_deref())
            .bind(now)
            .fetch_one(p)
            .await
        })
        .context("Failed to insert audit log")?;

        Ok(id)
    }

    async fn list(
        &self,
        query: &AuditLogQuery,
        params: &ListParams,
    ) -> Result<(Vec<AuditLog>, i64)> {
        let conditions = build_conditions(query);
        let where_sql = conditions.where_sql();

        let count_sql = format!("SELECT COUNT(*) FROM audit_logs l {}", where_sql);
        let list_sql = format!(
            r#"
            SELECT l.id, l.admin_user_id, u.username AS admin_username, l.action,
                   l.entity_type, l.entity_id, l.details, l.ip_address, l.created_at
            FROM audit_logs l
            LEFT JOIN admin_users u ON u.id = l.admin_user_id
            {}
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT ${} OFFSET ${}
            "#,
            where_sql,
            conditions.next_index(),
            conditions.next_index() + 1
        );
        let limit = params.limit();
        let offset = params.offset();

        let (rows, total) = on_backend!(self.pool, |p| {
            let (total,) = bind_params!(sqlx::query_as::<_, (i64,)>(&count_sql), conditions.params())
                .fetch_one(p)
                .await?;
            let rows = bind_params!(sqlx::query_as::<_, AuditLogRow>(&list_sql), conditions.params())
                .bind(limit)
                .bind(offset)
                .fetch_all(p)
                .await?;
            Ok::<_, sqlx::Error>((rows, total))
        })
        .context("Failed to list audit logs")?;

        Ok((rows.into_iter().map(AuditLog::from).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{AdminUserRepository, SqlxAdminUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{AdminRole, AdminUser};
    use serde_json::json;

    async fn setup() -> (SqlxAuditLogRepository, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user = SqlxAdminUserRepository::new(pool.clone())
            .create(&AdminUser::new(
                "directora".to_string(),
                "directora@safrareport.com".to_string(),
                "hash".to_string(),
                AdminRole::Admin,
            ))
            .await
            .unwrap();
        (SqlxAuditLogRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_insert_and_list_with_username() {
        let (repo, user_id) = setup().await;

        repo.insert(
            &NewAuditLog::new("article.publish", "article")
                .by(user_id)
                .entity(3)
                .details(json!({"from": "approved", "to": "published"}))
                .ip(Some("10.0.0.1".to_string())),
        )
        .await
        .unwrap();

        let (logs, total) = repo
            .list(&AuditLogQuery::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(logs[0].admin_username.as_deref(), Some("directora"));
        assert_eq!(logs[0].details.as_ref().unwrap()["to"], "published");
        assert_eq!(logs[0].ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_filters() {
        let (repo, user_id) = setup().await;
        repo.insert(&NewAuditLog::new("article.create", "article").by(user_id).entity(1))
            .await
            .unwrap();
        repo.insert(&NewAuditLog::new("article.submit", "article").by(user_id).entity(1))
            .await
            .unwrap();
        repo.insert(&NewAuditLog::new("article.create", "article").by(user_id).entity(2))
            .await
            .unwrap();
        repo.insert(&NewAuditLog::new("auth.login", "admin_user").by(user_id))
            .await
            .unwrap();

        let by_entity = AuditLogQuery {
            entity_type: Some("article".to_string()),
            entity_id: Some(1),
            ..Default::default()
        };
        let (logs, total) = repo.list(&by_entity, &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(logs[0].action, "article.submit");

        let by_prefix = AuditLogQuery {
            action_prefix: Some("auth.".to_string()),
            ..Default::default()
        };
        let (logs, _) = repo.list(&by_prefix, &ListParams::default()).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].entity_id.is_none());
    }

    #[tokio::test]
    async fn test_pagination() {
        let (repo, user_id) = setup().await;
        for id in 1..=5 {
            repo.insert(&NewAuditLog::new("article.create", "article").by(user_id).entity(id))
                .await
                .unwrap();
        }

        let (page, total) = repo
            .list(&AuditLogQuery::default(), &ListParams::new(2, 2))
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].entity_id, Some(3));
    }
}
