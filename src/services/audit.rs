//! Audit trail service

use crate::db::repositories::AuditLogRepository;
use crate::models::{AuditLog, AuditLogQuery, ListParams, NewAuditLog, PagedResult};
use anyhow::Result;
use std::sync::Arc;

pub struct AuditService {
    repo: Arc<dyn AuditLogRepository>,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditLogRepository>) -> Self {
        Self { repo }
    }

    /// Record an entry. Storage failures are logged and swallowed so the
    /// action being audited still succeeds.
    pub async fn record(&self, entry: NewAuditLog) {
        if let Err(e) = self.repo.insert(&entry).await {
            tracing::error!(
                action = %entry.action,
                entity_type = %entry.entity_type,
                entity_id = ?entry.entity_id,
                error = %e,
                "Failed to write audit log"
            );
        }
    }

    pub async fn list(
        &self,
        query: &AuditLogQuery,
        params: &ListParams,
    ) -> Result<PagedResult<AuditLog>> {
        let (items, total) = self.repo.list(query, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Entries about one entity, newest first
    pub async fn for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<AuditLog>> {
        let query = AuditLogQuery {
            entity_type: Some(entity_type.to_string()),
            entity_id: Some(entity_id),
            ..Default::default()
        };
        self.list(&query, params).await
    }
}
