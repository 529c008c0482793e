//! Audit log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recorded staff action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub admin_user_id: Option<i64>,
    pub admin_username: Option<String>,
    /// Dotted action name, e.g. `article.publish`
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Entry about to be recorded
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub admin_user_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
}

impl NewAuditLog {
    pub fn new(action: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            admin_user_id: None,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: None,
            details: None,
            ip_address: None,
        }
    }

    pub fn by(mut self, admin_user_id: i64) -> Self {
        self.admin_user_id = Some(admin_user_id);
        self
    }

    pub fn entity(mut self, entity_id: i64) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }
}

/// Filters for the audit log listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLogQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub admin_user_id: Option<i64>,
    /// Matches actions starting with this text, e.g. `article.`
    pub action_prefix: Option<String>,
}
