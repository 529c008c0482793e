//! Newsroom sections and Dominican provinces

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Newsroom section (Nacionales, Deportes, ...)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Province of the Dominican Republic, or the Distrito Nacional
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Province {
    pub id: i64,
    pub name: String,
    pub slug: String,
}
