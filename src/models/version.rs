//! Article version model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of an article's text at one point in its history
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArticleVersion {
    pub id: i64,
    pub article_id: i64,
    /// 1 for the initial draft, +1 per content change
    pub version_number: i64,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub change_summary: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Version listing entry, without the content body
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VersionSummary {
    pub version_number: i64,
    pub title: String,
    pub change_summary: Option<String>,
    pub created_by: Option<i64>,
    pub created_by_username: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub is_current: bool,
}

/// Data for a version about to be written
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub change_summary: Option<String>,
    pub created_by: i64,
    /// Oldest versions beyond this count are pruned
    pub retain: i64,
}

/// How a line fares between two versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Unchanged,
    Added,
    Removed,
}

/// One line of a content diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffKind,
    pub text: String,
    /// 1-based line number in the older version
    pub old_line: Option<usize>,
    /// 1-based line number in the newer version
    pub new_line: Option<usize>,
}

/// Result of comparing two versions of an article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionComparison {
    pub article_id: i64,
    pub from_version: i64,
    pub to_version: i64,
    pub from_title: String,
    pub to_title: String,
    pub title_changed: bool,
    pub excerpt_changed: bool,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub diff: Vec<DiffLine>,
}
