//! Version history service
//!
//! Lists, compares and restores the snapshots written on every content edit.

use crate::db::repositories::VersionRepository;
use crate::models::{
    AdminUser, Article, ArticleVersion, DiffKind, DiffLine, VersionComparison, VersionSummary,
};
use crate::services::article::{ArticleFields, ArticleService, ArticleServiceError};
use anyhow::Context;
use similar::{Algorithm, DiffOp};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("Version not found: {0}")]
    NotFound(String),

    /// Article lookup or edit rule failure
    #[error(transparent)]
    Article(#[from] ArticleServiceError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct VersionService {
    versions: Arc<dyn VersionRepository>,
    articles: Arc<ArticleService>,
}

impl VersionService {
    pub fn new(versions: Arc<dyn VersionRepository>, articles: Arc<ArticleService>) -> Self {
        Self { versions, articles }
    }

    /// Versions of an article, newest first
    pub async fn list(&self, article_id: i64) -> Result<Vec<VersionSummary>, VersionError> {
        let article = self.articles.get(article_id).await?;
        let mut versions = self.versions.list(article_id).await?;
        for version in &mut versions {
            version.is_current = version.version_number == article.current_version;
        }
        Ok(versions)
    }

    pub async fn get(
        &self,
        article_id: i64,
        version_number: i64,
    ) -> Result<ArticleVersion, VersionError> {
        self.versions
            .get(article_id, version_number)
            .await
            .context("Failed to get article version")?
            .ok_or_else(|| {
                VersionError::NotFound(format!("article {} version {}", article_id, version_number))
            })
    }

    pub async fn compare(
        &self,
        article_id: i64,
        from: i64,
        to: i64,
    ) -> Result<VersionComparison, VersionError> {
        let older = self.get(article_id, from).await?;
        let newer = self.get(article_id, to).await?;

        let (old_content, new_content) = (older.content, newer.content);
        let diff = tokio::task::spawn_blocking(move || diff_lines(&old_content, &new_content))
            .await
            .context("Diff task failed")?;
        let lines_added = diff.iter().filter(|l| l.kind == DiffKind::Added).count();
        let lines_removed = diff.iter().filter(|l| l.kind == DiffKind::Removed).count();

        Ok(VersionComparison {
            article_id,
            from_version: from,
            to_version: to,
            title_changed: older.title != newer.title,
            excerpt_changed: older.excerpt != newer.excerpt,
            from_title: older.title,
            to_title: newer.title,
            lines_added,
            lines_removed,
            diff,
        })
    }

    /// Copy a snapshot back onto the article as a new version.
    ///
    /// Follows the same rules as a content edit; restoring the text the
    /// article already has is a no-op.
    pub async fn restore(
        &self,
        article_id: i64,
        version_number: i64,
        actor: &AdminUser,
        ip: Option<String>,
    ) -> Result<Article, VersionError> {
        let article = self.articles.get(article_id).await?;
        let version = self.get(article_id, version_number).await?;

        let fields = ArticleFields {
            title: version.title,
            excerpt: version.excerpt,
            content: version.content,
            ..ArticleFields::of(&article)
        };

        let restored = self
            .articles
            .write_edit(
                &article,
                actor,
                fields,
                Some(format!("Restored from version {}", version_number)),
                "article.restore",
                ip,
            )
            .await?;

        tracing::info!(
            article_id,
            restored_from = version_number,
            version = restored.current_version,
            "Article version restored"
        );
        Ok(restored)
    }
}

/// Time allowed for an exact diff before falling back to a coarser one
const DIFF_DEADLINE: Duration = Duration::from_secs(2);

/// Line diff of two texts.
///
/// Myers' algorithm in linear space. Past [`DIFF_DEADLINE`] the result is
/// still a valid edit script but may not be minimal.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();
    let deadline = Instant::now() + DIFF_DEADLINE;
    let ops = similar::capture_diff_slices_deadline(Algorithm::Myers, &a, &b, Some(deadline));

    let mut diff = Vec::with_capacity(a.len().max(b.len()));
    let removed = |diff: &mut Vec<DiffLine>, start: usize, len: usize| {
        diff.extend((start..start + len).map(|i| DiffLine {
            kind: DiffKind::Removed,
            text: a[i].to_string(),
            old_line: Some(i + 1),
            new_line: None,
        }));
    };
    let added = |diff: &mut Vec<DiffLine>, start: usize, len: usize| {
        diff.extend((start..start + len).map(|j| DiffLine {
            kind: DiffKind::Added,
            text: b[j].to_string(),
            old_line: None,
            new_line: Some(j + 1),
        }));
    };

    for op in ops {
        match op {
            DiffOp::Equal {
                old_index,
                new_index,
                len,
            } => {
                diff.extend((0..len).map(|k| DiffLine {
                    kind: DiffKind::Unchanged,
                    text: a[old_index + k].to_string(),
                    old_line: Some(old_index + k + 1),
                    new_line: Some(new_index + k + 1),
                }));
            }
            DiffOp::Delete {
                old_index, old_len, ..
            } => removed(&mut diff, old_index, old_len),
            DiffOp::Insert {
                new_index, new_len, ..
            } => added(&mut diff, new_index, new_len),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                removed(&mut diff, old_index, old_len);
                added(&mut diff, new_index, new_len);
            }
        }
    }
    diff
}
