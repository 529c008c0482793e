//! Editorial workflow engine
//!
//! Moves articles through the review lifecycle:
//!
//! ```text
//! draft ──submit──▶ pending_review ──approve──▶ approved ──publish──▶ published
//!   ▲                 │    │    │                                      │
//!   └────withdraw─────┘    │    └─request_changes─▶ needs_changes      │
//!   ▲                      └─reject─▶ rejected ──reopen──▶ draft       │
//!   └──────────────────────────────unpublish───────────────────────────┘
//! ```
//!
//! Every transition is a compare-and-swap on the stored status, writes an
//! audit entry and clears the public article cache.

use crate::cache::{self, Cache, CacheLayer};
use crate::config::EditorialConfig;
use crate::db::repositories::{ArticleRepository, EditorialCommentRepository, StatusChange};
use crate::models::{
    AdminUser, Article, ArticleStatus, AuditLog, ListParams, NewAuditLog, PagedResult,
    ReviewAction, StatusCount,
};
use crate::services::audit::AuditService;
use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Article not found: {0}")]
    NotFound(i64),

    #[error("Cannot {action} an article in status {from}")]
    InvalidTransition {
        from: ArticleStatus,
        action: ReviewAction,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Notes are required to {0}")]
    NotesRequired(ReviewAction),

    #[error("Article has {0} unresolved editorial comment(s)")]
    OpenComments(i64),

    /// The status changed under us
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// The workflow-relevant subset of [`EditorialConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorialPolicy {
    pub allow_self_review: bool,
    pub require_approval_before_publish: bool,
    pub block_publish_with_open_comments: bool,
}

impl From<&EditorialConfig> for EditorialPolicy {
    fn from(config: &EditorialConfig) -> Self {
        Self {
            allow_self_review: config.allow_self_review,
            require_approval_before_publish: config.require_approval_before_publish,
            block_publish_with_open_comments: config.block_publish_with_open_comments,
        }
    }
}

impl Default for EditorialPolicy {
    fn default() -> Self {
        Self::from(&EditorialConfig::default())
    }
}

/// Status `action` leads to from `from`, or `None` if it is not allowed
pub fn target_status(
    action: ReviewAction,
    from: ArticleStatus,
    policy: &EditorialPolicy,
) -> Option<ArticleStatus> {
    use ArticleStatus::*;

    match (action, from) {
        (ReviewAction::Submit, Draft | NeedsChanges) => Some(PendingReview),
        (ReviewAction::Withdraw, PendingReview) => Some(Draft),
        (ReviewAction::Approve, PendingReview) => Some(Approved),
        (ReviewAction::RequestChanges, PendingReview) => Some(NeedsChanges),
        (ReviewAction::Reject, PendingReview) => Some(Rejected),
        (ReviewAction::Publish, Approved) => Some(Published),
        (ReviewAction::Publish, Draft | NeedsChanges)
            if !policy.require_approval_before_publish =>
        {
            Some(Published)
        }
        (ReviewAction::Unpublish, Published) => Some(Draft),
        (ReviewAction::Reopen, Rejected) => Some(Draft),
        _ => None,
    }
}

/// Role checks for `actor` taking `action` on `article`
fn check_permission(
    article: &Article,
    actor: &AdminUser,
    action: ReviewAction,
    policy: &EditorialPolicy,
) -> Result<(), WorkflowError> {
    if action.requires_editor() {
        if !actor.is_editor() {
            return Err(WorkflowError::Forbidden(format!(
                "Only editors can {} articles",
                action
            )));
        }
    } else if !actor.can_edit(article.author_id) {
        return Err(WorkflowError::Forbidden(format!(
            "Only the author or an editor can {} this article",
            action
        )));
    }

    if action.is_review_decision()
        && article.author_id == actor.id
        && !actor.is_admin()
        && !policy.allow_self_review
    {
        return Err(WorkflowError::Forbidden(
            "Editors cannot review their own articles".to_string(),
        ));
    }

    Ok(())
}

pub struct WorkflowService {
    articles: Arc<dyn ArticleRepository>,
    comments: Arc<dyn EditorialCommentRepository>,
    audit: Arc<AuditService>,
    cache: Cache,
    policy: EditorialPolicy,
}

impl WorkflowService {
    pub fn new(
        articles: Arc<dyn ArticleRepository>,
        comments: Arc<dyn EditorialCommentRepository>,
        audit: Arc<AuditService>,
        cache: Cache,
        policy: EditorialPolicy,
    ) -> Self {
        Self {
            articles,
            comments,
            audit,
            cache,
            policy,
        }
    }

    pub fn policy(&self) -> &EditorialPolicy {
        &self.policy
    }

    /// Apply `action` to an article on behalf of `actor`
    pub async fn apply(
        &self,
        article_id: i64,
        actor: &AdminUser,
        action: ReviewAction,
        notes: Option<String>,
        ip: Option<String>,
    ) -> Result<Article, WorkflowError> {
        let article = self.get_article(article_id).await?;
        let from = article.status;

        let to = target_status(action, from, &self.policy)
            .ok_or(WorkflowError::InvalidTransition { from, action })?;
        check_permission(&article, actor, action, &self.policy)?;

        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if action.requires_notes() && notes.is_none() {
            return Err(WorkflowError::NotesRequired(action));
        }

        if action == ReviewAction::Publish && self.policy.block_publish_with_open_comments {
            let open = self
                .comments
                .count_unresolved(article_id)
                .await
                .context("Failed to count unresolved comments")?;
            if open > 0 {
                return Err(WorkflowError::OpenComments(open));
            }
        }

        let change = StatusChange {
            from,
            to,
            actor_id: actor.id,
            at: Utc::now(),
            notes: if action.is_review_decision() {
                notes.clone()
            } else {
                None
            },
            mark_submitted: action == ReviewAction::Submit,
            mark_reviewed: action.is_review_decision(),
            mark_published: action == ReviewAction::Publish,
        };

        let updated = self
            .articles
            .transition(article_id, &change)
            .await?
            .ok_or_else(|| {
                WorkflowError::Conflict(format!(
                    "Article {} is no longer {}; reload and try again",
                    article_id, from
                ))
            })?;

        tracing::info!(
            article_id,
            actor_id = actor.id,
            action = %action,
            from = %from,
            to = %to,
            "Article status changed"
        );

        self.audit
            .record(
                NewAuditLog::new(action.audit_action(), "article")
                    .by(actor.id)
                    .entity(article_id)
                    .details(json!({ "from": from, "to": to, "notes": notes }))
                    .ip(ip),
            )
            .await;

        if let Err(e) = self.cache.delete_pattern(cache::ARTICLES_PATTERN).await {
            tracing::warn!(error = %e, "Failed to invalidate article cache");
        }

        Ok(updated)
    }

    /// Actions `actor` could take on `article` right now.
    ///
    /// The open-comments gate is not considered; it is checked on publish.
    pub fn allowed_actions(&self, article: &Article, actor: &AdminUser) -> Vec<ReviewAction> {
        ReviewAction::ALL
            .into_iter()
            .filter(|&action| target_status(action, article.status, &self.policy).is_some())
            .filter(|&action| check_permission(article, actor, action, &self.policy).is_ok())
            .collect()
    }

    /// Articles waiting in `status`, oldest submission first
    pub async fn review_queue(
        &self,
        status: Option<ArticleStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, WorkflowError> {
        let status = status.unwrap_or(ArticleStatus::PendingReview);
        let (items, total) = self.articles.review_queue(status, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// One entry per status, zero when no article is in it
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>, WorkflowError> {
        let stored = self.articles.count_by_status().await?;
        Ok(ArticleStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: stored
                    .iter()
                    .find(|(s, _)| *s == status)
                    .map(|(_, count)| *count)
                    .unwrap_or(0),
            })
            .collect())
    }

    /// Audit entries for one article, newest first
    pub async fn review_history(
        &self,
        article_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<AuditLog>, WorkflowError> {
        self.get_article(article_id).await?;
        Ok(self.audit.for_entity("article", article_id, params).await?)
    }

    async fn get_article(&self, id: i64) -> Result<Article, WorkflowError> {
        self.articles
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or(WorkflowError::NotFound(id))
    }
}
