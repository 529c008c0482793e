//! Editorial comment service
//!
//! Newsroom discussion on an article. Threads are one level deep: replying
//! to a reply attaches the new comment to the thread's root.

use crate::db::repositories::{ArticleRepository, EditorialCommentRepository, VersionRepository};
use crate::models::{
    build_threads, AdminUser, CommentKind, CommentThread, CreateEditorialCommentInput,
    EditorialComment, NewAuditLog, NewEditorialComment,
};
use crate::services::audit::AuditService;
use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Longest comment body accepted
pub const MAX_COMMENT_LENGTH: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct EditorialCommentService {
    comments: Arc<dyn EditorialCommentRepository>,
    articles: Arc<dyn ArticleRepository>,
    versions: Arc<dyn VersionRepository>,
    audit: Arc<AuditService>,
}

impl EditorialCommentService {
    pub fn new(
        comments: Arc<dyn EditorialCommentRepository>,
        articles: Arc<dyn ArticleRepository>,
        versions: Arc<dyn VersionRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            comments,
            articles,
            versions,
            audit,
        }
    }

    /// Add a comment, anchored to the article's current version unless the
    /// input names one
    pub async fn add(
        &self,
        article_id: i64,
        author: &AdminUser,
        input: CreateEditorialCommentInput,
        ip: Option<String>,
    ) -> Result<EditorialComment, CommentError> {
        let body = input.body.trim().to_string();
        if body.is_empty() {
            return Err(CommentError::Validation("Comment cannot be empty".to_string()));
        }
        if body.chars().count() > MAX_COMMENT_LENGTH {
            return Err(CommentError::Validation(format!(
                "Comment must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        let article = self
            .articles
            .get_by_id(article_id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| CommentError::NotFound(format!("article {}", article_id)))?;

        let parent_id = match input.parent_id {
            Some(parent_id) => {
                let parent = self.get(parent_id).await?;
                if parent.article_id != article_id {
                    return Err(CommentError::Validation(
                        "Parent comment belongs to another article".to_string(),
                    ));
                }
                Some(parent.parent_id.unwrap_or(parent.id))
            }
            None => None,
        };

        let version_number = match input.version_number {
            Some(n) => {
                let exists = self
                    .versions
                    .exists(article_id, n)
                    .await
                    .context("Failed to check article version")?;
                if !exists {
                    return Err(CommentError::Validation(format!(
                        "Article has no version {}",
                        n
                    )));
                }
                n
            }
            None => article.current_version,
        };

        let comment = self
            .comments
            .create(&NewEditorialComment {
                article_id,
                parent_id,
                author_id: author.id,
                version_number: Some(version_number),
                kind: CommentKind::General,
                body,
            })
            .await?;

        self.audit
            .record(
                NewAuditLog::new("comment.create", "editorial_comment")
                    .by(author.id)
                    .entity(comment.id)
                    .details(json!({ "article_id": article_id, "parent_id": parent_id }))
                    .ip(ip),
            )
            .await;

        Ok(comment)
    }

    pub async fn get(&self, id: i64) -> Result<EditorialComment, CommentError> {
        self.comments
            .get_by_id(id)
            .await
            .context("Failed to get editorial comment")?
            .ok_or_else(|| CommentError::NotFound(format!("comment {}", id)))
    }

    /// Threads on an article, oldest first
    pub async fn list(
        &self,
        article_id: i64,
        include_resolved: bool,
    ) -> Result<Vec<CommentThread>, CommentError> {
        if self
            .articles
            .get_by_id(article_id)
            .await
            .context("Failed to get article")?
            .is_none()
        {
            return Err(CommentError::NotFound(format!("article {}", article_id)));
        }

        let threads = build_threads(self.comments.list_by_article(article_id).await?);
        Ok(threads
            .into_iter()
            .filter(|t| include_resolved || !t.comment.is_resolved)
            .collect())
    }

    pub async fn resolve(
        &self,
        id: i64,
        actor: &AdminUser,
        ip: Option<String>,
    ) -> Result<EditorialComment, CommentError> {
        self.set_resolved(id, actor, true, ip).await
    }

    pub async fn reopen(
        &self,
        id: i64,
        actor: &AdminUser,
        ip: Option<String>,
    ) -> Result<EditorialComment, CommentError> {
        self.set_resolved(id, actor, false, ip).await
    }

    /// Delete a comment with its replies. Author or admin only.
    pub async fn delete(
        &self,
        id: i64,
        actor: &AdminUser,
        ip: Option<String>,
    ) -> Result<(), CommentError> {
        let comment = self.get(id).await?;
        if comment.author_id != actor.id && !actor.is_admin() {
            return Err(CommentError::Forbidden(
                "Only the comment author or an admin can delete it".to_string(),
            ));
        }

        if !self.comments.delete(id).await? {
            return Err(CommentError::NotFound(format!("comment {}", id)));
        }

        self.audit
            .record(
                NewAuditLog::new("comment.delete", "editorial_comment")
                    .by(actor.id)
                    .entity(id)
                    .details(json!({ "article_id": comment.article_id }))
                    .ip(ip),
            )
            .await;
        Ok(())
    }

    pub async fn unresolved_count(&self, article_id: i64) -> Result<i64, CommentError> {
        Ok(self.comments.count_unresolved(article_id).await?)
    }

    async fn set_resolved(
        &self,
        id: i64,
        actor: &AdminUser,
        resolved: bool,
        ip: Option<String>,
    ) -> Result<EditorialComment, CommentError> {
        let comment = self.get(id).await?;
        if comment.parent_id.is_some() {
            return Err(CommentError::Validation(
                "Only top-level comments can be resolved".to_string(),
            ));
        }
        if comment.author_id != actor.id && !actor.is_editor() {
            return Err(CommentError::Forbidden(
                "Only the comment author or an editor can change its status".to_string(),
            ));
        }
        if comment.is_resolved == resolved {
            return Ok(comment);
        }

        let resolved_by = resolved.then_some(actor.id);
        if !self.comments.set_resolved(id, resolved_by, Utc::now()).await? {
            return Err(CommentError::NotFound(format!("comment {}", id)));
        }

        let action = if resolved { "comment.resolve" } else { "comment.reopen" };
        self.audit
            .record(
                NewAuditLog::new(action, "editorial_comment")
                    .by(actor.id)
                    .entity(id)
                    .details(json!({ "article_id": comment.article_id }))
                    .ip(ip),
            )
            .await;

        self.get(id).await
    }
}
