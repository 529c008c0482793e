//! Editorial comment repository

use crate::db::{DatabasePool, DynDatabasePool};
use crate::models::{EditorialComment, NewEditorialComment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait EditorialCommentRepository: Send + Sync {
    async fn create(&self, comment: &NewEditorialComment) -> Result<EditorialComment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<EditorialComment>>;

    /// Every comment on the article, oldest first
    async fn list_by_article(&self, article_id: i64) -> Result<Vec<EditorialComment>>;

    /// Mark resolved (`resolved_by` set) or reopen (`None`)
    async fn set_resolved(
        &self,
        id: i64,
        resolved_by: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Delete a comment and its replies
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Unresolved root comments on the article
    async fn count_unresolved(&self, article_id: i64) -> Result<i64>;
}

pub struct SqlxEditorialCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxEditorialCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EditorialCommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_COMMENT: &str = r#"
    SELECT c.id, c.article_id, c.parent_id, c.author_id, u.username AS author_username,
           c.version_number, c.kind, c.body, c.is_resolved, c.resolved_by, c.resolved_at,
           c.created_at, c.updated_at
    FROM editorial_comments c
    INNER JOIN admin_users u ON u.id = c.author_id
"#;

#[derive(sqlx::FromRow)]
struct EditorialCommentRow {
    id: i64,
    article_id: i64,
    parent_id: Option<i64>,
    author_id: i64,
    author_username: String,
    version_number: Option<i64>,
    kind: String,
    body: String,
    is_resolved: bool,
    resolved_by: Option<i64>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EditorialCommentRow> for EditorialComment {
    type Error = anyhow::Error;

    fn try_from(row: EditorialCommentRow) -> Result<Self> {
        Ok(EditorialComment {
            id: row.id,
            article_id: row.article_id,
            parent_id: row.parent_id,
            author_id: row.author_id,
            author_username: row.author_username,
            version_number: row.version_number,
            kind: row.kind.parse()?,
            body: row.body,
            is_resolved: row.is_resolved,
            resolved_by: row.resolved_by,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl EditorialCommentRepository for SqlxEditorialCommentRepository {
    async fn create(&self, comment: &NewEditorialComment) -> Result<EditorialComment> {
        let now = Utc::now();
        let (id,) = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, (i64,)>(
                r#"
                INSERT INTO editorial_comments
                    (article_id, parent_id, author_id, version_number, kind, body, is_resolved, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
                RETURNING id
                "#,
            )
            .bind(comment.article_id)
            .bind(comment.parent_id)
            .bind(comment.author_id)
            .bind(comment.version_number)
            .bind(comment.kind.as_str())
            .bind(&comment.body)
            .bind(false)
            .bind(now)
            .fetch_one(p)
            .await
        })
        .context("Failed to create editorial comment")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Editorial comment {} vanished after insert", id))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EditorialComment>> {
        let sql = format!("{} WHERE c.id = $1", SELECT_COMMENT);
        let row = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, EditorialCommentRow>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
        })
        .context("Failed to get editorial comment")?;

        row.map(EditorialComment::try_from).transpose()
    }

    async fn list_by_article(&self, article_id: i64) -> Result<Vec<EditorialComment>> {
        let sql = format!(
            "{} WHERE c.article_id = $1 ORDER BY c.created_at ASC, c.id ASC",
            SELECT_COMMENT
        );
        let rows = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, EditorialCommentRow>(&sql)
                .bind(article_id)
                .fetch_all(p)
                .await
        })
        .context("Failed to list editorial comments")?;

        rows.into_iter().map(EditorialComment::try_from).collect()
    }

    async fn set_resolved(
        &self,
        id: i64,
        resolved_by: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let resolved_at = resolved_by.map(|_| at);
        let updated = on_backend!(self.pool, |p| {
            sqlx::query(
                r#"
                UPDATE editorial_comments
                SET is_resolved = $1, resolved_by = $2, resolved_at = $3, updated_at = $4
                WHERE id = $5
                "#,
            )
            .bind(resolved_by.is_some())
            .bind(resolved_by)
            .bind(resolved_at)
            .bind(at)
            .bind(id)
            .execute(p)
            .await
            .map(|r| r.rows_affected())
        })
        .context("Failed to update editorial comment")?;

        Ok(updated > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = on_backend!(self.pool, |p| {
            sqlx::query("DELETE FROM editorial_comments WHERE id = $1")
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })
        .context("Failed to delete editorial comment")?;

        Ok(deleted > 0)
    }

    async fn count_unresolved(&self, article_id: i64) -> Result<i64> {
        let (count,) = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, (i64,)>(
                r#"
                SELECT COUNT(*) FROM editorial_comments
                WHERE article_id = $1 AND parent_id IS NULL AND is_resolved = $2
                "#,
            )
            .bind(article_id)
            .bind(false)
            .fetch_one(p)
            .await
        })
        .context("Failed to count unresolved comments")?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        AdminUserRepository, ArticleRepository, NewArticle, SqlxAdminUserRepository,
        SqlxArticleRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{AdminRole, AdminUser, CommentKind};

    async fn setup() -> (SqlxEditorialCommentRepository, i64, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let user = SqlxAdminUserRepository::new(pool.clone())
            .create(&AdminUser::new(
                "editora".to_string(),
                "editora@safrareport.com".to_string(),
                "hash".to_string(),
                AdminRole::Editor,
            ))
            .await
            .unwrap();

        let article = SqlxArticleRepository::new(pool.clone())
            .create(&NewArticle {
                slug: "merengue".to_string(),
                title: "Merengue".to_string(),
                excerpt: None,
                content: "Texto".to_string(),
                content_html: "<p>Texto</p>".to_string(),
                author_id: user.id,
                category_id: None,
                province_id: None,
                change_summary: "Initial draft".to_string(),
            })
            .await
            .unwrap();

        (SqlxEditorialCommentRepository::new(pool), article.id, user.id)
    }

    fn new_comment(article_id: i64, author_id: i64, parent_id: Option<i64>) -> NewEditorialComment {
        NewEditorialComment {
            article_id,
            parent_id,
            author_id,
            version_number: Some(1),
            kind: CommentKind::General,
            body: "Revisar el segundo párrafo".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (repo, article_id, user_id) = setup().await;

        let root = repo.create(&new_comment(article_id, user_id, None)).await.unwrap();
        assert_eq!(root.author_username, "editora");
        assert!(!root.is_resolved);

        repo.create(&new_comment(article_id, user_id, Some(root.id)))
            .await
            .unwrap();

        let all = repo.list_by_article(article_id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].parent_id, Some(root.id));
    }

    #[tokio::test]
    async fn test_resolve_and_reopen() {
        let (repo, article_id, user_id) = setup().await;
        let root = repo.create(&new_comment(article_id, user_id, None)).await.unwrap();
        assert_eq!(repo.count_unresolved(article_id).await.unwrap(), 1);

        assert!(repo.set_resolved(root.id, Some(user_id), Utc::now()).await.unwrap());
        let resolved = repo.get_by_id(root.id).await.unwrap().unwrap();
        assert!(resolved.is_resolved);
        assert_eq!(resolved.resolved_by, Some(user_id));
        assert!(resolved.resolved_at.is_some());
        assert_eq!(repo.count_unresolved(article_id).await.unwrap(), 0);

        repo.set_resolved(root.id, None, Utc::now()).await.unwrap();
        let reopened = repo.get_by_id(root.id).await.unwrap().unwrap();
        assert!(!reopened.is_resolved);
        assert!(reopened.resolved_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_replies() {
        let (repo, article_id, user_id) = setup().await;
        let root = repo.create(&new_comment(article_id, user_id, None)).await.unwrap();
        let reply = repo
            .create(&new_comment(article_id, user_id, Some(root.id)))
            .await
            .unwrap();

        assert!(repo.delete(root.id).await.unwrap());
        assert!(repo.get_by_id(reply.id).await.unwrap().is_none());
        assert!(!repo.delete(root.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_replies_not_counted_as_unresolved() {
        let (repo, article_id, user_id) = setup().await;
        let root = repo.create(&new_comment(article_id, user_id, None)).await.unwrap();
        repo.create(&new_comment(article_id, user_id, Some(root.id)))
            .await
            .unwrap();

        assert_eq!(repo.count_unresolved(article_id).await.unwrap(), 1);
    }
}
