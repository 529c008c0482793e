//! Article repository
//!
//! Database operations for articles.
//!
//! Content writes and version snapshots share one transaction so that
//! `articles.current_version` always names the newest `article_versions` row.
//! Both content edits and status transitions are compare-and-swap: the
//! `UPDATE` only matches while the row still has the state the caller read,
//! and `Ok(None)` tells the caller someone else got there first.

use crate::db::{Conditions, DatabasePool, DynDatabasePool, SqlParam};
use crate::models::{
    Article, ArticleFilter, ArticleStatus, CommentKind, ListParams, NewVersion,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Fully resolved data for a new article
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub content_html: String,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub province_id: Option<i64>,
    /// Recorded on version 1
    pub change_summary: String,
}

/// Replacement values for an article's editable fields
#[derive(Debug, Clone)]
pub struct ContentUpdate {
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub content_html: String,
    pub category_id: Option<i64>,
    pub province_id: Option<i64>,
    /// Status the article must still have
    pub expected_status: ArticleStatus,
    /// `current_version` the article must still have
    pub expected_version: i64,
    /// Status after the edit
    pub status: ArticleStatus,
    /// Snapshot to record; `None` for taxonomy-only edits
    pub new_version: Option<NewVersion>,
}

/// A workflow transition as the database sees it
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: ArticleStatus,
    pub to: ArticleStatus,
    pub actor_id: i64,
    pub at: DateTime<Utc>,
    /// Stored as a review comment when present
    pub notes: Option<String>,
    /// Stamp `submitted_at`
    pub mark_submitted: bool,
    /// Stamp `reviewed_by`, `reviewed_at` and `review_notes`
    pub mark_reviewed: bool,
    /// Stamp `published_at` unless it is already set
    pub mark_published: bool,
}

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert an article in draft together with its version 1
    async fn create(&self, article: &NewArticle) -> Result<Article>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Newsroom listing, most recently updated first
    async fn list(&self, filter: &ArticleFilter, params: &ListParams) -> Result<(Vec<Article>, i64)>;

    /// Public listing, newest publication first
    async fn list_published(&self, params: &ListParams) -> Result<(Vec<Article>, i64)>;

    /// Articles in one state, oldest submission first
    async fn review_queue(
        &self,
        status: ArticleStatus,
        params: &ListParams,
    ) -> Result<(Vec<Article>, i64)>;

    /// Apply an edit, snapshotting and pruning versions when asked
    async fn update_content(&self, id: i64, update: &ContentUpdate) -> Result<Option<Article>>;

    /// Move an article to a new status if it is still in `change.from`
    async fn transition(&self, id: i64, change: &StatusChange) -> Result<Option<Article>>;

    /// Number of articles per stored status
    async fn count_by_status(&self) -> Result<Vec<(ArticleStatus, i64)>>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_page(
        &self,
        conditions: &Conditions,
        order_by: &str,
        params: &ListParams,
    ) -> Result<(Vec<Article>, i64)> {
        let where_sql = conditions.where_sql();
        let next = conditions.next_index();
        let list_sql = format!(
            "{} {} ORDER BY {} LIMIT ${} OFFSET ${}",
            SELECT_ARTICLE,
            where_sql,
            order_by,
            next,
            next + 1
        );
        let count_sql = format!("SELECT COUNT(*) FROM articles {}", where_sql);

        let (rows, total) = on_backend!(self.pool, |p| {
            let rows = bind_params!(sqlx::query_as::<_, ArticleRow>(&list_sql), conditions.params())
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(p)
                .await?;
            let (total,) = bind_params!(sqlx::query_as::<_, (i64,)>(&count_sql), conditions.params())
                .fetch_one(p)
                .await?;
            Ok::<_, sqlx::Error>((rows, total))
        })
        .context("Failed to list articles")?;

        let articles = rows
            .into_iter()
            .map(Article::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((articles, total))
    }
}

const SELECT_ARTICLE: &str = r#"
    SELECT id, slug, title, excerpt, content, content_html, author_id, category_id,
           province_id, status, current_version, submitted_at, reviewed_by, reviewed_at,
           review_notes, published_at, created_at, updated_at
    FROM articles
"#;

const INSERT_VERSION: &str = r#"
    INSERT INTO article_versions
        (article_id, version_number, title, excerpt, content, change_summary, created_by, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

const PRUNE_VERSIONS: &str =
    "DELETE FROM article_versions WHERE article_id = $1 AND version_number <= $2";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    slug: String,
    title: String,
    excerpt: Option<String>,
    content: String,
    content_html: String,
    author_id: i64,
    category_id: Option<i64>,
    province_id: Option<i64>,
    status: String,
    current_version: i64,
    submitted_at: Option<DateTime<Utc>>,
    reviewed_by: Option<i64>,
    reviewed_at: Option<DateTime<Utc>>,
    review_notes: Option<String>,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ArticleRow> for Article {
    type Error = anyhow::Error;

    fn try_from(row: ArticleRow) -> Result<Self> {
        Ok(Article {
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            content: row.content,
            content_html: row.content_html,
            author_id: row.author_id,
            category_id: row.category_id,
            province_id: row.province_id,
            status: row.status.parse()?,
            current_version: row.current_version,
            submitted_at: row.submitted_at,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            review_notes: row.review_notes,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &NewArticle) -> Result<Article> {
        let now = Utc::now();
        let select_sql = format!("{} WHERE id = $1", SELECT_ARTICLE);

        let row = on_backend!(self.pool, |p| {
            let mut tx = p.begin().await?;

            let (id,) = sqlx::query_as::<_, (i64,)>(
                r#"
                INSERT INTO articles
                    (slug, title, excerpt, content, content_html, author_id, category_id,
                     province_id, status, current_version, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'draft', 1, $9, $9)
                RETURNING id
                "#,
            )
            .bind(&article.slug)
            .bind(&article.title)
            .bind(&article.excerpt)
            .bind(&article.content)
            .bind(&article.content_html)
            .bind(article.author_id)
            .bind(article.category_id)
            .bind(article.province_id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(INSERT_VERSION)
                .bind(id)
                .bind(1i64)
                .bind(&article.title)
                .bind(&article.excerpt)
                .bind(&article.content)
                .bind(&article.change_summary)
                .bind(article.author_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;

            let row = sqlx::query_as::<_, ArticleRow>(&select_sql)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(row)
        })
        .context("Failed to create article")?;

        Article::try_from(row)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("{} WHERE id = $1", SELECT_ARTICLE);
        let row = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, ArticleRow>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
        })
        .context("Failed to get article by ID")?;

        row.map(Article::try_from).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let sql = format!("{} WHERE slug = $1", SELECT_ARTICLE);
        let row = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, ArticleRow>(&sql)
                .bind(slug)
                .fetch_optional(p)
                .await
        })
        .context("Failed to get article by slug")?;

        row.map(Article::try_from).transpose()
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let (count,) = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM articles WHERE slug = $1")
                .bind(slug)
                .fetch_one(p)
                .await
        })
        .context("Failed to check slug")?;

        Ok(count > 0)
    }

    async fn list(&self, filter: &ArticleFilter, params: &ListParams) -> Result<(Vec<Article>, i64)> {
        let mut conditions = Conditions::new();
        if let Some(status) = filter.status {
            conditions.push("status = {}", SqlParam::Text(status.as_str().to_string()));
        }
        if let Some(author_id) = filter.author_id {
            conditions.push("author_id = {}", SqlParam::Int(author_id));
        }
        if let Some(category_id) = filter.category_id {
            conditions.push("category_id = {}", SqlParam::Int(category_id));
        }
        if let Some(province_id) = filter.province_id {
            conditions.push("province_id = {}", SqlParam::Int(province_id));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.push(
                "LOWER(title) LIKE {}",
                SqlParam::Text(format!("%{}%", search.to_lowercase())),
            );
        }

        self.fetch_page(&conditions, "updated_at DESC, id DESC", params).await
    }

    async fn list_published(&self, params: &ListParams) -> Result<(Vec<Article>, i64)> {
        let mut conditions = Conditions::new();
        conditions.push(
            "status = {}",
            SqlParam::Text(ArticleStatus::Published.as_str().to_string()),
        );

        self.fetch_page(&conditions, "published_at DESC, id DESC", params).await
    }

    async fn review_queue(
        &self,
        status: ArticleStatus,
        params: &ListParams,
    ) -> Result<(Vec<Article>, i64)> {
        let mut conditions = Conditions::new();
        conditions.push("status = {}", SqlParam::Text(status.as_str().to_string()));

        self.fetch_page(
            &conditions,
            "COALESCE(submitted_at, updated_at) ASC, id ASC",
            params,
        )
        .await
    }

    async fn update_content(&self, id: i64, update: &ContentUpdate) -> Result<Option<Article>> {
        let now = Utc::now();
        let next_version = match update.new_version {
            Some(_) => update.expected_version + 1,
            None => update.expected_version,
        };
        let select_sql = format!("{} WHERE id = $1", SELECT_ARTICLE);

        let row = on_backend!(self.pool, |p| {
            let mut tx = p.begin().await?;

            let updated = sqlx::query(
                r#"
                UPDATE articles
                SET title = $1, excerpt = $2, content = $3, content_html = $4,
                    category_id = $5, province_id = $6, status = $7,
                    current_version = $8, updated_at = $9
                WHERE id = $10 AND status = $11 AND current_version = $12
                "#,
            )
            .bind(&update.title)
            .bind(&update.excerpt)
            .bind(&update.content)
            .bind(&update.content_html)
            .bind(update.category_id)
            .bind(update.province_id)
            .bind(update.status.as_str())
            .bind(next_version)
            .bind(now)
            .bind(id)
            .bind(update.expected_status.as_str())
            .bind(update.expected_version)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                tx.rollback().await?;
                return Ok::<_, sqlx::Error>(None);
            }

            if let Some(version) = &update.new_version {
                sqlx::query(INSERT_VERSION)
                    .bind(id)
                    .bind(next_version)
                    .bind(&update.title)
                    .bind(&update.excerpt)
                    .bind(&update.content)
                    .bind(&version.change_summary)
                    .bind(version.created_by)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                sqlx::query(PRUNE_VERSIONS)
                    .bind(id)
                    .bind(next_version - version.retain.max(1))
                    .execute(&mut *tx)
                    .await?;
            }

            let row = sqlx::query_as::<_, ArticleRow>(&select_sql)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(Some(row))
        })
        .context("Failed to update article")?;

        row.map(Article::try_from).transpose()
    }

    async fn transition(&self, id: i64, change: &StatusChange) -> Result<Option<Article>> {
        let select_sql = format!("{} WHERE id = $1", SELECT_ARTICLE);
        let review_notes = if change.mark_reviewed {
            change.notes.clone()
        } else {
            None
        };

        let row = on_backend!(self.pool, |p| {
            let mut tx = p.begin().await?;

            let updated = sqlx::query(
                r#"
                UPDATE articles
                SET status = $1,
                    updated_at = $2,
                    submitted_at = CASE WHEN $3 THEN $2 ELSE submitted_at END,
                    reviewed_by = CASE WHEN $4 THEN $5 ELSE reviewed_by END,
                    reviewed_at = CASE WHEN $4 THEN $2 ELSE reviewed_at END,
                    review_notes = CASE WHEN $4 THEN $6 ELSE review_notes END,
                    published_at = CASE WHEN $7 THEN COALESCE(published_at, $2) ELSE published_at END
                WHERE id = $8 AND status = $9
                "#,
            )
            .bind(change.to.as_str())
            .bind(change.at)
            .bind(change.mark_submitted)
            .bind(change.mark_reviewed)
            .bind(change.actor_id)
            .bind(&review_notes)
            .bind(change.mark_published)
            .bind(id)
            .bind(change.from.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                tx.rollback().await?;
                return Ok::<_, sqlx::Error>(None);
            }

            let row = sqlx::query_as::<_, ArticleRow>(&select_sql)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

            if let Some(notes) = &change.notes {
                sqlx::query(
                    r#"
                    INSERT INTO editorial_comments
                        (article_id, author_id, version_number, kind, body, is_resolved, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                    "#,
                )
                .bind(id)
                .bind(change.actor_id)
                .bind(row.current_version)
                .bind(CommentKind::Review.as_str())
                .bind(notes)
                .bind(false)
                .bind(change.at)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(Some(row))
        })
        .context("Failed to change article status")?;

        row.map(Article::try_from).transpose()
    }

    async fn count_by_status(&self) -> Result<Vec<(ArticleStatus, i64)>> {
        let rows = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, (String, i64)>(
                "SELECT status, COUNT(*) FROM articles GROUP BY status",
            )
            .fetch_all(p)
            .await
        })
        .context("Failed to count articles by status")?;

        rows.into_iter()
            .map(|(status, count)| Ok((status.parse()?, count)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{AdminUserRepository, SqlxAdminUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{AdminRole, AdminUser};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxArticleRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = SqlxAdminUserRepository::new(pool.clone())
            .create(&AdminUser::new(
                "redactor".to_string(),
                "redactor@safrareport.com".to_string(),
                "hash".to_string(),
                AdminRole::Author,
            ))
            .await
            .unwrap();

        (pool.clone(), SqlxArticleRepository::new(pool), author.id)
    }

    fn new_article(slug: &str, author_id: i64) -> NewArticle {
        NewArticle {
            slug: slug.to_string(),
            title: format!("Titular {}", slug),
            excerpt: Some("Resumen".to_string()),
            content: "Primer párrafo".to_string(),
            content_html: "<p>Primer párrafo</p>".to_string(),
            author_id,
            category_id: Some(1),
            province_id: Some(1),
            change_summary: "Initial draft".to_string(),
        }
    }

    fn edit(article: &Article, content: &str, by: i64, retain: i64) -> ContentUpdate {
        ContentUpdate {
            title: article.title.clone(),
            excerpt: article.excerpt.clone(),
            content: content.to_string(),
            content_html: format!("<p>{}</p>", content),
            category_id: article.category_id,
            province_id: article.province_id,
            expected_status: article.status,
            expected_version: article.current_version,
            status: article.status,
            new_version: Some(NewVersion {
                change_summary: Some("edit".to_string()),
                created_by: by,
                retain,
            }),
        }
    }

    fn change(from: ArticleStatus, to: ArticleStatus, actor_id: i64) -> StatusChange {
        StatusChange {
            from,
            to,
            actor_id,
            at: Utc::now(),
            notes: None,
            mark_submitted: false,
            mark_reviewed: false,
            mark_published: false,
        }
    }

    async fn version_numbers(pool: &DynDatabasePool, article_id: i64) -> Vec<i64> {
        on_backend!(pool, |p| {
            sqlx::query_as::<_, (i64,)>(
                "SELECT version_number FROM article_versions WHERE article_id = $1 ORDER BY version_number",
            )
            .bind(article_id)
            .fetch_all(p)
            .await
        })
        .unwrap()
        .into_iter()
        .map(|(n,)| n)
        .collect()
    }

    #[tokio::test]
    async fn test_create_writes_first_version() {
        let (pool, repo, author) = setup_test_repo().await;

        let article = repo.create(&new_article("apagon-santo-domingo", author)).await.unwrap();

        assert_eq!(article.status, ArticleStatus::Draft);
        assert_eq!(article.current_version, 1);
        assert_eq!(version_numbers(&pool, article.id).await, vec![1]);
    }

    #[tokio::test]
    async fn test_get_by_slug_and_exists() {
        let (_pool, repo, author) = setup_test_repo().await;
        repo.create(&new_article("zafra-azucarera", author)).await.unwrap();

        assert!(repo.slug_exists("zafra-azucarera").await.unwrap());
        assert!(!repo.slug_exists("otra").await.unwrap());
        assert!(repo.get_by_slug("zafra-azucarera").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let (_pool, repo, author) = setup_test_repo().await;
        repo.create(&new_article("dup", author)).await.unwrap();
        assert!(repo.create(&new_article("dup", author)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_content_snapshots_and_bumps_version() {
        let (pool, repo, author) = setup_test_repo().await;
        let article = repo.create(&new_article("nota", author)).await.unwrap();

        let updated = repo
            .update_content(article.id, &edit(&article, "Segundo texto", author, 50))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.current_version, 2);
        assert_eq!(updated.content, "Segundo texto");
        assert_eq!(version_numbers(&pool, article.id).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_update_content_stale_version_is_rejected() {
        let (pool, repo, author) = setup_test_repo().await;
        let article = repo.create(&new_article("nota", author)).await.unwrap();

        repo.update_content(article.id, &edit(&article, "v2", author, 50))
            .await
            .unwrap()
            .unwrap();

        // Still based on version 1
        let stale = repo
            .update_content(article.id, &edit(&article, "v2 bis", author, 50))
            .await
            .unwrap();

        assert!(stale.is_none());
        assert_eq!(version_numbers(&pool, article.id).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_update_content_prunes_old_versions() {
        let (pool, repo, author) = setup_test_repo().await;
        let mut article = repo.create(&new_article("nota", author)).await.unwrap();

        for i in 0..4 {
            article = repo
                .update_content(article.id, &edit(&article, &format!("texto {}", i), author, 3))
                .await
                .unwrap()
                .unwrap();
        }

        assert_eq!(article.current_version, 5);
        assert_eq!(version_numbers(&pool, article.id).await, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_taxonomy_only_update_keeps_version() {
        let (pool, repo, author) = setup_test_repo().await;
        let article = repo.create(&new_article("nota", author)).await.unwrap();

        let mut update = edit(&article, &article.content, author, 50);
        update.new_version = None;
        update.province_id = Some(2);

        let updated = repo.update_content(article.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.current_version, 1);
        assert_eq!(updated.province_id, Some(2));
        assert_eq!(version_numbers(&pool, article.id).await, vec![1]);
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_swap() {
        let (_pool, repo, author) = setup_test_repo().await;
        let article = repo.create(&new_article("nota", author)).await.unwrap();

        let mut submit = change(ArticleStatus::Draft, ArticleStatus::PendingReview, author);
        submit.mark_submitted = true;
        let submitted = repo.transition(article.id, &submit).await.unwrap().unwrap();
        assert_eq!(submitted.status, ArticleStatus::PendingReview);
        assert!(submitted.submitted_at.is_some());

        // Second submit from the stale draft state matches nothing
        assert!(repo.transition(article.id, &submit).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_records_review_and_publication() {
        let (pool, repo, author) = setup_test_repo().await;
        let article = repo.create(&new_article("nota", author)).await.unwrap();

        let mut submit = change(ArticleStatus::Draft, ArticleStatus::PendingReview, author);
        submit.mark_submitted = true;
        repo.transition(article.id, &submit).await.unwrap().unwrap();

        let mut reject = change(ArticleStatus::PendingReview, ArticleStatus::NeedsChanges, author);
        reject.mark_reviewed = true;
        reject.notes = Some("Falta la fuente".to_string());
        let reviewed = repo.transition(article.id, &reject).await.unwrap().unwrap();
        assert_eq!(reviewed.reviewed_by, Some(author));
        assert_eq!(reviewed.review_notes.as_deref(), Some("Falta la fuente"));

        let (comments,) = on_backend!(pool, |p| {
            sqlx::query_as::<_, (i64,)>(
                "SELECT COUNT(*) FROM editorial_comments WHERE article_id = $1 AND kind = 'review'",
            )
            .bind(article.id)
            .fetch_one(p)
            .await
        })
        .unwrap();
        assert_eq!(comments, 1);

        let mut publish = change(ArticleStatus::NeedsChanges, ArticleStatus::Published, author);
        publish.mark_published = true;
        let published = repo.transition(article.id, &publish).await.unwrap().unwrap();
        let first_published_at = published.published_at.unwrap();

        repo.transition(article.id, &change(ArticleStatus::Published, ArticleStatus::Draft, author))
            .await
            .unwrap()
            .unwrap();
        let republished = repo
            .transition(article.id, &{
                let mut again = change(ArticleStatus::Draft, ArticleStatus::Published, author);
                again.mark_published = true;
                again
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(republished.published_at, Some(first_published_at));
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (_pool, repo, author) = setup_test_repo().await;
        for slug in ["beisbol-invernal", "turismo-punta-cana", "beisbol-licey"] {
            repo.create(&new_article(slug, author)).await.unwrap();
        }

        let filter = ArticleFilter {
            search: Some("BEISBOL".to_string()),
            ..Default::default()
        };
        let (items, total) = repo.list(&filter, &ListParams::new(1, 1)).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 1);

        let filter = ArticleFilter {
            status: Some(ArticleStatus::Published),
            ..Default::default()
        };
        let (items, total) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(total, 0);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_review_queue_oldest_submission_first() {
        let (_pool, repo, author) = setup_test_repo().await;
        let first = repo.create(&new_article("primera", author)).await.unwrap();
        let second = repo.create(&new_article("segunda", author)).await.unwrap();

        for id in [second.id, first.id] {
            let mut submit = change(ArticleStatus::Draft, ArticleStatus::PendingReview, author);
            submit.mark_submitted = true;
            repo.transition(id, &submit).await.unwrap().unwrap();
        }

        let (queue, total) = repo
            .review_queue(ArticleStatus::PendingReview, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(queue[0].id, second.id);
        assert_eq!(queue[1].id, first.id);
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let (_pool, repo, author) = setup_test_repo().await;
        repo.create(&new_article("a", author)).await.unwrap();
        repo.create(&new_article("b", author)).await.unwrap();

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts, vec![(ArticleStatus::Draft, 2)]);
    }
}
