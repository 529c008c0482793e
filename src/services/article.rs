//! Article service
//!
//! Drafting and editing rules for newsroom articles:
//! - validation, slug generation and Markdown rendering
//! - who may edit what, and when an article is locked
//! - optimistic concurrency on `current_version`
//! - version snapshots on content changes
//! - public read-through cache for published articles

use crate::cache::{self, Cache, CacheLayer};
use crate::config::EditorialConfig;
use crate::db::repositories::{ArticleRepository, ContentUpdate, NewArticle, TaxonomyRepository};
use crate::models::{
    AdminUser, Article, ArticleFilter, ArticleStatus, Category, CreateArticleInput, ListParams,
    NewAuditLog, NewVersion, PagedResult, Province, UpdateArticleInput,
};
use crate::services::audit::AuditService;
use crate::services::markdown::MarkdownRenderer;
use anyhow::Context;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Longest title accepted
pub const MAX_TITLE_LENGTH: usize = 255;

/// Longest Markdown body accepted, in characters
pub const MAX_CONTENT_LENGTH: usize = 200_000;

/// Longest generated slug, before any `-N` suffix
const MAX_SLUG_LENGTH: usize = 100;

/// Length of an excerpt derived from the content
const AUTO_EXCERPT_LENGTH: usize = 200;

/// Public listing pages go stale faster than single articles
const LIST_CACHE_TTL_SECS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Article not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Article slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The article is waiting for review and cannot be edited
    #[error("Article is locked: {0}")]
    Locked(String),

    /// Someone else changed the article since the client read it
    #[error("{message}")]
    Conflict { message: String, current_version: i64 },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Editable fields after merging an edit onto the stored article
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArticleFields {
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category_id: Option<i64>,
    pub province_id: Option<i64>,
}

impl ArticleFields {
    pub(crate) fn of(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            excerpt: article.excerpt.clone(),
            content: article.content.clone(),
            category_id: article.category_id,
            province_id: article.province_id,
        }
    }

    fn same_text(&self, other: &ArticleFields) -> bool {
        self.title == other.title && self.excerpt == other.excerpt && self.content == other.content
    }
}

pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    taxonomy: Arc<dyn TaxonomyRepository>,
    audit: Arc<AuditService>,
    cache: Cache,
    markdown: MarkdownRenderer,
    policy: EditorialConfig,
    cache_ttl: Duration,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        taxonomy: Arc<dyn TaxonomyRepository>,
        audit: Arc<AuditService>,
        cache: Cache,
        policy: EditorialConfig,
    ) -> Self {
        let cache_ttl = cache.max_ttl();
        Self {
            repo,
            taxonomy,
            audit,
            cache,
            markdown: MarkdownRenderer::new(),
            policy,
            cache_ttl,
        }
    }

    /// Create an article in `draft` with version 1
    pub async fn create_draft(
        &self,
        input: CreateArticleInput,
        author: &AdminUser,
        ip: Option<String>,
    ) -> Result<Article, ArticleServiceError> {
        let fields = ArticleFields {
            title: input.title.trim().to_string(),
            excerpt: normalize_excerpt(input.excerpt),
            content: input.content,
            category_id: input.category_id,
            province_id: input.province_id,
        };
        self.validate(&fields).await?;

        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(requested) => {
                let slug = generate_slug(requested);
                if slug.is_empty() {
                    return Err(ArticleServiceError::Validation(
                        "Slug must contain letters or digits".to_string(),
                    ));
                }
                if self
                    .repo
                    .slug_exists(&slug)
                    .await
                    .context("Failed to check slug uniqueness")?
                {
                    return Err(ArticleServiceError::DuplicateSlug(slug));
                }
                slug
            }
            None => self.unique_slug(&fields.title).await?,
        };

        let excerpt = fields
            .excerpt
            .clone()
            .or_else(|| Some(self.markdown.plain_text(&fields.content, AUTO_EXCERPT_LENGTH)))
            .filter(|e| !e.is_empty());

        let article = self
            .repo
            .create(&NewArticle {
                slug,
                title: fields.title,
                excerpt,
                content_html: self.markdown.render(&fields.content),
                content: fields.content,
                author_id: author.id,
                category_id: fields.category_id,
                province_id: fields.province_id,
                change_summary: "Initial draft".to_string(),
            })
            .await?;

        tracing::info!(article_id = article.id, author_id = author.id, slug = %article.slug, "Draft created");
        self.audit
            .record(
                NewAuditLog::new("article.create", "article")
                    .by(author.id)
                    .entity(article.id)
                    .details(json!({ "title": article.title, "slug": article.slug }))
                    .ip(ip),
            )
            .await;

        Ok(article)
    }

    /// Edit title, excerpt, content or taxonomy
    pub async fn update_content(
        &self,
        id: i64,
        actor: &AdminUser,
        input: UpdateArticleInput,
        ip: Option<String>,
    ) -> Result<Article, ArticleServiceError> {
        if !input.has_changes() {
            return Err(ArticleServiceError::Validation(
                "No fields to update".to_string(),
            ));
        }

        let article = self.get(id).await?;
        if let Some(base) = input.base_version {
            if base != article.current_version {
                return Err(stale_version(article.current_version));
            }
        }

        let current = ArticleFields::of(&article);
        let fields = ArticleFields {
            title: input
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| current.title.clone()),
            excerpt: match input.excerpt {
                Some(excerpt) => normalize_excerpt(Some(excerpt)),
                None => current.excerpt.clone(),
            },
            content: input.content.unwrap_or_else(|| current.content.clone()),
            category_id: input.category_id.unwrap_or(current.category_id),
            province_id: input.province_id.unwrap_or(current.province_id),
        };

        self.write_edit(&article, actor, fields, input.change_summary, "article.update", ip)
            .await
    }

    /// Check the edit rules, then store `fields` as the article's new state.
    ///
    /// Shared by plain edits and version restores.
    pub(crate) async fn write_edit(
        &self,
        article: &Article,
        actor: &AdminUser,
        fields: ArticleFields,
        change_summary: Option<String>,
        audit_action: &str,
        ip: Option<String>,
    ) -> Result<Article, ArticleServiceError> {
        check_editable(article, actor)?;

        let current = ArticleFields::of(article);
        if fields == current {
            return Ok(article.clone());
        }
        self.validate(&fields).await?;

        let text_changed = !fields.same_text(&current);
        let status = if article.status == ArticleStatus::Approved {
            ArticleStatus::Draft
        } else {
            article.status
        };

        let update = ContentUpdate {
            content_html: self.markdown.render(&fields.content),
            title: fields.title,
            excerpt: fields.excerpt,
            content: fields.content,
            category_id: fields.category_id,
            province_id: fields.province_id,
            expected_status: article.status,
            expected_version: article.current_version,
            status,
            new_version: text_changed.then(|| NewVersion {
                change_summary: change_summary.filter(|s| !s.trim().is_empty()),
                created_by: actor.id,
                retain: self.policy.max_versions_per_article,
            }),
        };

        let updated = match self.repo.update_content(article.id, &update).await? {
            Some(updated) => updated,
            None => {
                let latest = self.get(article.id).await?;
                return Err(stale_version(latest.current_version));
            }
        };

        tracing::info!(
            article_id = updated.id,
            actor_id = actor.id,
            version = updated.current_version,
            status = %updated.status,
            "Article edited"
        );
        self.audit
            .record(
                NewAuditLog::new(audit_action, "article")
                    .by(actor.id)
                    .entity(updated.id)
                    .details(json!({
                        "version": updated.current_version,
                        "new_version": text_changed,
                        "from_status": article.status,
                        "to_status": updated.status,
                    }))
                    .ip(ip),
            )
            .await;

        if article.is_published() {
            self.invalidate_public_cache().await;
        }

        Ok(updated)
    }

    pub async fn get(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| ArticleServiceError::NotFound(id.to_string()))
    }

    /// Published article by slug, served from the cache when possible
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Article, ArticleServiceError> {
        let key = cache::article_slug_key(slug);
        if let Ok(Some(article)) = self.cache.get::<Article>(&key).await {
            return Ok(article);
        }

        let article = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get article by slug")?
            .filter(Article::is_published)
            .ok_or_else(|| ArticleServiceError::NotFound(slug.to_string()))?;

        if let Err(e) = self.cache.set(&key, &article, self.cache_ttl).await {
            tracing::warn!(error = %e, "Failed to cache article");
        }
        Ok(article)
    }

    pub async fn list(
        &self,
        filter: &ArticleFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        let (items, total) = self.repo.list(filter, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn list_published(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        let key = cache::published_page_key(params.page, params.per_page);
        if let Ok(Some(cached)) = self.cache.get::<PagedResult<Article>>(&key).await {
            return Ok(cached);
        }

        let (items, total) = self.repo.list_published(params).await?;
        let page = PagedResult::new(items, total, params);

        let ttl = Duration::from_secs(LIST_CACHE_TTL_SECS).min(self.cache_ttl);
        if let Err(e) = self.cache.set(&key, &page, ttl).await {
            tracing::warn!(error = %e, "Failed to cache article list");
        }
        Ok(page)
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ArticleServiceError> {
        Ok(self.taxonomy.list_categories().await?)
    }

    pub async fn provinces(&self) -> Result<Vec<Province>, ArticleServiceError> {
        Ok(self.taxonomy.list_provinces().await?)
    }

    /// Drop every cached public article entry
    pub async fn invalidate_public_cache(&self) {
        if let Err(e) = self.cache.delete_pattern(cache::ARTICLES_PATTERN).await {
            tracing::warn!(error = %e, "Failed to invalidate article cache");
        }
    }

    async fn validate(&self, fields: &ArticleFields) -> Result<(), ArticleServiceError> {
        if fields.title.is_empty() {
            return Err(ArticleServiceError::Validation(
                "Title cannot be empty".to_string(),
            ));
        }
        if fields.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ArticleServiceError::Validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if fields.content.trim().is_empty() {
            return Err(ArticleServiceError::Validation(
                "Content cannot be empty".to_string(),
            ));
        }
        if fields.content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(ArticleServiceError::Validation(format!(
                "Content must be at most {} characters",
                MAX_CONTENT_LENGTH
            )));
        }

        if let Some(category_id) = fields.category_id {
            if !self.taxonomy.category_exists(category_id).await? {
                return Err(ArticleServiceError::Validation(format!(
                    "Unknown category: {}",
                    category_id
                )));
            }
        }
        if let Some(province_id) = fields.province_id {
            if !self.taxonomy.province_exists(province_id).await? {
                return Err(ArticleServiceError::Validation(format!(
                    "Unknown province: {}",
                    province_id
                )));
            }
        }
        Ok(())
    }

    /// Slug from the title, suffixed `-2`, `-3`, ... until unused
    async fn unique_slug(&self, title: &str) -> Result<String, ArticleServiceError> {
        let mut base = generate_slug(title);
        if base.is_empty() {
            base = "articulo".to_string();
        }

        let mut candidate = base.clone();
        let mut n = 2;
        while self
            .repo
            .slug_exists(&candidate)
            .await
            .context("Failed to check slug uniqueness")?
        {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        Ok(candidate)
    }
}

/// Edit permissions shared by content edits and restores
pub(crate) fn check_editable(article: &Article, actor: &AdminUser) -> Result<(), ArticleServiceError> {
    if !actor.can_edit(article.author_id) {
        return Err(ArticleServiceError::Forbidden(
            "Only the author or an editor can edit this article".to_string(),
        ));
    }
    match article.status {
        ArticleStatus::PendingReview => Err(ArticleServiceError::Locked(
            "Article is waiting for review; withdraw it to make changes".to_string(),
        )),
        ArticleStatus::Published if !actor.is_editor() => Err(ArticleServiceError::Forbidden(
            "Only editors can edit a published article".to_string(),
        )),
        _ => Ok(()),
    }
}

fn stale_version(current_version: i64) -> ArticleServiceError {
    ArticleServiceError::Conflict {
        message: format!(
            "Article was modified by someone else; current version is {}",
            current_version
        ),
        current_version,
    }
}

fn normalize_excerpt(excerpt: Option<String>) -> Option<String> {
    excerpt
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

/// Spanish letters folded to ASCII; anything else non-ASCII becomes a separator
fn transliterate(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'Á' | 'À' | 'Â' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        c if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
        _ => return None,
    };
    Some(folded)
}

/// URL slug: lowercase ASCII letters, digits and single hyphens.
///
/// "¿Qué pasó en Santo Domingo?" becomes `que-paso-en-santo-domingo`.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        match transliterate(c) {
            Some(c) => {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(c);
            }
            None => pending_hyphen = true,
        }
    }

    if slug.len() > MAX_SLUG_LENGTH {
        // The slug is ASCII, so byte offsets are char boundaries
        let ends_on_word = slug.as_bytes().get(MAX_SLUG_LENGTH) == Some(&b'-');
        slug.truncate(MAX_SLUG_LENGTH);
        if !ends_on_word {
            if let Some(pos) = slug.rfind('-') {
                slug.truncate(pos);
            }
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{
        AdminUserRepository, SqlxAdminUserRepository, SqlxArticleRepository,
        SqlxAuditLogRepository, SqlxTaxonomyRepository, SqlxVersionRepository, VersionRepository,
    };
    use crate::db::{create_test_pool, migrations, DatabasePool, DynDatabasePool};
    use crate::models::AdminRole;

    struct Fixture {
        pool: DynDatabasePool,
        service: ArticleService,
        author: AdminUser,
        other_author: AdminUser,
        editor: AdminUser,
    }

    async fn staff(pool: &DynDatabasePool, name: &str, role: AdminRole) -> AdminUser {
        SqlxAdminUserRepository::new(pool.clone())
            .create(&AdminUser::new(
                name.to_string(),
                format!("{}@safrareport.com", name),
                "hash".to_string(),
                role,
            ))
            .await
            .unwrap()
    }

    async fn fixture_with(policy: EditorialConfig) -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = ArticleService::new(
            SqlxArticleRepository::boxed(pool.clone()),
            SqlxTaxonomyRepository::boxed(pool.clone()),
            Arc::new(AuditService::new(SqlxAuditLogRepository::boxed(pool.clone()))),
            create_cache(&CacheConfig::default()),
            policy,
        );

        Fixture {
            author: staff(&pool, "cronista", AdminRole::Author).await,
            other_author: staff(&pool, "reportero", AdminRole::Author).await,
            editor: staff(&pool, "editora", AdminRole::Editor).await,
            service,
            pool,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(EditorialConfig::default()).await
    }

    fn draft(title: &str) -> CreateArticleInput {
        CreateArticleInput {
            title: title.to_string(),
            content: "Contenido **inicial**".to_string(),
            ..Default::default()
        }
    }

    fn edit_content(content: &str) -> UpdateArticleInput {
        UpdateArticleInput {
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    async fn force_status(pool: &DynDatabasePool, id: i64, status: ArticleStatus) {
        pool.execute(&format!(
            "UPDATE articles SET status = '{}' WHERE id = {}",
            status.as_str(),
            id
        ))
        .await
        .unwrap();
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("¿Qué pasó en Santo Domingo?"), "que-paso-en-santo-domingo");
        assert_eq!(generate_slug("Año Nuevo   en  Puerto Plata"), "ano-nuevo-en-puerto-plata");
        assert_eq!(generate_slug("---"), "");
        assert_eq!(generate_slug("Águilas 5, Licey 3"), "aguilas-5-licey-3");
    }

    #[test]
    fn test_generate_slug_truncates_on_word_boundary() {
        let title = "palabra ".repeat(30);
        let slug = generate_slug(&title);
        assert!(slug.len() <= MAX_SLUG_LENGTH);
        assert!(slug.ends_with("palabra"));
    }

    #[test]
    fn test_generate_slug_keeps_word_ending_at_limit() {
        // "abcdefghij" then nine 9-letter words: the last one ends at byte 100
        let title = format!("abcdefghij{} final", " abcdefghi".repeat(9));
        let slug = generate_slug(&title);
        assert_eq!(slug.len(), MAX_SLUG_LENGTH);
        assert!(slug.ends_with("-abcdefghi"));
        assert!(!slug.contains("final"));
    }

    #[tokio::test]
    async fn test_create_draft() {
        let f = fixture().await;
        let article = f
            .service
            .create_draft(draft("Béisbol invernal"), &f.author, None)
            .await
            .unwrap();

        assert_eq!(article.status, ArticleStatus::Draft);
        assert_eq!(article.slug, "beisbol-invernal");
        assert_eq!(article.current_version, 1);
        assert!(article.content_html.contains("<strong>inicial</strong>"));
        assert_eq!(article.excerpt.as_deref(), Some("Contenido inicial"));
    }

    #[tokio::test]
    async fn test_create_draft_suffixes_taken_slugs() {
        let f = fixture().await;
        let first = f.service.create_draft(draft("Carnaval"), &f.author, None).await.unwrap();
        let second = f.service.create_draft(draft("Carnaval"), &f.author, None).await.unwrap();
        let third = f.service.create_draft(draft("Carnaval"), &f.author, None).await.unwrap();

        assert_eq!(first.slug, "carnaval");
        assert_eq!(second.slug, "carnaval-2");
        assert_eq!(third.slug, "carnaval-3");
    }

    #[tokio::test]
    async fn test_explicit_duplicate_slug_conflicts() {
        let f = fixture().await;
        f.service.create_draft(draft("Carnaval"), &f.author, None).await.unwrap();

        let mut input = draft("Otro carnaval");
        input.slug = Some("Carnaval".to_string());
        let result = f.service.create_draft(input, &f.author, None).await;
        assert!(matches!(result, Err(ArticleServiceError::DuplicateSlug(s)) if s == "carnaval"));
    }

    #[tokio::test]
    async fn test_create_draft_validation() {
        let f = fixture().await;

        let result = f.service.create_draft(draft("   "), &f.author, None).await;
        assert!(matches!(result, Err(ArticleServiceError::Validation(_))));

        let mut empty_body = draft("Título");
        empty_body.content = "  ".to_string();
        let result = f.service.create_draft(empty_body, &f.author, None).await;
        assert!(matches!(result, Err(ArticleServiceError::Validation(_))));

        let result = f
            .service
            .create_draft(draft(&"x".repeat(MAX_TITLE_LENGTH + 1)), &f.author, None)
            .await;
        assert!(matches!(result, Err(ArticleServiceError::Validation(_))));

        let mut bad_category = draft("Título");
        bad_category.category_id = Some(9999);
        let result = f.service.create_draft(bad_category, &f.author, None).await;
        assert!(matches!(result, Err(ArticleServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_content_creates_version() {
        let f = fixture().await;
        let article = f.service.create_draft(draft("Merengue"), &f.author, None).await.unwrap();

        let mut input = edit_content("Contenido revisado");
        input.change_summary = Some("Segunda versión".to_string());
        input.base_version = Some(1);
        let updated = f
            .service
            .update_content(article.id, &f.author, input, None)
            .await
            .unwrap();

        assert_eq!(updated.current_version, 2);
        assert_eq!(updated.content, "Contenido revisado");

        let versions = SqlxVersionRepository::new(f.pool.clone())
            .list(article.id)
            .await
            .unwrap();
        assert_eq!(versions[0].change_summary.as_deref(), Some("Segunda versión"));
    }

    #[tokio::test]
    async fn test_taxonomy_only_edit_keeps_version() {
        let f = fixture().await;
        let article = f.service.create_draft(draft("Merengue"), &f.author, None).await.unwrap();
        let category = f.service.categories().await.unwrap()[0].id;

        let updated = f
            .service
            .update_content(
                article.id,
                &f.author,
                UpdateArticleInput {
                    category_id: Some(Some(category)),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.current_version, 1);
        assert_eq!(updated.category_id, Some(category));
    }

    #[tokio::test]
    async fn test_edit_can_clear_taxonomy() {
        let f = fixture().await;
        let category = f.service.categories().await.unwrap()[0].id;
        let province = f.service.provinces().await.unwrap()[0].id;
        let mut input = draft("Merengue");
        input.category_id = Some(category);
        input.province_id = Some(province);
        let article = f.service.create_draft(input, &f.author, None).await.unwrap();

        let updated = f
            .service
            .update_content(
                article.id,
                &f.author,
                UpdateArticleInput {
                    category_id: Some(None),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.category_id, None);
        assert_eq!(updated.province_id, Some(province));
    }

    #[tokio::test]
    async fn test_content_length_limit() {
        let f = fixture().await;
        let mut long = draft("Memoria anual");
        long.content = "x".repeat(MAX_CONTENT_LENGTH + 1);
        let result = f.service.create_draft(long, &f.author, None).await;
        assert!(matches!(result, Err(ArticleServiceError::Validation(_))));

        let article = f.service.create_draft(draft("Memoria"), &f.author, None).await.unwrap();
        let result = f
            .service
            .update_content(
                article.id,
                &f.author,
                edit_content(&"y".repeat(MAX_CONTENT_LENGTH + 1)),
                None,
            )
            .await;
        assert!(matches!(result, Err(ArticleServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_stale_base_version_conflicts() {
        let f = fixture().await;
        let article = f.service.create_draft(draft("Merengue"), &f.author, None).await.unwrap();
        f.service
            .update_content(article.id, &f.author, edit_content("v2"), None)
            .await
            .unwrap();

        let mut stale = edit_content("v3 desde v1");
        stale.base_version = Some(1);
        let result = f.service.update_content(article.id, &f.author, stale, None).await;
        assert!(matches!(
            result,
            Err(ArticleServiceError::Conflict { current_version: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_edit_permissions() {
        let f = fixture().await;
        let article = f.service.create_draft(draft("Merengue"), &f.author, None).await.unwrap();

        let result = f
            .service
            .update_content(article.id, &f.other_author, edit_content("intruso"), None)
            .await;
        assert!(matches!(result, Err(ArticleServiceError::Forbidden(_))));

        f.service
            .update_content(article.id, &f.editor, edit_content("corrección"), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pending_review_is_locked() {
        let f = fixture().await;
        let article = f.service.create_draft(draft("Merengue"), &f.author, None).await.unwrap();
        force_status(&f.pool, article.id, ArticleStatus::PendingReview).await;

        let result = f
            .service
            .update_content(article.id, &f.editor, edit_content("cambio"), None)
            .await;
        assert!(matches!(result, Err(ArticleServiceError::Locked(_))));
    }

    #[tokio::test]
    async fn test_published_edit_requires_editor() {
        let f = fixture().await;
        let article = f.service.create_draft(draft("Merengue"), &f.author, None).await.unwrap();
        force_status(&f.pool, article.id, ArticleStatus::Published).await;

        let result = f
            .service
            .update_content(article.id, &f.author, edit_content("cambio"), None)
            .await;
        assert!(matches!(result, Err(ArticleServiceError::Forbidden(_))));

        let updated = f
            .service
            .update_content(article.id, &f.editor, edit_content("fe de erratas"), None)
            .await
            .unwrap();
        assert_eq!(updated.status, ArticleStatus::Published);
    }

    #[tokio::test]
    async fn test_editing_approved_returns_to_draft() {
        let f = fixture().await;
        let article = f.service.create_draft(draft("Merengue"), &f.author, None).await.unwrap();
        force_status(&f.pool, article.id, ArticleStatus::Approved).await;

        let updated = f
            .service
            .update_content(article.id, &f.author, edit_content("cambio tardío"), None)
            .await
            .unwrap();
        assert_eq!(updated.status, ArticleStatus::Draft);
    }

    #[tokio::test]
    async fn test_unchanged_edit_is_noop() {
        let f = fixture().await;
        let article = f.service.create_draft(draft("Merengue"), &f.author, None).await.unwrap();

        let same = f
            .service
            .update_content(article.id, &f.author, edit_content(&article.content), None)
            .await
            .unwrap();
        assert_eq!(same.current_version, 1);
    }

    #[tokio::test]
    async fn test_published_lookup_and_cache_invalidation() {
        let f = fixture().await;
        let article = f.service.create_draft(draft("Merengue"), &f.author, None).await.unwrap();

        let hidden = f.service.get_published_by_slug("merengue").await;
        assert!(matches!(hidden, Err(ArticleServiceError::NotFound(_))));

        force_status(&f.pool, article.id, ArticleStatus::Published).await;
        let public = f.service.get_published_by_slug("merengue").await.unwrap();
        assert_eq!(public.content, article.content);

        f.service
            .update_content(article.id, &f.editor, edit_content("fe de erratas"), None)
            .await
            .unwrap();
        let refreshed = f.service.get_published_by_slug("merengue").await.unwrap();
        assert_eq!(refreshed.content, "fe de erratas");
    }

    #[tokio::test]
    async fn test_list_published_only_returns_published() {
        let f = fixture().await;
        let a = f.service.create_draft(draft("Uno"), &f.author, None).await.unwrap();
        f.service.create_draft(draft("Dos"), &f.author, None).await.unwrap();
        force_status(&f.pool, a.id, ArticleStatus::Published).await;

        let page = f.service.list_published(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, a.id);

        let all = f
            .service
            .list(&ArticleFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn slug_is_url_safe(title in "\\PC{0,120}") {
                let slug = generate_slug(&title);
                prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
                prop_assert!(!slug.starts_with('-'));
                prop_assert!(!slug.ends_with('-'));
                prop_assert!(!slug.contains("--"));
                prop_assert!(slug.len() <= MAX_SLUG_LENGTH);
            }

            #[test]
            fn slug_is_idempotent(title in "[a-zA-ZáéíóúñÑ ]{0,60}") {
                let slug = generate_slug(&title);
                prop_assert_eq!(generate_slug(&slug), slug.clone());
            }
        }
    }
}
