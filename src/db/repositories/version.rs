//! Article version repository
//!
//! Read access to `article_versions`. Versions are written by
//! [`super::ArticleRepository`] in the same transaction as the article edit.

use crate::db::{DatabasePool, DynDatabasePool};
use crate::models::{ArticleVersion, VersionSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Versions of an article, newest first
    async fn list(&self, article_id: i64) -> Result<Vec<VersionSummary>>;

    async fn get(&self, article_id: i64, version_number: i64) -> Result<Option<ArticleVersion>>;

    async fn exists(&self, article_id: i64, version_number: i64) -> Result<bool>;
}

pub struct SqlxVersionRepository {
    pool: DynDatabasePool,
}

impl SqlxVersionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VersionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VersionRepository for SqlxVersionRepository {
    async fn list(&self, article_id: i64) -> Result<Vec<VersionSummary>> {
        let versions = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, VersionSummary>(
                r#"
                SELECT v.version_number, v.title, v.change_summary, v.created_by,
                       u.username AS created_by_username, v.created_at
                FROM article_versions v
                LEFT JOIN admin_users u ON u.id = v.created_by
                WHERE v.article_id = $1
                ORDER BY v.version_number DESC
                "#,
            )
            .bind(article_id)
            .fetch_all(p)
            .await
        })
        .context("Failed to list article versions")?;

        Ok(versions)
    }

    async fn get(&self, article_id: i64, version_number: i64) -> Result<Option<ArticleVersion>> {
        let version = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, ArticleVersion>(
                r#"
                SELECT id, article_id, version_number, title, excerpt, content,
                       change_summary, created_by, created_at
                FROM article_versions
                WHERE article_id = $1 AND version_number = $2
                "#,
            )
            .bind(article_id)
            .bind(version_number)
            .fetch_optional(p)
            .await
        })
        .context("Failed to get article version")?;

        Ok(version)
    }

    async fn exists(&self, article_id: i64, version_number: i64) -> Result<bool> {
        let (count,) = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, (i64,)>(
                "SELECT COUNT(*) FROM article_versions WHERE article_id = $1 AND version_number = $2",
            )
            .bind(article_id)
            .bind(version_number)
            .fetch_one(p)
            .await
        })
        .context("Failed to check article version")?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        AdminUserRepository, ArticleRepository, ContentUpdate, NewArticle,
        SqlxAdminUserRepository, SqlxArticleRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{AdminRole, AdminUser, NewVersion};

    #[tokio::test]
    async fn test_list_and_get_versions() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let author = SqlxAdminUserRepository::new(pool.clone())
            .create(&AdminUser::new(
                "cronista".to_string(),
                "cronista@safrareport.com".to_string(),
                "hash".to_string(),
                AdminRole::Author,
            ))
            .await
            .unwrap();

        let articles = SqlxArticleRepository::new(pool.clone());
        let article = articles
            .create(&NewArticle {
                slug: "carnaval-la-vega".to_string(),
                title: "Carnaval de La Vega".to_string(),
                excerpt: None,
                content: "Diablos cojuelos".to_string(),
                content_html: "<p>Diablos cojuelos</p>".to_string(),
                author_id: author.id,
                category_id: None,
                province_id: None,
                change_summary: "Initial draft".to_string(),
            })
            .await
            .unwrap();

        articles
            .update_content(
                article.id,
                &ContentUpdate {
                    title: article.title.clone(),
                    excerpt: None,
                    content: "Diablos cojuelos y máscaras".to_string(),
                    content_html: "<p>Diablos cojuelos y máscaras</p>".to_string(),
                    category_id: None,
                    province_id: None,
                    expected_status: article.status,
                    expected_version: 1,
                    status: article.status,
                    new_version: Some(NewVersion {
                        change_summary: Some("Más detalle".to_string()),
                        created_by: author.id,
                        retain: 50,
                    }),
                },
            )
            .await
            .unwrap()
            .unwrap();

        let repo = SqlxVersionRepository::new(pool);
        let versions = repo.list(article.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version_number, 2);
        assert_eq!(versions[0].created_by_username.as_deref(), Some("cronista"));
        assert_eq!(versions[1].change_summary.as_deref(), Some("Initial draft"));

        let v1 = repo.get(article.id, 1).await.unwrap().unwrap();
        assert_eq!(v1.content, "Diablos cojuelos");
        assert!(repo.get(article.id, 3).await.unwrap().is_none());
        assert!(repo.exists(article.id, 2).await.unwrap());
        assert!(!repo.exists(article.id, 9).await.unwrap());
    }
}
