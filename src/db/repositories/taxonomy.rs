//! Category and province lookups

use crate::db::{DatabasePool, DynDatabasePool};
use crate::models::{Category, Province};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn list_provinces(&self) -> Result<Vec<Province>>;

    async fn category_exists(&self, id: i64) -> Result<bool>;

    async fn province_exists(&self, id: i64) -> Result<bool>;
}

pub struct SqlxTaxonomyRepository {
    pool: DynDatabasePool,
}

impl SqlxTaxonomyRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TaxonomyRepository> {
        Arc::new(Self::new(pool))
    }

    async fn exists(&self, sql: &str, id: i64) -> Result<bool> {
        let (count,) = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, (i64,)>(sql).bind(id).fetch_one(p).await
        })?;
        Ok(count > 0)
    }
}

#[async_trait]
impl TaxonomyRepository for SqlxTaxonomyRepository {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, Category>(
                "SELECT id, name, slug, icon, description, created_at FROM categories ORDER BY name",
            )
            .fetch_all(p)
            .await
        })
        .context("Failed to list categories")?;

        Ok(categories)
    }

    async fn list_provinces(&self) -> Result<Vec<Province>> {
        let provinces = on_backend!(self.pool, |p| {
            sqlx::query_as::<_, Province>("SELECT id, name, slug FROM provinces ORDER BY name")
                .fetch_all(p)
                .await
        })
        .context("Failed to list provinces")?;

        Ok(provinces)
    }

    async fn category_exists(&self, id: i64) -> Result<bool> {
        self.exists("SELECT COUNT(*) FROM categories WHERE id = $1", id)
            .await
            .context("Failed to check category")
    }

    async fn province_exists(&self, id: i64) -> Result<bool> {
        self.exists("SELECT COUNT(*) FROM provinces WHERE id = $1", id)
            .await
            .context("Failed to check province")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxTaxonomyRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxTaxonomyRepository::new(pool)
    }

    #[tokio::test]
    async fn test_seeded_provinces() {
        let repo = setup().await;
        let provinces = repo.list_provinces().await.unwrap();
        assert_eq!(provinces.len(), 32);
        assert!(provinces.iter().any(|p| p.slug == "santiago"));
        assert!(provinces.iter().any(|p| p.slug == "distrito-nacional"));
    }

    #[tokio::test]
    async fn test_seeded_categories() {
        let repo = setup().await;
        let categories = repo.list_categories().await.unwrap();
        assert!(categories.iter().any(|c| c.slug == "deportes"));

        let id = categories[0].id;
        assert!(repo.category_exists(id).await.unwrap());
        assert!(!repo.category_exists(9999).await.unwrap());
        assert!(!repo.province_exists(9999).await.unwrap());
    }
}
