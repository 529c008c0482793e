//! Cache layer
//!
//! Read-through cache for the public article endpoints. Published articles
//! and listing pages are cached under the `articles:` prefix; every workflow
//! transition or content edit drops the whole prefix.
//!
//! # Usage
//!
//! ```rust,ignore
//! use safra_report::cache::{create_cache, CacheLayer};
//! use safra_report::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// Generic over the stored type, so it is used through concrete types
/// rather than as `dyn CacheLayer`.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all keys matching a glob pattern
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Shared cache handle
pub type Cache = Arc<MemoryCache>;

/// Pattern covering every public article entry
pub const ARTICLES_PATTERN: &str = "articles:*";

/// Key of a published article looked up by slug
pub fn article_slug_key(slug: &str) -> String {
    format!("articles:slug:{}", slug)
}

/// Key of one page of the published listing
pub fn published_page_key(page: u32, per_page: u32) -> String {
    format!("articles:published:{}:{}", page, per_page)
}

pub fn create_cache(config: &CacheConfig) -> Cache {
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.capacity,
        Duration::from_secs(config.ttl_seconds),
    ))
}
