//! Database repositories
//!
//! One repository per table group. Services hold them as `Arc<dyn ...>` so
//! tests can run against an in-memory SQLite pool.

pub mod admin_user;
pub mod article;
pub mod audit_log;
pub mod editorial_comment;
pub mod session;
pub mod taxonomy;
pub mod version;

pub use admin_user::{AdminUserRepository, SqlxAdminUserRepository};
pub use article::{
    ArticleRepository, ContentUpdate, NewArticle, SqlxArticleRepository, StatusChange,
};
pub use audit_log::{AuditLogRepository, SqlxAuditLogRepository};
pub use editorial_comment::{EditorialCommentRepository, SqlxEditorialCommentRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use taxonomy::{SqlxTaxonomyRepository, TaxonomyRepository};
pub use version::{SqlxVersionRepository, VersionRepository};
