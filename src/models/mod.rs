//! Data models
//!
//! Entities of the editorial backend and the request/response types built
//! around them:
//! - Staff accounts and sessions (AdminUser, Session)
//! - Articles and their workflow vocabulary (Article, ArticleStatus, ReviewAction)
//! - Version history (ArticleVersion, VersionComparison)
//! - Newsroom collaboration (EditorialComment, CommentThread)
//! - Audit trail (AuditLog)
//! - Taxonomy (Category, Province)

mod admin_user;
mod article;
mod audit_log;
mod editorial_comment;
mod session;
mod taxonomy;
mod version;
mod workflow;

pub use admin_user::{AdminRole, AdminUser, CreateAdminUserInput, UpdateAdminUserInput};
pub use article::{
    Article, ArticleFilter, ArticleStatus, CreateArticleInput, ListParams, PagedResult,
    UpdateArticleInput,
};
pub use audit_log::{AuditLog, AuditLogQuery, NewAuditLog};
pub use editorial_comment::{
    build_threads, CommentKind, CommentThread, CreateEditorialCommentInput, EditorialComment,
    NewEditorialComment,
};
pub use session::Session;
pub use taxonomy::{Category, Province};
pub use version::{ArticleVersion, DiffKind, DiffLine, NewVersion, VersionComparison, VersionSummary};
pub use workflow::{ReviewAction, StatusCount};
