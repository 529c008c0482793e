//! Services layer - Business logic
//!
//! This module contains the editorial rules of SafraReport.
//! Services are responsible for:
//! - Enforcing who may do what to an article, and when
//! - Coordinating between repositories, the cache and the audit log
//! - Handling validation and error cases

pub mod article;
pub mod audit;
pub mod auth;
pub mod db_error;
pub mod editorial_comment;
pub mod markdown;
pub mod password;
pub mod rate_limiter;
pub mod version;
pub mod workflow;

pub use article::{generate_slug, ArticleService, ArticleServiceError};
pub use audit::AuditService;
pub use auth::{AuthError, AuthService, LoginInput};
pub use db_error::{classify_database_error, DbErrorInfo, DbErrorKind};
pub use editorial_comment::{CommentError, EditorialCommentService};
pub use markdown::MarkdownRenderer;
pub use password::{hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use version::{diff_lines, VersionError, VersionService};
pub use workflow::{target_status, EditorialPolicy, WorkflowError, WorkflowService};
