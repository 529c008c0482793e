//! Database error classification
//!
//! Turns driver errors buried in an `anyhow` chain into a small, stable
//! vocabulary the API can map to status codes. sqlx's own error kinds are
//! used first; the driver message is pattern-matched when they are not
//! available (SQLite reports most constraint failures as plain text).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::error::ErrorKind;

/// Kind of database failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DbErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    CheckViolation,
    Connection,
    Other,
}

/// Classified database error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbErrorInfo {
    pub kind: DbErrorKind,
    /// Constraint or column named by the driver, e.g. `articles.slug`
    pub target: Option<String>,
}

static SQLITE_UNIQUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"UNIQUE constraint failed: ([\w.]+)").unwrap());
static SQLITE_NOT_NULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"NOT NULL constraint failed: ([\w.]+)").unwrap());
static SQLITE_CHECK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CHECK constraint failed: ?(\w+)?").unwrap());
static PG_CONSTRAINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"constraint "([^"]+)""#).unwrap());
static PG_NULL_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"null value in column "([^"]+)""#).unwrap());

/// Classify the first database error in `err`'s chain.
///
/// Returns `None` when the chain holds no database error at all.
pub fn classify_database_error(err: &anyhow::Error) -> Option<DbErrorInfo> {
    for cause in err.chain() {
        if let Some(sqlx_err) = cause.downcast_ref::<sqlx::Error>() {
            return Some(classify_sqlx(sqlx_err));
        }
    }
    None
}

fn classify_sqlx(err: &sqlx::Error) -> DbErrorInfo {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            let from_kind = match db_err.kind() {
                ErrorKind::UniqueViolation => Some(DbErrorKind::UniqueViolation),
                ErrorKind::ForeignKeyViolation => Some(DbErrorKind::ForeignKeyViolation),
                ErrorKind::NotNullViolation => Some(DbErrorKind::NotNullViolation),
                ErrorKind::CheckViolation => Some(DbErrorKind::CheckViolation),
                _ => None,
            };

            let mut info = classify_message(message);
            if let Some(kind) = from_kind {
                info.kind = kind;
            }
            if info.target.is_none() {
                info.target = db_err.constraint().map(str::to_string);
            }
            info
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => DbErrorInfo {
            kind: DbErrorKind::Connection,
            target: None,
        },
        other => classify_message(&other.to_string()),
    }
}

/// Pattern-match a raw driver message
pub fn classify_message(message: &str) -> DbErrorInfo {
    let capture = |re: &Regex| {
        re.captures(message)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };

    let lower = message.to_lowercase();
    let (kind, target) = if SQLITE_UNIQUE.is_match(message) {
        (DbErrorKind::UniqueViolation, capture(&SQLITE_UNIQUE))
    } else if lower.contains("duplicate key value") {
        (DbErrorKind::UniqueViolation, capture(&PG_CONSTRAINT))
    } else if lower.contains("foreign key constraint") {
        (DbErrorKind::ForeignKeyViolation, capture(&PG_CONSTRAINT))
    } else if SQLITE_NOT_NULL.is_match(message) {
        (DbErrorKind::NotNullViolation, capture(&SQLITE_NOT_NULL))
    } else if PG_NULL_COLUMN.is_match(message) {
        (DbErrorKind::NotNullViolation, capture(&PG_NULL_COLUMN))
    } else if SQLITE_CHECK.is_match(message) {
        (DbErrorKind::CheckViolation, capture(&SQLITE_CHECK))
    } else if lower.contains("check constraint") {
        (DbErrorKind::CheckViolation, capture(&PG_CONSTRAINT))
    } else if lower.contains("connection refused")
        || lower.contains("database is locked")
        || lower.contains("timed out")
    {
        (DbErrorKind::Connection, None)
    } else {
        (DbErrorKind::Other, None)
    };

    DbErrorInfo { kind, target }
}
