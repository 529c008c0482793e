//! Database layer
//!
//! Storage for the editorial backend. Two drivers are supported:
//! - SQLite (default, single-binary deployments and the test suite)
//! - PostgreSQL (production newsroom)
//!
//! Queries are written once with `$N` placeholders, which both drivers accept,
//! and dispatched through [`on_backend!`] to whichever pool is configured.
//!
//! # Usage
//!
//! ```ignore
//! use safra_report::config::DatabaseConfig;
//! use safra_report::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

/// Run `$body` with `$p` bound to the concrete sqlx pool.
///
/// The body is compiled once per driver, so generic sqlx calls
/// (`query_as::<_, Row>`, `begin()`) resolve to the right database types.
/// It runs inside an async block: `?` and `return` stay local to it.
macro_rules! on_backend {
    ($pool:expr, |$p:ident| $body:expr) => {
        match $pool.backend() {
            $crate::db::Backend::Sqlite($p) => async { $body }.await,
            $crate::db::Backend::Postgres($p) => async { $body }.await,
        }
    };
}

/// Bind a slice of [`SqlParam`] onto a query in order.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                $crate::db::SqlParam::Int(v) => query.bind(*v),
                $crate::db::SqlParam::Text(v) => query.bind(v.as_str()),
            };
        }
        query
    }};
}

/// Value for a dynamically built `WHERE` clause
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
}

/// Accumulates `AND`-joined conditions with `$N` placeholders
#[derive(Debug, Default)]
pub struct Conditions {
    clauses: Vec<String>,
    params: Vec<SqlParam>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition; `{}` in `template` is replaced with the placeholder
    pub fn push(&mut self, template: &str, param: SqlParam) {
        self.params.push(param);
        let placeholder = format!("${}", self.params.len());
        self.clauses.push(template.replace("{}", &placeholder));
    }

    /// `WHERE ...` or an empty string
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Placeholder number the next extra parameter (e.g. LIMIT) should use
    pub fn next_index(&self) -> usize {
        self.params.len() + 1
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }
}

pub mod migrations;
pub mod pool;
pub mod repositories;


pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, PostgresDatabase,
    SqliteDatabase,
};
