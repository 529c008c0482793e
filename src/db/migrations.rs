//! Database migrations module
//!
//! Schema migrations are embedded in the binary as SQL strings, one variant
//! per driver. Applied versions are tracked in `_migrations`.
//!
//! # Usage
//!
//! ```ignore
//! use safra_report::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::{DatabasePool, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and PostgreSQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i64,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for PostgreSQL
    pub up_postgres: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_admin_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                first_name VARCHAR(100),
                last_name VARCHAR(100),
                role VARCHAR(20) NOT NULL DEFAULT 'author'
                    CHECK (role IN ('admin', 'editor', 'author')),
                is_active BOOLEAN NOT NULL DEFAULT 1,
                last_login_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                admin_user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (admin_user_id) REFERENCES admin_users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_admin_user_id ON sessions(admin_user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id BIGSERIAL PRIMARY KEY,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                first_name VARCHAR(100),
                last_name VARCHAR(100),
                role VARCHAR(20) NOT NULL DEFAULT 'author'
                    CHECK (role IN ('admin', 'editor', 'author')),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                last_login_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                admin_user_id BIGINT NOT NULL REFERENCES admin_users(id) ON DELETE CASCADE,
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_admin_user_id ON sessions(admin_user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    // Reader accounts for the public site. No endpoint manages them yet.
    Migration {
        version: 2,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255),
                first_name VARCHAR(100),
                last_name VARCHAR(100),
                profile_image_url TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255),
                first_name VARCHAR(100),
                last_name VARCHAR(100),
                profile_image_url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#,
    },
    Migration {
        version: 3,
        name: "create_taxonomy",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(100) NOT NULL UNIQUE,
                icon VARCHAR(50),
                description TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS provinces (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(100) NOT NULL UNIQUE
            )
        "#,
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(100) NOT NULL UNIQUE,
                icon VARCHAR(50),
                description TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE TABLE IF NOT EXISTS provinces (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(100) NOT NULL UNIQUE
            )
        "#,
    },
    Migration {
        version: 4,
        name: "create_articles",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                excerpt TEXT,
                content TEXT NOT NULL,
                content_html TEXT NOT NULL,
                author_id INTEGER NOT NULL,
                category_id INTEGER,
                province_id INTEGER,
                status VARCHAR(20) NOT NULL DEFAULT 'draft'
                    CHECK (status IN ('draft', 'pending_review', 'approved', 'needs_changes', 'rejected', 'published')),
                current_version INTEGER NOT NULL DEFAULT 1,
                submitted_at TIMESTAMP,
                reviewed_by INTEGER,
                reviewed_at TIMESTAMP,
                review_notes TEXT,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES admin_users(id),
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
                FOREIGN KEY (province_id) REFERENCES provinces(id) ON DELETE SET NULL,
                FOREIGN KEY (reviewed_by) REFERENCES admin_users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status);
            CREATE INDEX IF NOT EXISTS idx_articles_author_id ON articles(author_id);
            CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);
        "#,
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id BIGSERIAL PRIMARY KEY,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                excerpt TEXT,
                content TEXT NOT NULL,
                content_html TEXT NOT NULL,
                author_id BIGINT NOT NULL REFERENCES admin_users(id),
                category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL,
                province_id BIGINT REFERENCES provinces(id) ON DELETE SET NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft'
                    CHECK (status IN ('draft', 'pending_review', 'approved', 'needs_changes', 'rejected', 'published')),
                current_version BIGINT NOT NULL DEFAULT 1,
                submitted_at TIMESTAMPTZ,
                reviewed_by BIGINT REFERENCES admin_users(id) ON DELETE SET NULL,
                reviewed_at TIMESTAMPTZ,
                review_notes TEXT,
                published_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status);
            CREATE INDEX IF NOT EXISTS idx_articles_author_id ON articles(author_id);
            CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);
        "#,
    },
    Migration {
        version: 5,
        name: "create_article_versions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS article_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                version_number INTEGER NOT NULL,
                title VARCHAR(255) NOT NULL,
                excerpt TEXT,
                content TEXT NOT NULL,
                change_summary TEXT,
                created_by INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (article_id, version_number),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (created_by) REFERENCES admin_users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_article_versions_article_id ON article_versions(article_id);
        "#,
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS article_versions (
                id BIGSERIAL PRIMARY KEY,
                article_id BIGINT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
                version_number BIGINT NOT NULL,
                title VARCHAR(255) NOT NULL,
                excerpt TEXT,
                content TEXT NOT NULL,
                change_summary TEXT,
                created_by BIGINT REFERENCES admin_users(id) ON DELETE SET NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (article_id, version_number)
            );
            CREATE INDEX IF NOT EXISTS idx_article_versions_article_id ON article_versions(article_id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_editorial_comments",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS editorial_comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                parent_id INTEGER,
                author_id INTEGER NOT NULL,
                version_number INTEGER,
                kind VARCHAR(20) NOT NULL DEFAULT 'general'
                    CHECK (kind IN ('general', 'review')),
                body TEXT NOT NULL,
                is_resolved BOOLEAN NOT NULL DEFAULT 0,
                resolved_by INTEGER,
                resolved_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (parent_id) REFERENCES editorial_comments(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES admin_users(id) ON DELETE CASCADE,
                FOREIGN KEY (resolved_by) REFERENCES admin_users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_editorial_comments_article_id ON editorial_comments(article_id);
            CREATE INDEX IF NOT EXISTS idx_editorial_comments_parent_id ON editorial_comments(parent_id);
        "#,
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS editorial_comments (
                id BIGSERIAL PRIMARY KEY,
                article_id BIGINT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
                parent_id BIGINT REFERENCES editorial_comments(id) ON DELETE CASCADE,
                author_id BIGINT NOT NULL REFERENCES admin_users(id) ON DELETE CASCADE,
                version_number BIGINT,
                kind VARCHAR(20) NOT NULL DEFAULT 'general'
                    CHECK (kind IN ('general', 'review')),
                body TEXT NOT NULL,
                is_resolved BOOLEAN NOT NULL DEFAULT FALSE,
                resolved_by BIGINT REFERENCES admin_users(id) ON DELETE SET NULL,
                resolved_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_editorial_comments_article_id ON editorial_comments(article_id);
            CREATE INDEX IF NOT EXISTS idx_editorial_comments_parent_id ON editorial_comments(parent_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_audit_logs",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS audit_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                admin_user_id INTEGER,
                action VARCHAR(100) NOT NULL,
                entity_type VARCHAR(50) NOT NULL,
                entity_id INTEGER,
                details TEXT,
                ip_address VARCHAR(64),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (admin_user_id) REFERENCES admin_users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audit_logs_entity ON audit_logs(entity_type, entity_id);
            CREATE INDEX IF NOT EXISTS idx_audit_logs_created_at ON audit_logs(created_at);
        "#,
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS audit_logs (
                id BIGSERIAL PRIMARY KEY,
                admin_user_id BIGINT REFERENCES admin_users(id) ON DELETE SET NULL,
                action VARCHAR(100) NOT NULL,
                entity_type VARCHAR(50) NOT NULL,
                entity_id BIGINT,
                details TEXT,
                ip_address VARCHAR(64),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_audit_logs_entity ON audit_logs(entity_type, entity_id);
            CREATE INDEX IF NOT EXISTS idx_audit_logs_created_at ON audit_logs(created_at);
        "#,
    },
    // Classifieds, business directory and reviews. Schema only for now.
    Migration {
        version: 8,
        name: "create_marketplace",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS classifieds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT NOT NULL,
                price NUMERIC(12, 2),
                currency VARCHAR(3) NOT NULL DEFAULT 'DOP',
                category_id INTEGER,
                province_id INTEGER,
                contact_name VARCHAR(100),
                contact_phone VARCHAR(30),
                contact_email VARCHAR(255),
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                expires_at TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
                FOREIGN KEY (province_id) REFERENCES provinces(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS businesses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT,
                category_id INTEGER,
                province_id INTEGER,
                address TEXT,
                phone VARCHAR(30),
                email VARCHAR(255),
                website TEXT,
                average_rating NUMERIC(3, 2) NOT NULL DEFAULT 0,
                total_reviews INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
                FOREIGN KEY (province_id) REFERENCES provinces(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                business_id INTEGER NOT NULL,
                reviewer_name VARCHAR(100) NOT NULL,
                reviewer_email VARCHAR(255),
                rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                title VARCHAR(255),
                content TEXT,
                is_approved BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (business_id) REFERENCES businesses(id) ON DELETE CASCADE
            )
        "#,
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS classifieds (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT NOT NULL,
                price NUMERIC(12, 2),
                currency VARCHAR(3) NOT NULL DEFAULT 'DOP',
                category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL,
                province_id BIGINT REFERENCES provinces(id) ON DELETE SET NULL,
                contact_name VARCHAR(100),
                contact_phone VARCHAR(30),
                contact_email VARCHAR(255),
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ
            );
            CREATE TABLE IF NOT EXISTS businesses (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT,
                category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL,
                province_id BIGINT REFERENCES provinces(id) ON DELETE SET NULL,
                address TEXT,
                phone VARCHAR(30),
                email VARCHAR(255),
                website TEXT,
                average_rating NUMERIC(3, 2) NOT NULL DEFAULT 0,
                total_reviews BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE TABLE IF NOT EXISTS reviews (
                id BIGSERIAL PRIMARY KEY,
                business_id BIGINT NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
                reviewer_name VARCHAR(100) NOT NULL,
                reviewer_email VARCHAR(255),
                rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                title VARCHAR(255),
                content TEXT,
                is_approved BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#,
    },
    Migration {
        version: 9,
        name: "seed_provinces",
        up_sqlite: SEED_PROVINCES,
        up_postgres: SEED_PROVINCES,
    },
    Migration {
        version: 10,
        name: "seed_categories",
        up_sqlite: SEED_CATEGORIES,
        up_postgres: SEED_CATEGORIES,
    },
];

// 31 provinces plus the Distrito Nacional
const SEED_PROVINCES: &str = r#"
    INSERT INTO provinces (name, slug) VALUES
        ('Distrito Nacional', 'distrito-nacional'),
        ('Azua', 'azua'),
        ('Bahoruco', 'bahoruco'),
        ('Barahona', 'barahona'),
        ('Dajabón', 'dajabon'),
        ('Duarte', 'duarte'),
        ('El Seibo', 'el-seibo'),
        ('Elías Piña', 'elias-pina'),
        ('Espaillat', 'espaillat'),
        ('Hato Mayor', 'hato-mayor'),
        ('Hermanas Mirabal', 'hermanas-mirabal'),
        ('Independencia', 'independencia'),
        ('La Altagracia', 'la-altagracia'),
        ('La Romana', 'la-romana'),
        ('La Vega', 'la-vega'),
        ('María Trinidad Sánchez', 'maria-trinidad-sanchez'),
        ('Monseñor Nouel', 'monsenor-nouel'),
        ('Monte Cristi', 'monte-cristi'),
        ('Monte Plata', 'monte-plata'),
        ('Pedernales', 'pedernales'),
        ('Peravia', 'peravia'),
        ('Puerto Plata', 'puerto-plata'),
        ('Samaná', 'samana'),
        ('San Cristóbal', 'san-cristobal'),
        ('San José de Ocoa', 'san-jose-de-ocoa'),
        ('San Juan', 'san-juan'),
        ('San Pedro de Macorís', 'san-pedro-de-macoris'),
        ('Sánchez Ramírez', 'sanchez-ramirez'),
        ('Santiago', 'santiago'),
        ('Santiago Rodríguez', 'santiago-rodriguez'),
        ('Santo Domingo', 'santo-domingo'),
        ('Valverde', 'valverde')
"#;

const SEED_CATEGORIES: &str = r#"
    INSERT INTO categories (name, slug, icon, description) VALUES
        ('Nacionales', 'nacionales', 'flag', 'Noticias de la República Dominicana'),
        ('Internacionales', 'internacionales', 'globe', 'Noticias del mundo'),
        ('Economía', 'economia', 'trending-up', 'Negocios, finanzas y mercados'),
        ('Deportes', 'deportes', 'trophy', 'Béisbol, baloncesto y más'),
        ('Turismo', 'turismo', 'palm-tree', 'Destinos y viajes'),
        ('Cultura', 'cultura', 'music', 'Arte, música y tradiciones'),
        ('Tecnología', 'tecnologia', 'cpu', 'Innovación y tecnología'),
        ('Salud', 'salud', 'heart', 'Salud y bienestar'),
        ('Opinión', 'opinion', 'message-square', 'Columnas y editoriales')
"#;

/// Run all pending migrations
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i64> = applied.iter().map(|m| m.version).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Postgres => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Get list of already applied migrations
async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    let records = on_backend!(pool, |p| {
        sqlx::query_as::<_, MigrationRecord>(
            "SELECT version, name, applied_at FROM _migrations ORDER BY version",
        )
        .fetch_all(p)
        .await
    })
    .context("Failed to read applied migrations")?;

    Ok(records)
}

/// Apply a single migration inside a transaction
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Postgres => migration.up_postgres,
    };
    let applied_at = Utc::now();

    on_backend!(pool, |p| {
        let mut tx = p.begin().await?;

        for statement in split_sql_statements(sql) {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }

        sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES ($1, $2, $3)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(applied_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok::<_, anyhow::Error>(())
    })
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

/// Get migration by version
pub fn get_migration(version: i64) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}
