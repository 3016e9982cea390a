use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::config::DatabaseConfig;

/// Opens the pool with the per-connection pragmas the schema relies on.
///
/// `foreign_keys` is a per-connection setting in SQLite; without it the
/// cascading deletes below silently do nothing.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&cfg.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(10));
    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// In-memory pool for tests; a single connection so every query sees the same database.
pub async fn connect_in_memory() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    init_db(&pool).await?;
    Ok(pool)
}

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    // Cascades depend on this - fail if it doesn't work
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS years (
            id TEXT PRIMARY KEY,
            level TEXT NOT NULL CHECK (level IN ('ELEMENTARY','MIDDLE','HIGH')),
            year_number INTEGER NOT NULL CHECK (year_number BETWEEN 1 AND 12),
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            UNIQUE (level, year_number)
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS classes (
            id TEXT PRIMARY KEY,
            year_id TEXT NOT NULL,
            name TEXT NOT NULL,
            section TEXT NOT NULL DEFAULT '',
            capacity INTEGER NOT NULL,
            room_number TEXT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            FOREIGN KEY(year_id) REFERENCES years(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            date_of_birth TEXT NOT NULL,
            gender TEXT NULL,
            enrollment_no TEXT NOT NULL UNIQUE,
            email TEXT NULL,
            phone TEXT NULL,
            guardian_name TEXT NOT NULL,
            guardian_phone TEXT NOT NULL,
            address TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            FOREIGN KEY(class_id) REFERENCES classes(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            year_id TEXT NOT NULL,
            title TEXT NOT NULL,
            author TEXT NULL,
            isbn TEXT NULL,
            subject TEXT NULL,
            publisher TEXT NULL,
            published_year INTEGER NULL,
            edition TEXT NULL,
            total_quantity INTEGER NOT NULL DEFAULT 0,
            available_qty INTEGER NOT NULL DEFAULT 0,
            issued_qty INTEGER NOT NULL DEFAULT 0,
            description TEXT NULL,
            cover_image TEXT NULL,
            cover_image_public_id TEXT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            FOREIGN KEY(year_id) REFERENCES years(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS book_distributions (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            book_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING'
                CHECK (status IN ('PENDING','RECEIVED','NOT_RECEIVED')),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            UNIQUE (student_id, book_id),
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE,
            FOREIGN KEY(book_id) REFERENCES books(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_classes_year", "CREATE INDEX IF NOT EXISTS idx_classes_year ON classes(year_id)"),
        ("idx_students_class", "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)"),
        ("idx_books_year", "CREATE INDEX IF NOT EXISTS idx_books_year ON books(year_id)"),
        ("idx_books_created", "CREATE INDEX IF NOT EXISTS idx_books_created ON books(created_at DESC)"),
        ("idx_students_created", "CREATE INDEX IF NOT EXISTS idx_students_created ON students(created_at DESC)"),
        ("idx_distributions_book", "CREATE INDEX IF NOT EXISTS idx_distributions_book ON book_distributions(book_id)"),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            match &e {
                sqlx::Error::Database(db_err) => {
                    let msg = db_err.message().to_lowercase();
                    if msg.contains("already exists") || msg.contains("duplicate") {
                        tracing::debug!("Index {} already exists, skipping", name);
                    } else {
                        tracing::warn!("Failed to create index {}: {}", name, e);
                    }
                }
                _ => {
                    tracing::warn!("Failed to create index {}: {}", name, e);
                }
            }
        }
    }

    Ok(())
}
