//! Database initialization and schema setup.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = include_str!("schema.sql");

/// Open (creating if needed) the SQLite database and apply the schema.
///
/// # Errors
/// Returns an error if the directory cannot be created, the connection fails,
/// or any schema statement fails.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_pragmas(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!(path = %db_path, "Database initialized");
    Ok(pool)
}

/// Statements of the embedded schema, in order.
fn schema_statements() -> impl Iterator<Item = &'static str> {
    SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
}

/// Apply the schema. Every statement is idempotent.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut applied = 0usize;
    for statement in schema_statements() {
        sqlx::query(statement).execute(pool).await?;
        applied += 1;
    }
    debug!(statements = applied, "Schema applied");
    Ok(())
}

async fn configure_pragmas(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    use sqlx::Row;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode returns the mode actually set
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    debug!(journal_mode = %journal_mode, "SQLite journal mode");

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    Ok(())
}
