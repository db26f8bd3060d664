pub mod convergence;
pub mod models;
pub mod repos;
pub mod schema;

use std::path::Path;

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;

use crate::error::AppError;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Pragmas applied to every new physical connection, in order: WAL
/// journaling (concurrent readers during a write), relaxed-but-crash-safe
/// durability, and a 30 s busy wait instead of immediate lock failure.
const CONNECTION_PRAGMAS: &[&str] = &[
    "PRAGMA journal_mode = WAL",
    "PRAGMA synchronous = NORMAL",
    "PRAGMA busy_timeout = 30000",
];

/// Connection customizer that tunes per-connection SQLite pragmas.
#[derive(Debug)]
struct SqlitePragmaCustomizer;

impl CustomizeConnection<rusqlite::Connection, rusqlite::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        // A connection with degraded concurrency guarantees still beats a
        // pool that refuses to hand out connections, so failures only warn
        // and the remaining pragmas are still attempted.
        for pragma in CONNECTION_PRAGMAS {
            if let Err(e) = conn.execute_batch(pragma) {
                tracing::warn!("Could not apply {}: {}", pragma, e);
            }
        }
        Ok(())
    }
}

/// Initialize the database: create the file, build the tuned pool, create
/// base tables, then converge the settings schema.
pub fn init_db(database_path: &Path) -> Result<DbPool, AppError> {
    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!(path = %database_path.display(), "Initializing database");

    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(8)
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    {
        let mut conn = pool.get()?;
        schema::create_all(&conn)?;
        convergence::converge(&mut conn)?;
    }

    tracing::info!("Database initialized successfully");
    Ok(pool)
}

#[cfg(test)]
pub fn init_test_db() -> Result<DbPool, AppError> {
    use std::time::Duration;

    // Unique temp file per test; in-memory databases do not support WAL and
    // do not share state across pool connections.
    let tmp = std::env::temp_dir().join(format!("slideforge_test_{}.db", uuid::Uuid::new_v4()));
    let manager = SqliteConnectionManager::file(&tmp);
    let pool = Pool::builder()
        .max_size(2)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    let mut conn = pool.get()?;
    schema::create_all(&conn)?;
    convergence::converge(&mut conn)?;
    drop(conn);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuned_connection_reads_back_pragmas() {
        let pool = init_test_db().unwrap();
        let conn = pool.get().unwrap();

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");

        let busy_timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(busy_timeout, 30_000);

        let synchronous: i64 = conn
            .query_row("PRAGMA synchronous", [], |row| row.get(0))
            .unwrap();
        assert_eq!(synchronous, 1); // NORMAL
    }

    #[test]
    fn pragmas_survive_redundant_acquires() {
        let pool = init_test_db().unwrap();
        for _ in 0..5 {
            let conn = pool.get().unwrap();
            let busy_timeout: i64 = conn
                .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
                .unwrap();
            assert_eq!(busy_timeout, 30_000);
        }
    }
}
