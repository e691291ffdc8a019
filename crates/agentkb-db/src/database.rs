//! The agentkb store: agents, documents, ingestion runs and the chunk index
//! share one SQLite database behind an r2d2 pool.

use crate::error::{DbError, DbResult};
use crate::migrations;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Readers (queries, `ask`) plus the ingestion workers writing chunks.
const FILE_POOL_SIZE: u32 = 10;

/// Ingestion workers write concurrently; writers queue on the lock for up
/// to `busy_timeout` ms instead of failing with `SQLITE_BUSY`.
const FILE_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
    PRAGMA cache_size = -64000;
";

/// Handle to the store. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (or create) the store at `path`, creating missing parent
    /// directories and bringing the schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening knowledge base store at {}", path.display());

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch(FILE_PRAGMAS));
        Self::with_manager(manager, FILE_POOL_SIZE)
    }

    /// A private in-memory store. Every pooled connection would see its own
    /// empty database, so the pool holds exactly one.
    pub fn open_in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        Self::with_manager(manager, 1)
    }

    fn with_manager(manager: SqliteConnectionManager, size: u32) -> DbResult<Self> {
        let pool = Pool::builder().max_size(size).build(manager)?;
        migrate(&*pool.get()?)?;
        Ok(Self { pool })
    }

    pub fn conn(&self) -> DbResult<PooledConn> {
        self.pool.get().map_err(DbError::from)
    }
}

fn migrate(conn: &Connection) -> DbResult<()> {
    migrations::initialize_schema(conn)?;
    debug!("Schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pragma(db: &Database, name: &str) -> String {
        let conn = db.conn().unwrap();
        conn.query_row(&format!("PRAGMA {}", name), [], |row| {
            row.get::<_, rusqlite::types::Value>(0)
        })
        .map(|value| match value {
            rusqlite::types::Value::Integer(i) => i.to_string(),
            rusqlite::types::Value::Text(s) => s,
            other => format!("{:?}", other),
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_enforces_foreign_keys() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(pragma(&db, "foreign_keys"), "1");
    }

    #[test]
    fn test_file_store_is_ready_for_concurrent_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agentkb.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(pragma(&db, "journal_mode"), "wal");
        assert_eq!(pragma(&db, "busy_timeout"), "5000");
        assert_eq!(pragma(&db, "foreign_keys"), "1");
    }

    #[test]
    fn test_reopen_keeps_schema_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentkb.db");

        let agent = agentkb_core::Agent::new("acme", "You are the Acme assistant.").unwrap();
        Database::open(&path).unwrap().create_agent(&agent).unwrap();

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_agent(&agent.id).unwrap().name, "acme");
    }
}
