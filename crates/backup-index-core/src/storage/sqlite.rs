use rusqlite::{Connection, Result};
use std::path::Path;
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA busy_timeout = 5000;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 5s busy timeout)");
        Ok(())
    }

    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            debug!(
                "Schema version {} < {}, applying resource schema",
                version, SCHEMA_VERSION
            );
            self.conn.execute_batch(include_str!("schema.sql"))?;
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Empty the index. Resources are re-registered by the next scan.
    pub fn truncate_all(&self) -> Result<()> {
        self.conn.execute_batch("DELETE FROM resource;")?;
        debug!("Resource index flushed");
        Ok(())
    }
}
