//! SQLite destination file.
//!
//! The destination is a throwaway bulk-load target: journaling, syncing and
//! foreign key checks are switched off before the table is created.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{CopyError, Result};

/// Bulk-load tuning applied to every destination connection.
///
/// `page_size` only takes effect before the first table exists.
const BULK_LOAD_PRAGMAS: &str = "
PRAGMA journal_mode = OFF;
PRAGMA synchronous = OFF;
PRAGMA cache_size = -64000;
PRAGMA temp_store = MEMORY;
PRAGMA automatic_index = OFF;
PRAGMA page_size = 4096;
PRAGMA mmap_size = 268435456;
PRAGMA foreign_keys = OFF;
PRAGMA wal_autocheckpoint = 0;
";

/// An open destination database.
///
/// Create with [`SqliteTarget::create`] for a file on disk or
/// [`SqliteTarget::in_memory`] for tests.
pub struct SqliteTarget {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteTarget {
    /// Create a fresh destination file at `path`.
    ///
    /// An existing file is an error unless `overwrite` is set, in which case
    /// it is removed first.
    pub fn create(path: &Path, overwrite: bool) -> Result<Self> {
        if path.exists() {
            if !overwrite {
                return Err(CopyError::Config(format!(
                    "output file '{}' already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            info!("Removing existing output file {}", path.display());
            std::fs::remove_file(path)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| CopyError::destination(e, format!("opening {}", path.display())))?;
        let target = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        target.apply_pragmas()?;
        info!("Created SQLite destination {}", path.display());
        Ok(target)
    }

    /// Open an in-memory destination (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CopyError::destination(e, "opening in-memory database"))?;
        let target = Self { conn, path: None };
        target.apply_pragmas()?;
        Ok(target)
    }

    fn apply_pragmas(&self) -> Result<()> {
        self.conn
            .execute_batch(BULK_LOAD_PRAGMAS)
            .map_err(|e| CopyError::destination(e, "applying bulk-load pragmas"))
    }

    /// Run a single DDL statement.
    pub fn execute_ddl(&self, ddl: &str) -> Result<()> {
        debug!("Executing DDL: {}", ddl);
        self.conn
            .execute(ddl, [])
            .map_err(|e| CopyError::destination(e, format!("executing DDL: {}", ddl)))?;
        Ok(())
    }

    /// Path of the destination file, if it lives on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Hand the connection to the write role.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_applies_pragmas() {
        let dir = tempfile::tempdir().unwrap();
        let target = SqliteTarget::create(&dir.path().join("out.db"), false).unwrap();

        let journal: String = target
            .connection()
            .query_row("PRAGMA journal_mode", [], |r| r.get(0))
            .unwrap();
        assert_eq!(journal.to_lowercase(), "off");

        let sync: i64 = target
            .connection()
            .query_row("PRAGMA synchronous", [], |r| r.get(0))
            .unwrap();
        assert_eq!(sync, 0);

        let fks: i64 = target
            .connection()
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fks, 0);
    }

    #[test]
    fn test_existing_file_requires_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.db");
        std::fs::write(&path, b"stale").unwrap();

        let err = SqliteTarget::create(&path, false).err().unwrap();
        assert!(matches!(err, CopyError::Config(_)));
        assert!(err.to_string().contains("--force"));

        let target = SqliteTarget::create(&path, true).unwrap();
        target.execute_ddl("CREATE TABLE t (id INTEGER)").unwrap();
        assert_eq!(target.path(), Some(path.as_path()));
    }

    #[test]
    fn test_bad_ddl_is_destination_error() {
        let target = SqliteTarget::in_memory().unwrap();
        let err = target.execute_ddl("CREATE TABLE (").unwrap_err();
        assert!(matches!(err, CopyError::DestinationWrite { .. }));
    }
}
