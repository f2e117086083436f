use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::{ManifestError, Result};

/// Write connection and read connection for the same database file.
///
/// Mirrors the split-connection design used for large SQLite-backed
/// stores elsewhere in this stack: a single serialized writer so batch
/// commits are atomic, and a separate `query_only` connection so readers
/// are never blocked behind a writer holding the database lock.
pub(crate) struct ConnectionPair {
    pub(crate) write_conn: Mutex<Connection>,
    pub(crate) read_conn: Mutex<Connection>,
}

impl ConnectionPair {
    pub(crate) fn open(
        path: &Path,
        create_schema: impl FnOnce(&Connection) -> rusqlite::Result<()>,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| ManifestError::Open {
                    path: path.to_path_buf(),
                    source: rusqlite::Error::InvalidPath(PathBuf::from(source.to_string())),
                })?;
            }
        }

        let write_conn = Connection::open(path).map_err(|source| ManifestError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // Page size must be set before any table is created.
        write_conn
            .execute_batch("PRAGMA page_size = 32768;")
            .map_err(ManifestError::Schema)?;

        write_conn
            .execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA wal_autocheckpoint = 1000;
                PRAGMA cache_size = -64000;
                PRAGMA temp_store = MEMORY;
                PRAGMA mmap_size = 268435456;
                PRAGMA foreign_keys = ON;
                ",
            )
            .map_err(ManifestError::Schema)?;

        create_schema(&write_conn).map_err(ManifestError::Schema)?;

        let read_conn = Connection::open(path).map_err(|source| ManifestError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        read_conn
            .execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA cache_size = -64000;
                PRAGMA temp_store = MEMORY;
                PRAGMA mmap_size = 268435456;
                PRAGMA query_only = 1;
                ",
            )
            .map_err(ManifestError::Schema)?;

        Ok(Self {
            write_conn: Mutex::new(write_conn),
            read_conn: Mutex::new(read_conn),
        })
    }

    pub(crate) fn checkpoint_wal(&self) -> Result<()> {
        let conn = self.write_conn.lock();
        conn.execute("PRAGMA wal_checkpoint(TRUNCATE)", [])
            .map_err(ManifestError::Query)?;
        Ok(())
    }
}

pub(crate) const BULK_FILES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS bulk_files (
        file_path TEXT PRIMARY KEY,
        file_hash TEXT NOT NULL,
        last_modified REAL NOT NULL,
        processed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
";

pub(crate) fn mark_processed(
    conn: &Connection,
    file_path: &str,
    file_hash: &str,
    last_modified: f64,
) -> rusqlite::Result<()> {
    conn.prepare_cached(
        "INSERT INTO bulk_files (file_path, file_hash, last_modified, processed_at)
         VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
         ON CONFLICT(file_path) DO UPDATE SET
            file_hash = excluded.file_hash,
            last_modified = excluded.last_modified,
            processed_at = CURRENT_TIMESTAMP",
    )?
    .execute(rusqlite::params![file_path, file_hash, last_modified])?;
    Ok(())
}

pub(crate) fn is_processed(
    conn: &Connection,
    file_path: &str,
) -> rusqlite::Result<Option<(String, f64)>> {
    conn.query_row(
        "SELECT file_hash, last_modified FROM bulk_files WHERE file_path = ?1",
        [file_path],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

use rusqlite::OptionalExtension;
