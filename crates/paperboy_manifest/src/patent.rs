use std::path::Path;

use rusqlite::{params, OptionalExtension};
use tracing::instrument;

use crate::conn::{is_processed, mark_processed, ConnectionPair, BULK_FILES_SCHEMA};
use crate::error::{ManifestError, Result};
use crate::types::{BulkFileRecord, ManifestStats, PatentDocType, PatentEntry};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS patent_index (
        patent_id TEXT PRIMARY KEY,
        archive_file TEXT NOT NULL,
        offset INTEGER NOT NULL,
        size INTEGER NOT NULL,
        doc_type TEXT NOT NULL DEFAULT 'grant',
        kind_code TEXT,
        year INTEGER,
        record_created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_patent_year ON patent_index(year);
    CREATE INDEX IF NOT EXISTS idx_patent_archive ON patent_index(archive_file);
    CREATE INDEX IF NOT EXISTS idx_patent_doc_type ON patent_index(doc_type);
";

/// SQLite-backed manifest over USPTO documents. Structurally identical
/// to [`crate::PaperManifest`] but without versioning or enrichment
/// columns, since those are arXiv-only concerns.
pub struct PatentManifest {
    conns: ConnectionPair,
}

impl PatentManifest {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conns = ConnectionPair::open(path.as_ref(), |conn| {
            conn.execute_batch(SCHEMA)?;
            conn.execute_batch(BULK_FILES_SCHEMA)?;
            Ok(())
        })?;
        Ok(Self { conns })
    }

    #[instrument(skip(self))]
    pub fn lookup(&self, patent_id: &str) -> Result<Option<PatentEntry>> {
        let conn = self.conns.read_conn.lock();
        conn.query_row(
            "SELECT patent_id, archive_file, offset, size, doc_type, kind_code, year
             FROM patent_index WHERE patent_id = ?1",
            [patent_id],
            row_to_entry,
        )
        .optional()
        .map_err(ManifestError::Query)
    }

    pub fn find_similar(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.conns.read_conn.lock();
        let pattern = format!("%{prefix}%");
        let mut stmt = conn
            .prepare_cached("SELECT patent_id FROM patent_index WHERE patent_id LIKE ?1 LIMIT 5")
            .map_err(ManifestError::Query)?;
        let rows = stmt
            .query_map([pattern], |row| row.get::<_, String>(0))
            .map_err(ManifestError::Query)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(ManifestError::Query)?);
        }
        Ok(out)
    }

    #[instrument(skip(self, batch), fields(batch_len = batch.len()))]
    pub fn upsert_entries(&self, batch: &[PatentEntry]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.conns.write_conn.lock();
        let tx = conn.transaction().map_err(ManifestError::BeginTransaction)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO patent_index
                        (patent_id, archive_file, offset, size, doc_type, kind_code, year)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(ManifestError::Query)?;
            for entry in batch {
                stmt.execute(params![
                    entry.patent_id,
                    entry.archive_file,
                    entry.offset as i64,
                    entry.size as i64,
                    entry.doc_type.as_db_str(),
                    entry.kind_code,
                    entry.year,
                ])
                .map_err(ManifestError::Query)?;
            }
        }
        tx.commit().map_err(ManifestError::Commit)?;
        Ok(())
    }

    pub fn mark_processed(&self, record: &BulkFileRecord) -> Result<()> {
        let conn = self.conns.write_conn.lock();
        mark_processed(
            &conn,
            &record.file_path,
            &record.file_hash,
            record.last_modified,
        )
        .map_err(ManifestError::Query)
    }

    pub fn is_processed(&self, file_path: &str) -> Result<Option<(String, f64)>> {
        let conn = self.conns.read_conn.lock();
        is_processed(&conn, file_path).map_err(ManifestError::Query)
    }

    pub fn stats(&self) -> Result<ManifestStats> {
        let conn = self.conns.read_conn.lock();
        let entry_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM patent_index", [], |r| r.get(0))
            .map_err(ManifestError::Query)?;
        let distinct_archives: i64 = conn
            .query_row(
                "SELECT COUNT(DISTINCT archive_file) FROM patent_index",
                [],
                |r| r.get(0),
            )
            .map_err(ManifestError::Query)?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT year FROM patent_index WHERE year IS NOT NULL ORDER BY year",
            )
            .map_err(ManifestError::Query)?;
        let years = stmt
            .query_map([], |r| r.get::<_, i32>(0))
            .map_err(ManifestError::Query)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(ManifestError::Query)?;

        Ok(ManifestStats {
            entry_count: entry_count as u64,
            distinct_years: years,
            distinct_archives: distinct_archives as u64,
        })
    }

    pub fn checkpoint_wal(&self) -> Result<()> {
        self.conns.checkpoint_wal()
    }

    /// Every distinct `archive_file` currently referenced by the
    /// manifest.
    pub fn distinct_archive_files(&self) -> Result<Vec<String>> {
        let conn = self.conns.read_conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT DISTINCT archive_file FROM patent_index")
            .map_err(ManifestError::Query)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(ManifestError::Query)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(ManifestError::Query)?);
        }
        Ok(out)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatentEntry> {
    Ok(PatentEntry {
        patent_id: row.get(0)?,
        archive_file: row.get(1)?,
        offset: row.get::<_, i64>(2)? as u64,
        size: row.get::<_, i64>(3)? as u64,
        doc_type: PatentDocType::from_db_str(&row.get::<_, String>(4)?),
        kind_code: row.get(5)?,
        year: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(id: &str) -> PatentEntry {
        PatentEntry {
            patent_id: id.to_string(),
            archive_file: "PTGRXML/ipg200101.zip".to_string(),
            offset: 0,
            size: 2048,
            doc_type: PatentDocType::Grant,
            kind_code: Some("B2".to_string()),
            year: Some(2020),
        }
    }

    #[test]
    fn round_trips_a_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PatentManifest::open(dir.path().join("patents.db")).unwrap();
        manifest.upsert_entries(&[sample_entry("11123456")]).unwrap();

        let found = manifest.lookup("11123456").unwrap().unwrap();
        assert_eq!(found.kind_code.as_deref(), Some("B2"));
        assert_eq!(found.doc_type, PatentDocType::Grant);
    }

    #[test]
    fn distinguishes_grant_from_application() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PatentManifest::open(dir.path().join("patents.db")).unwrap();
        let mut application = sample_entry("20200123456");
        application.doc_type = PatentDocType::Application;
        application.kind_code = Some("A1".to_string());
        manifest.upsert_entries(&[application]).unwrap();

        let found = manifest.lookup("20200123456").unwrap().unwrap();
        assert_eq!(found.doc_type, PatentDocType::Application);
    }
}
