use std::path::Path;

use rusqlite::{params, OptionalExtension};
use tracing::instrument;

use crate::conn::{is_processed, mark_processed, ConnectionPair, BULK_FILES_SCHEMA};
use crate::error::{ManifestError, Result};
use crate::types::{
    BulkFileRecord, DocClass, EnrichmentFields, ManifestStats, PaperEntry, RandomPaperFilter,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS paper_index (
        paper_id TEXT PRIMARY KEY,
        archive_file TEXT NOT NULL,
        offset INTEGER NOT NULL,
        size INTEGER NOT NULL,
        file_type TEXT NOT NULL,
        year INTEGER NOT NULL,
        record_created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        categories TEXT,
        title TEXT,
        authors TEXT,
        abstract TEXT,
        doi TEXT,
        journal_ref TEXT,
        comments TEXT,
        submitter TEXT,
        report_no TEXT,
        versions TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_paper_year ON paper_index(year);
    CREATE INDEX IF NOT EXISTS idx_paper_archive ON paper_index(archive_file);
    CREATE INDEX IF NOT EXISTS idx_paper_categories ON paper_index(categories);
    CREATE INDEX IF NOT EXISTS idx_paper_doi ON paper_index(doi);
";

/// SQLite-backed manifest over arXiv documents.
///
/// One dedicated write connection, serialized behind a mutex, and one
/// `query_only` read connection so lookups from the retrieval engine are
/// never blocked behind an in-progress indexing batch.
pub struct PaperManifest {
    conns: ConnectionPair,
}

impl PaperManifest {
    /// Open (creating if absent) the manifest database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conns = ConnectionPair::open(path.as_ref(), |conn| {
            conn.execute_batch(SCHEMA)?;
            conn.execute_batch(BULK_FILES_SCHEMA)?;
            Ok(())
        })?;
        Ok(Self { conns })
    }

    /// Look up a single entry by its canonical paper id.
    #[instrument(skip(self))]
    pub fn lookup(&self, paper_id: &str) -> Result<Option<PaperEntry>> {
        let conn = self.conns.read_conn.lock();
        conn.query_row(
            "SELECT paper_id, archive_file, offset, size, file_type, year,
                    categories, title, authors, abstract, doi, journal_ref,
                    comments, submitter, report_no, versions
             FROM paper_index WHERE paper_id = ?1",
            [paper_id],
            row_to_entry,
        )
        .optional()
        .map_err(ManifestError::Query)
    }

    /// Up to 5 ids whose prefix matches `prefix`, for "did you mean"
    /// style diagnostics when an exact lookup misses.
    pub fn find_similar(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.conns.read_conn.lock();
        let pattern = format!("%{prefix}%");
        let mut stmt = conn
            .prepare_cached("SELECT paper_id FROM paper_index WHERE paper_id LIKE ?1 LIMIT 5")
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

    /// Atomically insert or replace every entry in `batch`. Either the
    /// whole batch lands or none of it does.
    #[instrument(skip(self, batch), fields(batch_len = batch.len()))]
    pub fn upsert_entries(&self, batch: &[PaperEntry]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.conns.write_conn.lock();
        let tx = conn.transaction().map_err(ManifestError::BeginTransaction)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO paper_index
                        (paper_id, archive_file, offset, size, file_type, year,
                         categories, title, authors, abstract, doi, journal_ref,
                         comments, submitter, report_no, versions)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                )
                .map_err(ManifestError::Query)?;
            for entry in batch {
                stmt.execute(params![
                    entry.paper_id,
                    entry.archive_file,
                    entry.offset as i64,
                    entry.size as i64,
                    entry.doc_class.as_db_str(),
                    entry.year,
                    entry.enrichment.categories,
                    entry.enrichment.title,
                    entry.enrichment.authors,
                    entry.enrichment.abstract_text,
                    entry.enrichment.doi,
                    entry.enrichment.journal_ref,
                    entry.enrichment.comments,
                    entry.enrichment.submitter,
                    entry.enrichment.report_no,
                    entry.enrichment.versions,
                ])
                .map_err(ManifestError::Query)?;
            }
        }
        tx.commit().map_err(ManifestError::Commit)?;
        Ok(())
    }

    /// Record that `file_path` has been fully scanned with the given hash
    /// and modification time.
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

    /// Whether `file_path` has already been scanned, and if so its
    /// recorded `(hash, mtime)`.
    pub fn is_processed(&self, file_path: &str) -> Result<Option<(String, f64)>> {
        let conn = self.conns.read_conn.lock();
        is_processed(&conn, file_path).map_err(ManifestError::Query)
    }

    /// Update only the nullable enrichment columns for an existing row.
    /// A no-op, not an error, if `paper_id` isn't present.
    pub fn enrich_entry(&self, paper_id: &str, fields: &EnrichmentFields) -> Result<()> {
        let conn = self.conns.write_conn.lock();
        conn.prepare_cached(
            "UPDATE paper_index SET
                categories = ?1, title = ?2, authors = ?3, abstract = ?4,
                doi = ?5, journal_ref = ?6, comments = ?7, submitter = ?8,
                report_no = ?9, versions = ?10
             WHERE paper_id = ?11",
        )
        .map_err(ManifestError::Query)?
        .execute(params![
            fields.categories,
            fields.title,
            fields.authors,
            fields.abstract_text,
            fields.doi,
            fields.journal_ref,
            fields.comments,
            fields.submitter,
            fields.report_no,
            fields.versions,
            paper_id,
        ])
        .map_err(ManifestError::Query)?;
        Ok(())
    }

    /// Apply a batch of enrichment updates inside a single transaction,
    /// the same atomicity the enrichment pass relies on between flushes.
    /// Rows absent from `paper_index` are silently skipped, same as
    /// [`Self::enrich_entry`].
    #[instrument(skip(self, batch), fields(batch_len = batch.len()))]
    pub fn enrich_batch(&self, batch: &[(String, EnrichmentFields)]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.conns.write_conn.lock();
        let tx = conn.transaction().map_err(ManifestError::BeginTransaction)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "UPDATE paper_index SET
                        categories = ?1, title = ?2, authors = ?3, abstract = ?4,
                        doi = ?5, journal_ref = ?6, comments = ?7, submitter = ?8,
                        report_no = ?9, versions = ?10
                     WHERE paper_id = ?11",
                )
                .map_err(ManifestError::Query)?;
            for (paper_id, fields) in batch {
                stmt.execute(params![
                    fields.categories,
                    fields.title,
                    fields.authors,
                    fields.abstract_text,
                    fields.doi,
                    fields.journal_ref,
                    fields.comments,
                    fields.submitter,
                    fields.report_no,
                    fields.versions,
                    paper_id,
                ])
                .map_err(ManifestError::Query)?;
            }
        }
        tx.commit().map_err(ManifestError::Commit)?;
        Ok(())
    }

    /// Every currently-stored paper id, for the enrichment pass's
    /// in-memory membership set.
    pub fn all_ids(&self) -> Result<std::collections::HashSet<String>> {
        let conn = self.conns.read_conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT paper_id FROM paper_index")
            .map_err(ManifestError::Query)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(ManifestError::Query)?;
        let mut out = std::collections::HashSet::new();
        for row in rows {
            out.insert(row.map_err(ManifestError::Query)?);
        }
        Ok(out)
    }

    /// One uniformly random entry matching `filter`.
    ///
    /// Implemented as `ORDER BY RANDOM() LIMIT 1`; this is a known,
    /// accepted scaling limitation documented in the workspace's design
    /// notes rather than a reservoir sampler.
    pub fn random_entry(&self, filter: &RandomPaperFilter) -> Result<Option<PaperEntry>> {
        let conn = self.conns.read_conn.lock();
        let mut clauses = Vec::new();
        let mut bind: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !filter.doc_class.is_empty() {
            let placeholders = filter.doc_class.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            clauses.push(format!("file_type IN ({placeholders})"));
            for class in &filter.doc_class {
                bind.push(Box::new(class.as_db_str().to_string()));
            }
        }
        if let Some(prefix) = &filter.category_prefix {
            clauses.push("(paper_id LIKE ? OR categories LIKE ?)".to_string());
            bind.push(Box::new(format!("{prefix}%")));
            bind.push(Box::new(format!("%{prefix}%")));
        }
        if let Some(archives) = &filter.local_only_archives {
            if archives.is_empty() {
                return Ok(None);
            }
            let placeholders = archives.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            clauses.push(format!("archive_file IN ({placeholders})"));
            for archive in archives {
                bind.push(Box::new(archive.clone()));
            }
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT paper_id, archive_file, offset, size, file_type, year,
                    categories, title, authors, abstract, doi, journal_ref,
                    comments, submitter, report_no, versions
             FROM paper_index {where_clause} ORDER BY RANDOM() LIMIT 1"
        );

        let params_refs: Vec<&dyn rusqlite::ToSql> = bind.iter().map(|b| b.as_ref()).collect();
        conn.query_row(&sql, params_refs.as_slice(), row_to_entry)
            .optional()
            .map_err(ManifestError::Query)
    }

    pub fn stats(&self) -> Result<ManifestStats> {
        let conn = self.conns.read_conn.lock();
        let entry_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM paper_index", [], |r| r.get(0))
            .map_err(ManifestError::Query)?;
        let distinct_archives: i64 = conn
            .query_row(
                "SELECT COUNT(DISTINCT archive_file) FROM paper_index",
                [],
                |r| r.get(0),
            )
            .map_err(ManifestError::Query)?;
        let mut stmt = conn
            .prepare_cached("SELECT DISTINCT year FROM paper_index ORDER BY year")
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

    /// Non-null, non-empty row counts for each enrichment column, for the
    /// enrichment pass's final coverage report.
    pub fn enrichment_coverage(&self) -> Result<Vec<(&'static str, u64)>> {
        const ENRICHMENT_COLUMNS: &[&str] = &[
            "categories",
            "title",
            "authors",
            "abstract",
            "doi",
            "journal_ref",
            "comments",
            "submitter",
            "report_no",
            "versions",
        ];
        let conn = self.conns.read_conn.lock();
        let mut out = Vec::with_capacity(ENRICHMENT_COLUMNS.len());
        for column in ENRICHMENT_COLUMNS {
            let sql = format!(
                "SELECT COUNT(*) FROM paper_index WHERE {column} IS NOT NULL AND {column} != ''"
            );
            let count: i64 = conn
                .query_row(&sql, [], |r| r.get(0))
                .map_err(ManifestError::Query)?;
            out.push((*column, count as u64));
        }
        Ok(out)
    }

    /// Every distinct `archive_file` currently referenced by the
    /// manifest, for callers (random selection's `local_only` filter)
    /// that need to cross-reference against what's actually on disk.
    pub fn distinct_archive_files(&self) -> Result<Vec<String>> {
        let conn = self.conns.read_conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT DISTINCT archive_file FROM paper_index")
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

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<PaperEntry> {
    Ok(PaperEntry {
        paper_id: row.get(0)?,
        archive_file: row.get(1)?,
        offset: row.get::<_, i64>(2)? as u64,
        size: row.get::<_, i64>(3)? as u64,
        doc_class: DocClass::from_db_str(&row.get::<_, String>(4)?),
        year: row.get(5)?,
        enrichment: EnrichmentFields {
            categories: row.get(6)?,
            title: row.get(7)?,
            authors: row.get(8)?,
            abstract_text: row.get(9)?,
            doi: row.get(10)?,
            journal_ref: row.get(11)?,
            comments: row.get(12)?,
            submitter: row.get(13)?,
            report_no: row.get(14)?,
            versions: row.get(15)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(id: &str) -> PaperEntry {
        PaperEntry {
            paper_id: id.to_string(),
            archive_file: "2015/arXiv_pdf_1501_001.tar".to_string(),
            offset: 512,
            size: 12,
            doc_class: DocClass::Pdf,
            year: 2015,
            enrichment: EnrichmentFields::default(),
        }
    }

    #[test]
    fn round_trips_a_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        manifest.upsert_entries(&[sample_entry("1501.00963")]).unwrap();

        let found = manifest.lookup("1501.00963").unwrap().unwrap();
        assert_eq!(found.offset, 512);
        assert_eq!(found.size, 12);
        assert_eq!(found.doc_class, DocClass::Pdf);
    }

    #[test]
    fn second_upsert_overwrites_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        manifest.upsert_entries(&[sample_entry("1501.00963")]).unwrap();

        let mut second = sample_entry("1501.00963");
        second.archive_file = "2015/arXiv_pdf_1501_002.tar".to_string();
        second.offset = 4096;
        manifest.upsert_entries(&[second]).unwrap();

        let found = manifest.lookup("1501.00963").unwrap().unwrap();
        assert_eq!(found.archive_file, "2015/arXiv_pdf_1501_002.tar");
        assert_eq!(found.offset, 4096);
    }

    #[test]
    fn missing_lookup_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        assert!(manifest.lookup("nope").unwrap().is_none());
    }

    #[test]
    fn bulk_file_tracking_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        assert!(manifest.is_processed("2015/arXiv_pdf_1501_001.tar").unwrap().is_none());

        manifest
            .mark_processed(&BulkFileRecord {
                file_path: "2015/arXiv_pdf_1501_001.tar".to_string(),
                file_hash: "deadbeef".to_string(),
                last_modified: 100.0,
            })
            .unwrap();

        let (hash, mtime) = manifest
            .is_processed("2015/arXiv_pdf_1501_001.tar")
            .unwrap()
            .unwrap();
        assert_eq!(hash, "deadbeef");
        assert_eq!(mtime, 100.0);
    }

    #[test]
    fn enrich_entry_is_a_noop_for_missing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        let fields = EnrichmentFields {
            title: Some("Untitled".to_string()),
            ..Default::default()
        };
        manifest.enrich_entry("does-not-exist", &fields).unwrap();
        assert!(manifest.lookup("does-not-exist").unwrap().is_none());
    }

    #[test]
    fn enrich_entry_updates_only_enrichment_columns() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        manifest.upsert_entries(&[sample_entry("1501.00963")]).unwrap();

        manifest
            .enrich_entry(
                "1501.00963",
                &EnrichmentFields {
                    title: Some("A Great Paper".to_string()),
                    categories: Some("astro-ph.CO".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let found = manifest.lookup("1501.00963").unwrap().unwrap();
        assert_eq!(found.enrichment.title.as_deref(), Some("A Great Paper"));
        assert_eq!(found.archive_file, "2015/arXiv_pdf_1501_001.tar");
        assert_eq!(found.offset, 512);
    }

    #[test]
    fn random_entry_respects_doc_class_filter() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        let mut gzip_entry = sample_entry("2103.06497");
        gzip_entry.doc_class = DocClass::SourceGzip;
        manifest
            .upsert_entries(&[sample_entry("1501.00963"), gzip_entry])
            .unwrap();

        let found = manifest
            .random_entry(&RandomPaperFilter {
                doc_class: vec![DocClass::SourceGzip],
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(found.paper_id, "2103.06497");
    }

    #[test]
    fn find_similar_returns_prefix_matches() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        manifest
            .upsert_entries(&[sample_entry("1501.00963"), sample_entry("1501.00964")])
            .unwrap();

        let similar = manifest.find_similar("1501.0096").unwrap();
        assert_eq!(similar.len(), 2);
    }
}
