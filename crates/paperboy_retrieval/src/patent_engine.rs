use std::path::PathBuf;
use std::time::Duration;

use paperboy_ids::{IdentifierScheme, PatentId};
use paperboy_manifest::PatentManifest;
use tracing::instrument;

use crate::error::{ErrorKind, RetrievalFailure, Result};
use crate::tier::{archive_exists, UpstreamFetchTier};
use crate::types::{DocumentInfo, FetchedDocument, Tier};

const SIMILAR_PREFIX_LEN: usize = 6;

/// Tiered retrieval for the USPTO corpus: local bulk zip, then a
/// configured upstream mirror. There is no origin-of-record tier and
/// no versioning — USPTO publication numbers are already final.
pub struct PatentEngine {
    manifest: PatentManifest,
    archive_root: Option<PathBuf>,
    upstream: Option<UpstreamFetchTier>,
}

impl PatentEngine {
    pub fn new(
        manifest: PatentManifest,
        archive_root: Option<PathBuf>,
        upstream_url: Option<String>,
        upstream_timeout: Duration,
    ) -> reqwest::Result<Self> {
        let upstream = upstream_url
            .map(|url| UpstreamFetchTier::new(url, upstream_timeout, "patent"))
            .transpose()?;
        Ok(PatentEngine { manifest, archive_root, upstream })
    }

    #[instrument(skip(self))]
    pub fn retrieve(&self, raw_id: &str) -> Result<FetchedDocument> {
        let id = PatentId::parse(raw_id);
        let bare_id = id.canonical_key();

        let entry = self.manifest.lookup(&bare_id)?;

        if let (Some(archive_root), Some(entry)) = (&self.archive_root, &entry) {
            if archive_exists(archive_root, &entry.archive_file) {
                let path = archive_root.join(&entry.archive_file);
                if let Ok(bytes) = paperboy_archive::fetch_zip_range(&path, entry.offset, entry.size) {
                    return Ok(FetchedDocument {
                        content: bytes,
                        content_type: "application/xml",
                        source: Tier::Local,
                        doc_class: paperboy_manifest::DocClass::Xml,
                    });
                }
            }
        }

        if let Some(upstream) = &self.upstream {
            if let Some(bytes) = upstream.fetch(&bare_id, None) {
                return Ok(FetchedDocument {
                    content: bytes,
                    content_type: "application/xml",
                    source: Tier::Upstream,
                    doc_class: paperboy_manifest::DocClass::Xml,
                });
            }
        }

        let similar_ids = self
            .manifest
            .find_similar(&bare_id.chars().take(SIMILAR_PREFIX_LEN).collect::<String>())
            .unwrap_or_default();
        Err(RetrievalFailure::new(ErrorKind::NotFound, format!("'{raw_id}' was not found"))
            .with_similar_ids(similar_ids))
    }

    #[instrument(skip(self))]
    pub fn info(&self, raw_id: &str) -> Result<Option<DocumentInfo>> {
        let id = PatentId::parse(raw_id);
        let bare_id = id.canonical_key();

        if let Some(entry) = self.manifest.lookup(&bare_id)? {
            let locally_available = self
                .archive_root
                .as_ref()
                .map(|root| archive_exists(root, &entry.archive_file))
                .unwrap_or(false);
            return Ok(Some(DocumentInfo {
                canonical_id: bare_id,
                archive_file: Some(entry.archive_file),
                doc_class: None,
                year: entry.year,
                kind_code: entry.kind_code,
                locally_available,
                source: Tier::Local,
            }));
        }

        if let Some(upstream) = &self.upstream {
            let url = format!("{}/patent/{}/info", upstream.base_url.trim_end_matches('/'), bare_id);
            if let Ok(resp) = upstream.client.get(&url).send() {
                if resp.status().is_success() {
                    if let Ok(info) = resp.json::<UpstreamPatentInfo>() {
                        return Ok(Some(DocumentInfo {
                            canonical_id: bare_id,
                            archive_file: None,
                            doc_class: None,
                            year: info.year,
                            kind_code: info.kind_code,
                            locally_available: false,
                            source: Tier::Upstream,
                        }));
                    }
                }
            }
        }

        Ok(None)
    }

    #[instrument(skip(self))]
    pub fn diagnose(&self, raw_id: &str) -> RetrievalFailure {
        let stats = match self.manifest.stats() {
            Ok(stats) => stats,
            Err(err) => return RetrievalFailure::new(ErrorKind::DatabaseError, err.to_string()),
        };
        if stats.entry_count == 0 {
            return RetrievalFailure::new(
                ErrorKind::EmptyDatabase,
                "the manifest contains no patents; run the indexing pipeline first",
            );
        }

        let id = PatentId::parse(raw_id);
        let bare_id = id.canonical_key();
        let entry = match self.manifest.lookup(&bare_id) {
            Ok(entry) => entry,
            Err(err) => return RetrievalFailure::new(ErrorKind::DatabaseError, err.to_string()),
        };

        let Some(entry) = entry else {
            let similar_ids = self
                .manifest
                .find_similar(&bare_id.chars().take(SIMILAR_PREFIX_LEN).collect::<String>())
                .unwrap_or_default();
            return RetrievalFailure::new(ErrorKind::NotFound, format!("'{raw_id}' was not found"))
                .with_similar_ids(similar_ids);
        };

        let Some(archive_root) = &self.archive_root else {
            return RetrievalFailure::new(ErrorKind::ArchiveMissing, "no archive root is configured")
                .with_archive_file(entry.archive_file);
        };

        let path = archive_root.join(&entry.archive_file);
        match fs_err::File::open(&path) {
            Ok(_) => RetrievalFailure::new(ErrorKind::SystemError, "unexpected failure reading a reachable archive"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                RetrievalFailure::new(ErrorKind::ArchiveMissing, format!("archive file not found: {}", path.display()))
                    .with_archive_file(entry.archive_file)
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                RetrievalFailure::new(ErrorKind::PermissionDenied, format!("permission denied accessing {}", path.display()))
                    .with_archive_file(entry.archive_file)
            }
            Err(e) => RetrievalFailure::new(ErrorKind::SystemError, e.to_string()),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct UpstreamPatentInfo {
    kind_code: Option<String>,
    year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use paperboy_manifest::{PatentDocType, PatentEntry};

    fn build_zip_fixture(dir: &std::path::Path, xml: &[u8]) -> PathBuf {
        let zip_path = dir.join("PTGRXML/ipg200101.zip");
        fs_err::create_dir_all(zip_path.parent().unwrap()).unwrap();
        let file = fs_err::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file("ipg200101.xml", zip::write::SimpleFileOptions::default()).unwrap();
        writer.write_all(xml).unwrap();
        writer.finish().unwrap();
        zip_path
    }

    #[test]
    fn local_tier_serves_a_known_patent() {
        let archive_dir = tempfile::tempdir().unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        let xml = b"<?xml?><patent-document>body</patent-document>".to_vec();
        build_zip_fixture(archive_dir.path(), &xml);

        let manifest = PatentManifest::open(db_dir.path().join("patents.db")).unwrap();
        manifest
            .upsert_entries(&[PatentEntry {
                patent_id: "11123456".to_string(),
                archive_file: "PTGRXML/ipg200101.zip".to_string(),
                offset: 0,
                size: xml.len() as u64,
                doc_type: PatentDocType::Grant,
                kind_code: Some("B2".to_string()),
                year: Some(2020),
            }])
            .unwrap();

        let engine = PatentEngine::new(manifest, Some(archive_dir.path().to_path_buf()), None, Duration::from_secs(5)).unwrap();
        let doc = engine.retrieve("US11123456B2").unwrap();
        assert_eq!(doc.content, xml);
        assert_eq!(doc.source, Tier::Local);
    }

    #[test]
    fn missing_patent_is_not_found() {
        let db_dir = tempfile::tempdir().unwrap();
        let manifest = PatentManifest::open(db_dir.path().join("patents.db")).unwrap();
        let engine = PatentEngine::new(manifest, None, None, Duration::from_secs(5)).unwrap();

        let err = engine.retrieve("US99999999B2").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn info_reports_kind_code_and_local_availability() {
        let archive_dir = tempfile::tempdir().unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        build_zip_fixture(archive_dir.path(), b"<?xml?><a/>");

        let manifest = PatentManifest::open(db_dir.path().join("patents.db")).unwrap();
        manifest
            .upsert_entries(&[PatentEntry {
                patent_id: "11123456".to_string(),
                archive_file: "PTGRXML/ipg200101.zip".to_string(),
                offset: 0,
                size: 11,
                doc_type: PatentDocType::Grant,
                kind_code: Some("B2".to_string()),
                year: Some(2020),
            }])
            .unwrap();

        let engine = PatentEngine::new(manifest, Some(archive_dir.path().to_path_buf()), None, Duration::from_secs(5)).unwrap();
        let info = engine.info("US11123456B2").unwrap().unwrap();
        assert!(info.locally_available);
        assert_eq!(info.kind_code.as_deref(), Some("B2"));
    }
}
