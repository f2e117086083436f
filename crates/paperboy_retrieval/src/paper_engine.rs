use std::path::PathBuf;
use std::time::Duration;

use paperboy_archive::sniff_doc_class;
use paperboy_cache::DiskCache;
use paperboy_ids::{ArxivId, IdentifierScheme};
use paperboy_manifest::{DocClass, PaperManifest, RandomPaperFilter};
use tracing::{info, instrument};

use crate::error::{ErrorKind, RetrievalFailure, Result};
use crate::tier::{archive_exists, ArxivOriginFetchTier, UpstreamFetchTier};
use crate::types::{DocumentInfo, FetchedDocument, FormatFilter, RandomPaperQuery, Tier};

const SIMILAR_PREFIX_LEN: usize = 6;

/// Tiered retrieval for the arXiv corpus: cache, local bulk tar,
/// configured upstream mirror, and finally arxiv.org itself.
pub struct ArxivEngine {
    manifest: PaperManifest,
    archive_root: Option<PathBuf>,
    cache: Option<DiskCache>,
    upstream: Option<UpstreamFetchTier>,
    origin: Option<ArxivOriginFetchTier>,
}

impl ArxivEngine {
    pub fn new(
        manifest: PaperManifest,
        archive_root: Option<PathBuf>,
        cache: Option<DiskCache>,
        upstream_url: Option<String>,
        upstream_timeout: Duration,
        arxiv_fallback_enabled: bool,
        arxiv_timeout: Duration,
    ) -> reqwest::Result<Self> {
        let upstream = upstream_url
            .map(|url| UpstreamFetchTier::new(url, upstream_timeout, "paper"))
            .transpose()?;
        let origin = if arxiv_fallback_enabled {
            Some(ArxivOriginFetchTier::new(arxiv_timeout)?)
        } else {
            None
        };
        Ok(ArxivEngine { manifest, archive_root, cache, upstream, origin })
    }

    /// Retrieve a document by raw identifier, honoring an optional
    /// format filter. See the workspace's retrieval engine design notes
    /// for the exact tier order and error precedence.
    #[instrument(skip(self))]
    pub fn retrieve(&self, raw_id: &str, format: Option<FormatFilter>) -> Result<FetchedDocument> {
        let id = ArxivId::parse(raw_id);
        let version_required = id.version.is_some();
        let lookup_key = id.canonical_key();

        let entry = self.manifest.lookup(&lookup_key)?;
        let version_not_found_candidate = entry.is_none() && version_required;
        let local_format_mismatch = entry
            .as_ref()
            .and_then(|e| format.map(|f| !f.accepts(e.doc_class)))
            .unwrap_or(false);
        let bypass_local = version_not_found_candidate || local_format_mismatch;

        if !bypass_local {
            if let Some(cache) = &self.cache {
                if let Some(bytes) = cache.get(&lookup_key).ok().flatten() {
                    let doc_class = entry.as_ref().map(|e| e.doc_class).unwrap_or_else(|| sniff_doc_class(&bytes));
                    return Ok(FetchedDocument {
                        content_type: doc_class.content_type(),
                        content: bytes,
                        source: Tier::Cache,
                        doc_class,
                    });
                }
            }

            if let (Some(archive_root), Some(entry)) = (&self.archive_root, &entry) {
                if archive_exists(archive_root, &entry.archive_file) {
                    let path = archive_root.join(&entry.archive_file);
                    match paperboy_archive::fetch_tar_range(&path, entry.offset, entry.size) {
                        Ok(bytes) => {
                            self.cache_on_success(&lookup_key, &bytes);
                            return Ok(FetchedDocument {
                                content_type: entry.doc_class.content_type(),
                                content: bytes,
                                source: Tier::Local,
                                doc_class: entry.doc_class,
                            });
                        }
                        Err(err) => {
                            // Soft failure: local tier contributes nothing, fall through.
                            tracing::debug!(error = %err, "local tier failed, trying the next one");
                        }
                    }
                }
            }
        }

        if let Some(upstream) = &self.upstream {
            if let Some(bytes) = upstream.fetch(&lookup_key, format) {
                self.cache_on_success(&lookup_key, &bytes);
                let doc_class = entry.as_ref().map(|e| e.doc_class).unwrap_or_else(|| sniff_doc_class(&bytes));
                return Ok(FetchedDocument {
                    content_type: doc_class.content_type(),
                    content: bytes,
                    source: Tier::Upstream,
                    doc_class,
                });
            }
        }

        if let Some(origin) = &self.origin {
            if let Some(bytes) = origin.fetch(&lookup_key, format) {
                self.cache_on_success(&lookup_key, &bytes);
                let doc_class = sniff_doc_class(&bytes);
                return Ok(FetchedDocument {
                    content_type: doc_class.content_type(),
                    content: bytes,
                    source: Tier::Origin,
                    doc_class,
                });
            }
        }

        if version_not_found_candidate {
            return Err(RetrievalFailure::new(
                ErrorKind::VersionNotFound,
                format!("version {} of '{}' was not found", id.version.unwrap_or(0), id.base),
            ));
        }

        if local_format_mismatch {
            return Err(RetrievalFailure::new(
                ErrorKind::FormatUnavailable,
                format!("'{lookup_key}' exists but not in the requested format"),
            ));
        }

        let similar_ids = self
            .manifest
            .find_similar(&lookup_key.chars().take(SIMILAR_PREFIX_LEN).collect::<String>())
            .unwrap_or_default();
        let mut failure = RetrievalFailure::new(ErrorKind::NotFound, format!("'{raw_id}' was not found"))
            .with_similar_ids(similar_ids);
        if entry.is_none() {
            failure = failure.with_tar_hint(id.hint_location());
        }
        Err(failure)
    }

    fn cache_on_success(&self, key: &str, bytes: &[u8]) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.put(key, bytes) {
                info!(key, error = %err, "failed to cache a freshly fetched paper");
            }
        }
    }

    /// Metadata-only lookup, with no payload read. Falls back to an
    /// upstream `/info` endpoint when the manifest has nothing.
    #[instrument(skip(self))]
    pub fn info(&self, raw_id: &str) -> Result<Option<DocumentInfo>> {
        let id = ArxivId::parse(raw_id);
        let lookup_key = id.canonical_key();

        if let Some(entry) = self.manifest.lookup(&lookup_key)? {
            let locally_available = self
                .archive_root
                .as_ref()
                .map(|root| archive_exists(root, &entry.archive_file))
                .unwrap_or(false);
            return Ok(Some(DocumentInfo {
                canonical_id: lookup_key,
                archive_file: Some(entry.archive_file),
                doc_class: Some(entry.doc_class),
                year: Some(entry.year),
                kind_code: None,
                locally_available,
                source: Tier::Local,
            }));
        }

        if let Some(upstream) = &self.upstream {
            let url = format!("{}/paper/{}/info", upstream.base_url.trim_end_matches('/'), lookup_key);
            if let Ok(resp) = upstream.client.get(&url).send() {
                if resp.status().is_success() {
                    if let Ok(info) = resp.json::<UpstreamDocInfo>() {
                        return Ok(Some(DocumentInfo {
                            canonical_id: lookup_key,
                            archive_file: info.archive_file,
                            doc_class: info.doc_class.as_deref().map(DocClass::from_db_str),
                            year: info.year,
                            kind_code: None,
                            locally_available: false,
                            source: Tier::Upstream,
                        }));
                    }
                }
            }
        }

        if let Some(origin) = &self.origin {
            let path_id = crate::tier::origin_path_id(&lookup_key);
            let url = format!("https://arxiv.org/pdf/{path_id}.pdf");
            if let Ok(resp) = origin.client.head(&url).send() {
                if resp.status().is_success() {
                    return Ok(Some(DocumentInfo {
                        canonical_id: lookup_key,
                        archive_file: None,
                        doc_class: Some(DocClass::Pdf),
                        year: None,
                        kind_code: None,
                        locally_available: false,
                        source: Tier::Origin,
                    }));
                }
            }
        }

        Ok(None)
    }

    /// One uniformly random paper matching `query`.
    #[instrument(skip(self))]
    pub fn random_paper(&self, query: &RandomPaperQuery) -> Result<Option<paperboy_manifest::PaperEntry>> {
        let doc_class = match query.format {
            Some(FormatFilter::Pdf) => vec![DocClass::Pdf],
            Some(FormatFilter::Source) => vec![DocClass::SourceGzip, DocClass::SourceTar],
            Some(FormatFilter::Preferred) | None => Vec::new(),
        };

        let local_only_archives = if query.local_only {
            let root = match &self.archive_root {
                Some(root) => root,
                None => return Ok(None),
            };
            let existing: Vec<String> = self
                .manifest
                .distinct_archive_files()?
                .into_iter()
                .filter(|a| archive_exists(root, a))
                .collect();
            Some(existing)
        } else {
            None
        };

        let filter = RandomPaperFilter {
            doc_class,
            category_prefix: query.category.clone(),
            local_only_archives,
        };
        Ok(self.manifest.random_entry(&filter)?)
    }

    /// Structured diagnosis of why a lookup failed, mirroring the
    /// original single-tier retriever's detailed error path. Unlike
    /// [`ArxivEngine::retrieve`], this inspects the local archive
    /// directly and so can distinguish `archive_missing` and
    /// `permission_denied` from a generic miss.
    #[instrument(skip(self))]
    pub fn diagnose(&self, raw_id: &str) -> RetrievalFailure {
        let stats = match self.manifest.stats() {
            Ok(stats) => stats,
            Err(err) => return RetrievalFailure::new(ErrorKind::DatabaseError, err.to_string()),
        };
        if stats.entry_count == 0 {
            return RetrievalFailure::new(
                ErrorKind::EmptyDatabase,
                "the manifest contains no papers; run the indexing pipeline first",
            );
        }

        let id = ArxivId::parse(raw_id);
        let lookup_key = id.canonical_key();
        let entry = match self.manifest.lookup(&lookup_key) {
            Ok(entry) => entry,
            Err(err) => return RetrievalFailure::new(ErrorKind::DatabaseError, err.to_string()),
        };

        let Some(entry) = entry else {
            let similar_ids = self
                .manifest
                .find_similar(&lookup_key.chars().take(SIMILAR_PREFIX_LEN).collect::<String>())
                .unwrap_or_default();
            return RetrievalFailure::new(ErrorKind::NotFound, format!("'{raw_id}' was not found"))
                .with_similar_ids(similar_ids)
                .with_tar_hint(id.hint_location());
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
struct UpstreamDocInfo {
    archive_file: Option<String>,
    doc_class: Option<String>,
    year: Option<i32>,
}
