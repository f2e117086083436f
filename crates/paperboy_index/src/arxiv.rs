use std::path::{Path, PathBuf};
use std::time::Instant;

use once_cell::sync::Lazy;
use paperboy_archive::scan_tar_file;
use paperboy_manifest::{BulkFileRecord, EnrichmentFields, PaperEntry, PaperManifest};
use regex::Regex;
use tracing::{info, warn};

use crate::dispatch::dispatch_scan;
use crate::error::{IndexError, Result};
use crate::progress::{IndexProgress, IndexSummary};

struct WorkItem {
    path: PathBuf,
    relative_path: String,
    year: i32,
}

static BULK_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^arXiv_(?:pdf|src)_(\d{2})(\d{2})_\d{3}\.tar$").unwrap());

/// Derive the 4-digit year encoded in an arXiv bulk filename, e.g.
/// `arXiv_pdf_1501_001.tar` -> `2015`. `YY >= 91` is a 1990s filename
/// (arXiv started in 1991); otherwise 2000s.
pub fn year_from_filename(filename: &str) -> Result<i32> {
    let caps = BULK_FILENAME
        .captures(filename)
        .ok_or_else(|| IndexError::UnknownYear(filename.to_string()))?;
    let yy: i32 = caps[1].parse().unwrap_or(0);
    Ok(if yy >= 91 { 1900 + yy } else { 2000 + yy })
}

/// Scan `root` for year subdirectories and index every `.tar` bulk file
/// found beneath them, skipping files whose `(mtime, hash)` already
/// match the manifest's `bulk_files` record.
///
/// `on_progress` is called once per file that finishes processing
/// (whether indexed, skipped for an unchanged hash, or failed).
pub fn index_arxiv_directory(
    manifest: &PaperManifest,
    root: &Path,
    workers: usize,
    mut on_progress: impl FnMut(&IndexProgress),
) -> Result<IndexSummary> {
    if !root.exists() {
        return Err(IndexError::RootMissing(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(IndexError::RootNotADirectory(root.to_path_buf()));
    }

    let mut work_items = Vec::new();
    let mut skipped_upfront = 0usize;

    let mut year_dirs: Vec<PathBuf> = fs_err::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        })
        .collect();
    year_dirs.sort();

    for year_dir in year_dirs {
        let year: i32 = year_dir
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);

        let mut tar_files: Vec<PathBuf> = fs_err::read_dir(&year_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("tar"))
            .collect();
        tar_files.sort();

        for path in tar_files {
            let relative_path = relative_to(root, &path);
            if should_skip(manifest, &relative_path, &path)? {
                skipped_upfront += 1;
                continue;
            }
            work_items.push(WorkItem { path, relative_path, year });
        }
    }

    let files_total = work_items.len();
    info!(skipped_upfront, files_total, "arXiv directory enumerated");
    if files_total == 0 {
        return Ok(IndexSummary {
            files_skipped: skipped_upfront,
            ..Default::default()
        });
    }

    let start = Instant::now();
    let mut summary = IndexSummary {
        files_skipped: skipped_upfront,
        ..Default::default()
    };
    let mut files_done = 0usize;

    dispatch_scan(work_items, workers, |item: &WorkItem| scan_tar_file(&item.path), |item, outcome| {
        files_done += 1;
        match outcome {
            Err(err) => {
                warn!(file = %item.relative_path, error = %err, "failed to scan arXiv bulk file");
                summary.files_failed += 1;
            }
            Ok(outcome) => {
                let existing = manifest.is_processed(&item.relative_path).ok().flatten();
                let hash_unchanged = existing
                    .as_ref()
                    .is_some_and(|(hash, _)| hash == &outcome.file_hash);

                if hash_unchanged {
                    info!(file = %item.relative_path, "hash unchanged on full check, refreshing mtime only");
                } else {
                    let entries: Vec<PaperEntry> = outcome
                        .entries
                        .into_iter()
                        .map(|e| PaperEntry {
                            paper_id: e.id,
                            archive_file: item.relative_path.clone(),
                            offset: e.offset,
                            size: e.size,
                            doc_class: e.doc_class,
                            year: item.year,
                            enrichment: EnrichmentFields::default(),
                        })
                        .collect();
                    let entries_len = entries.len() as u64;

                    match manifest.upsert_entries(&entries) {
                        Ok(()) => {
                            summary.entries_added += entries_len;
                            summary.files_indexed += 1;
                            info!(file = %item.relative_path, entries = entries_len, "indexed arXiv bulk file");
                        }
                        Err(err) => {
                            summary.files_failed += 1;
                            warn!(file = %item.relative_path, error = %err, "manifest write failed");
                            return;
                        }
                    }
                }

                if let Err(err) = manifest.mark_processed(&BulkFileRecord {
                    file_path: item.relative_path.clone(),
                    file_hash: outcome.file_hash,
                    last_modified: outcome.mtime,
                }) {
                    warn!(file = %item.relative_path, error = %err, "failed to record bulk-file processed state");
                }
            }
        }

        on_progress(&IndexProgress {
            files_done,
            files_total,
            entries_added: summary.entries_added,
            files_failed: summary.files_failed,
            elapsed: start.elapsed(),
        });
    })?;

    Ok(summary)
}

/// Index a single `.tar` file, given either an absolute path or a bare
/// filename to be located under `<root>/<year>/<filename>`.
pub fn index_single_file(manifest: &PaperManifest, file_input: &str, root: &Path) -> Result<IndexSummary> {
    let path = resolve_single_file(file_input, root)?;
    let relative_path = relative_to(root, &path);
    let year = infer_year(root, &path)?;

    if should_skip(manifest, &relative_path, &path)? {
        return Ok(IndexSummary { files_skipped: 1, ..Default::default() });
    }

    // A scan failure here is fatal for single-file mode — there is no
    // pipeline of other files to fall back to.
    let outcome = scan_tar_file(&path)?;

    let entries: Vec<PaperEntry> = outcome
        .entries
        .into_iter()
        .map(|e| PaperEntry {
            paper_id: e.id,
            archive_file: relative_path.clone(),
            offset: e.offset,
            size: e.size,
            doc_class: e.doc_class,
            year,
            enrichment: EnrichmentFields::default(),
        })
        .collect();
    let entries_added = entries.len() as u64;

    manifest.upsert_entries(&entries)?;
    manifest.mark_processed(&BulkFileRecord {
        file_path: relative_path,
        file_hash: outcome.file_hash,
        last_modified: outcome.mtime,
    })?;

    Ok(IndexSummary {
        files_indexed: 1,
        entries_added,
        ..Default::default()
    })
}

fn infer_year(root: &Path, path: &Path) -> Result<i32> {
    let relative_path = relative_to(root, path);
    let mut parts = relative_path.split('/');
    if let Some(first) = parts.next() {
        if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(year) = first.parse() {
                return Ok(year);
            }
        }
    }
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    year_from_filename(filename)
}

fn resolve_single_file(file_input: &str, root: &Path) -> Result<PathBuf> {
    let candidate = Path::new(file_input);
    if candidate.is_absolute() && candidate.exists() {
        if candidate.extension().and_then(|e| e.to_str()) != Some("tar") {
            return Err(IndexError::WrongExtension(candidate.to_path_buf()));
        }
        return Ok(candidate.to_path_buf());
    }

    let filename = candidate
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IndexError::SingleFileMissing(candidate.to_path_buf()))?;
    if !filename.ends_with(".tar") {
        return Err(IndexError::WrongExtension(PathBuf::from(filename)));
    }

    let year = year_from_filename(filename)?;
    let expected = root.join(year.to_string()).join(filename);
    if !expected.exists() {
        return Err(IndexError::SingleFileMissing(expected));
    }
    Ok(expected)
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Cheap-path skip check: if `path`'s current mtime matches the stored
/// value, the manifest already reflects it and no hash needs computing.
/// A mismatch (or no prior record) means the caller must scan and let
/// the full-hash comparison in the ingest step make the final call.
fn should_skip(manifest: &PaperManifest, relative_path: &str, path: &Path) -> Result<bool> {
    let Some((_, stored_mtime)) = manifest.is_processed(relative_path)? else {
        return Ok(false);
    };
    let current_mtime = paperboy_archive::mtime_seconds(path).unwrap_or(f64::NAN);
    Ok(current_mtime == stored_mtime)
}
