use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use paperboy_archive::scan_zip_file;
use paperboy_manifest::{BulkFileRecord, PatentEntry, PatentManifest};
use tracing::{info, warn};

use crate::dispatch::dispatch_scan;
use crate::error::{IndexError, Result};
use crate::progress::{IndexProgress, IndexSummary};

/// The three places a USPTO bulk zip can live: the two conventional
/// subdirectories, plus the root itself for a flat drop of files.
const SEARCH_DIRS: &[&str] = &["PTGRXML", "APPXML"];

struct WorkItem {
    path: PathBuf,
    relative_path: String,
}

/// Scan `root` for `.zip` bulk files under `PTGRXML/`, `APPXML/`, and the
/// root itself, indexing every patent found and skipping files whose
/// `(mtime, hash)` already match the manifest's `bulk_files` record.
pub fn index_uspto_directory(
    manifest: &PatentManifest,
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

    let mut seen = HashSet::new();
    let mut work_items = Vec::new();
    let mut skipped_upfront = 0usize;

    let mut search_roots = vec![root.to_path_buf()];
    for sub in SEARCH_DIRS {
        let dir = root.join(sub);
        if dir.is_dir() {
            search_roots.push(dir);
        }
    }

    for dir in search_roots {
        let mut zip_files: Vec<PathBuf> = fs_err::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("zip"))
            .collect();
        zip_files.sort();

        for path in zip_files {
            let canonical = fs_err::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if !seen.insert(canonical) {
                continue;
            }
            let relative_path = relative_to(root, &path);
            if should_skip(manifest, &relative_path, &path)? {
                skipped_upfront += 1;
                continue;
            }
            work_items.push(WorkItem { path, relative_path });
        }
    }

    let files_total = work_items.len();
    info!(skipped_upfront, files_total, "USPTO directory enumerated");
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

    dispatch_scan(work_items, workers, |item: &WorkItem| scan_zip_file(&item.path), |item, outcome| {
        files_done += 1;
        match outcome {
            Err(err) => {
                warn!(file = %item.relative_path, error = %err, "failed to scan USPTO bulk file");
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
                    if outcome.skipped > 0 {
                        warn!(file = %item.relative_path, skipped = outcome.skipped, "patents without an extractable doc-number");
                    }
                    let entries: Vec<PatentEntry> = outcome
                        .entries
                        .into_iter()
                        .map(|e| PatentEntry {
                            patent_id: e.id,
                            archive_file: item.relative_path.clone(),
                            offset: e.offset,
                            size: e.size,
                            doc_type: e.doc_type,
                            kind_code: e.kind_code,
                            year: e.year,
                        })
                        .collect();
                    let entries_len = entries.len() as u64;

                    match manifest.upsert_entries(&entries) {
                        Ok(()) => {
                            summary.entries_added += entries_len;
                            summary.files_indexed += 1;
                            info!(file = %item.relative_path, entries = entries_len, "indexed USPTO bulk file");
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

/// Index a single `.zip` file, given either an absolute path or a bare
/// filename to be located in the root itself or one of its `PTGRXML`/
/// `APPXML` subdirectories.
pub fn index_single_file(manifest: &PatentManifest, file_input: &str, root: &Path) -> Result<IndexSummary> {
    let path = resolve_single_file(file_input, root)?;
    let relative_path = relative_to(root, &path);

    if should_skip(manifest, &relative_path, &path)? {
        return Ok(IndexSummary { files_skipped: 1, ..Default::default() });
    }

    let outcome = scan_zip_file(&path)?;

    let entries: Vec<PatentEntry> = outcome
        .entries
        .into_iter()
        .map(|e| PatentEntry {
            patent_id: e.id,
            archive_file: relative_path.clone(),
            offset: e.offset,
            size: e.size,
            doc_type: e.doc_type,
            kind_code: e.kind_code,
            year: e.year,
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

fn resolve_single_file(file_input: &str, root: &Path) -> Result<PathBuf> {
    let candidate = Path::new(file_input);
    if candidate.is_absolute() && candidate.exists() {
        if candidate.extension().and_then(|e| e.to_str()) != Some("zip") {
            return Err(IndexError::WrongExtension(candidate.to_path_buf()));
        }
        return Ok(candidate.to_path_buf());
    }

    let filename = candidate
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IndexError::SingleFileMissing(candidate.to_path_buf()))?;
    if !filename.ends_with(".zip") {
        return Err(IndexError::WrongExtension(PathBuf::from(filename)));
    }

    let mut candidates = vec![root.join(filename)];
    for sub in SEARCH_DIRS {
        candidates.push(root.join(sub).join(filename));
    }
    candidates
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| IndexError::SingleFileMissing(root.join(filename)))
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn should_skip(manifest: &PatentManifest, relative_path: &str, path: &Path) -> Result<bool> {
    let Some((_, stored_mtime)) = manifest.is_processed(relative_path)? else {
        return Ok(false);
    };
    let current_mtime = paperboy_archive::mtime_seconds(path).unwrap_or(f64::NAN);
    Ok(current_mtime == stored_mtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn grant_block(doc_number: &str) -> Vec<u8> {
        format!(
            "<?xml version=\"1.0\"?>\n<us-patent-grant>\n<publication-reference><document-id><doc-number>{doc_number}</doc-number><kind>B2</kind><date>20210105</date></document-id></publication-reference>\n</us-patent-grant>"
        )
        .into_bytes()
    }

    fn write_zip(path: &Path, xml_name: &str, content: &[u8]) {
        fs_err::create_dir_all(path.parent().unwrap()).unwrap();
        let file = fs_err::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(xml_name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn indexes_a_fresh_tree_and_then_skips_everything_on_rerun() {
        let archive_dir = tempfile::tempdir().unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        let zip_path = archive_dir.path().join("PTGRXML/ipg210105.zip");
        write_zip(&zip_path, "ipg210105.xml", &grant_block("11123456"));

        let manifest = PatentManifest::open(db_dir.path().join("patents.db")).unwrap();
        let summary = index_uspto_directory(&manifest, archive_dir.path(), 2, |_| {}).unwrap();
        assert_eq!(summary.files_indexed, 1);
        assert_eq!(summary.entries_added, 1);
        assert!(manifest.lookup("11123456").unwrap().is_some());

        let rerun = index_uspto_directory(&manifest, archive_dir.path(), 2, |_| {}).unwrap();
        assert_eq!(rerun.files_indexed, 0);
        assert_eq!(rerun.files_skipped, 1);
    }

    #[test]
    fn single_file_mode_locates_under_subdirectory() {
        let archive_dir = tempfile::tempdir().unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        let zip_path = archive_dir.path().join("APPXML/ipa210105.zip");
        write_zip(&zip_path, "ipa210105.xml", &grant_block("20210012345"));

        let manifest = PatentManifest::open(db_dir.path().join("patents.db")).unwrap();
        let summary = index_single_file(&manifest, "ipa210105.zip", archive_dir.path()).unwrap();
        assert_eq!(summary.files_indexed, 1);
        assert!(manifest.lookup("20210012345").unwrap().is_some());
    }

    #[test]
    fn does_not_double_count_a_file_reachable_two_ways() {
        let archive_dir = tempfile::tempdir().unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        let zip_path = archive_dir.path().join("ipg210105.zip");
        write_zip(&zip_path, "ipg210105.xml", &grant_block("11123456"));

        let manifest = PatentManifest::open(db_dir.path().join("patents.db")).unwrap();
        let summary = index_uspto_directory(&manifest, archive_dir.path(), 1, |_| {}).unwrap();
        assert_eq!(summary.files_indexed, 1);
    }
}
