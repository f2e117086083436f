use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use paperboy_manifest::{EnrichmentFields, PaperManifest};
use serde_json::Value;
use tracing::warn;

use crate::error::{IndexError, Result};

/// Default transaction size for the enrichment pass, matching the
/// original importer's default.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Per-column population counts after a run, used for the final
/// coverage report.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub total_lines: u64,
    pub matched: u64,
    pub malformed_lines: u64,
    pub coverage: Vec<(&'static str, u64)>,
}

/// Run the metadata enrichment pass: read a Kaggle arXiv metadata dump
/// (JSON-lines, optionally zipped) and backfill the nullable enrichment
/// columns of every row already present in `manifest`. Never inserts a
/// row, never touches `archive_file`/`offset`/`size`/`doc_class`/`year`.
///
/// Malformed lines are logged and skipped, not fatal. Safe to re-run:
/// every update is an overwrite of the same columns from the same
/// source data, so a second pass over the same dump is a no-op beyond
/// the first.
pub fn enrich_from_dump(
    manifest: &PaperManifest,
    dump_path: &Path,
    batch_size: usize,
    mut on_progress: impl FnMut(u64, u64),
) -> Result<EnrichmentReport> {
    let reader = open_dump(dump_path)?;

    let known_ids = manifest.all_ids()?;
    let mut report = EnrichmentReport {
        total_lines: 0,
        matched: 0,
        malformed_lines: 0,
        coverage: Vec::new(),
    };

    let mut batch: Vec<(String, EnrichmentFields)> = Vec::with_capacity(batch_size);

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(line = line_num + 1, error = %err, "failed to read metadata dump line");
                report.malformed_lines += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(err) => {
                warn!(line = line_num + 1, error = %err, "invalid JSON in metadata dump");
                report.malformed_lines += 1;
                continue;
            }
        };

        report.total_lines += 1;

        let Some(raw_id) = value.get("id").and_then(Value::as_str) else {
            continue;
        };
        let normalized_id = normalize_paper_id(raw_id);

        if !known_ids.contains(&normalized_id) {
            continue;
        }
        report.matched += 1;

        batch.push((normalized_id, fields_from_json(&value)));
        if batch.len() >= batch_size {
            manifest.enrich_batch(&batch)?;
            on_progress(report.total_lines, report.matched);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        manifest.enrich_batch(&batch)?;
        on_progress(report.total_lines, report.matched);
    }

    report.coverage = manifest.enrichment_coverage()?;

    Ok(report)
}

/// Normalize a Kaggle-format paper id (`astro-ph/0001001`) into the
/// manifest's slash-free key (`astro-ph0001001`). Deliberately simpler
/// than [`paperboy_ids::ArxivId::parse`]: the Kaggle dump never carries
/// versions or URL wrapping, only the legacy slash.
fn normalize_paper_id(raw_id: &str) -> String {
    raw_id.replace('/', "")
}

fn fields_from_json(value: &Value) -> EnrichmentFields {
    EnrichmentFields {
        categories: extract_field(value, "categories"),
        title: extract_field(value, "title"),
        authors: extract_field(value, "authors"),
        abstract_text: extract_field(value, "abstract"),
        doi: extract_field(value, "doi"),
        journal_ref: extract_field(value, "journal-ref"),
        comments: extract_field(value, "comments"),
        submitter: extract_field(value, "submitter"),
        report_no: extract_field(value, "report-no"),
        versions: extract_field(value, "versions"),
    }
}

/// Pull a field out of the dump's JSON object, joining list values with
/// spaces the way `versions` and some `authors` entries arrive.
fn extract_field(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(json_scalar_to_string)
                .collect::<Vec<_>>()
                .join(" ");
            if joined.is_empty() {
                None
            } else {
                Some(joined)
            }
        }
        other => Some(other.to_string()),
    }
}

fn json_scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn open_dump(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_zip = path.extension().and_then(|e| e.to_str()) == Some("zip");
    let std_file = std::fs::File::open(path).map_err(|source| IndexError::DumpOpen {
        path: path.to_path_buf(),
        source,
    })?;

    if !is_zip {
        return Ok(BufReader::new(Box::new(std_file)));
    }

    let mut zip = zip::ZipArchive::new(std_file)?;
    let json_index = (0..zip.len()).find(|&i| {
        zip.by_index(i)
            .map(|entry| entry.name().to_ascii_lowercase().ends_with(".json"))
            .unwrap_or(false)
    });
    let Some(json_index) = json_index else {
        return Err(IndexError::DumpZipEmpty(path.to_path_buf()));
    };

    let mut contents = Vec::new();
    zip.by_index(json_index)?
        .read_to_end(&mut contents)
        .map_err(|source| IndexError::DumpOpen {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(BufReader::new(Box::new(std::io::Cursor::new(contents))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperboy_manifest::{DocClass, PaperEntry};
    use std::io::Write;

    fn sample_entry(id: &str) -> PaperEntry {
        PaperEntry {
            paper_id: id.to_string(),
            archive_file: "2015/arXiv_pdf_1501_001.tar".to_string(),
            offset: 0,
            size: 10,
            doc_class: DocClass::Pdf,
            year: 2015,
            enrichment: EnrichmentFields::default(),
        }
    }

    fn write_dump(path: &Path, lines: &[&str]) {
        let mut file = fs_err::File::create(path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    #[test]
    fn backfills_known_papers_and_skips_unknown_ones() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        manifest
            .upsert_entries(&[sample_entry("1501.00963"), sample_entry("astroph0001001")])
            .unwrap();

        let dump_path = dir.path().join("dump.json");
        write_dump(
            &dump_path,
            &[
                r#"{"id": "1501.00963", "title": "A Great Paper", "categories": "astro-ph.CO"}"#,
                r#"{"id": "astro-ph/0001001", "title": "Legacy Paper"}"#,
                r#"{"id": "9999.99999", "title": "Not In Our Manifest"}"#,
            ],
        );

        let report = enrich_from_dump(&manifest, &dump_path, 2, |_, _| {}).unwrap();
        assert_eq!(report.total_lines, 3);
        assert_eq!(report.matched, 2);

        let entry = manifest.lookup("1501.00963").unwrap().unwrap();
        assert_eq!(entry.enrichment.title.as_deref(), Some("A Great Paper"));
        assert_eq!(entry.archive_file, "2015/arXiv_pdf_1501_001.tar");

        let legacy = manifest.lookup("astroph0001001").unwrap().unwrap();
        assert_eq!(legacy.enrichment.title.as_deref(), Some("Legacy Paper"));
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        manifest.upsert_entries(&[sample_entry("1501.00963")]).unwrap();

        let dump_path = dir.path().join("dump.json");
        write_dump(
            &dump_path,
            &[
                "not valid json at all",
                r#"{"id": "1501.00963", "title": "Recovered"}"#,
            ],
        );

        let report = enrich_from_dump(&manifest, &dump_path, 100, |_, _| {}).unwrap();
        assert_eq!(report.malformed_lines, 1);
        assert_eq!(report.matched, 1);
        assert_eq!(
            manifest.lookup("1501.00963").unwrap().unwrap().enrichment.title.as_deref(),
            Some("Recovered")
        );
    }

    #[test]
    fn running_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PaperManifest::open(dir.path().join("papers.db")).unwrap();
        manifest.upsert_entries(&[sample_entry("1501.00963")]).unwrap();

        let dump_path = dir.path().join("dump.json");
        write_dump(
            &dump_path,
            &[r#"{"id": "1501.00963", "title": "Stable Title", "categories": "astro-ph.CO"}"#],
        );

        enrich_from_dump(&manifest, &dump_path, 5000, |_, _| {}).unwrap();
        let first = manifest.lookup("1501.00963").unwrap().unwrap();

        enrich_from_dump(&manifest, &dump_path, 5000, |_, _| {}).unwrap();
        let second = manifest.lookup("1501.00963").unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(manifest.stats().unwrap().entry_count, 1);
    }

    #[test]
    fn normalizes_legacy_slash_ids() {
        assert_eq!(normalize_paper_id("astro-ph/0001001"), "astroph0001001");
        assert_eq!(normalize_paper_id("0704.0001"), "0704.0001");
    }
}
