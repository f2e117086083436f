use std::path::Path;

use paperboy_manifest::DocClass;
use tracing::warn;

use crate::error::ScanError;
use crate::hash::md5_file;
use crate::mtime_seconds;
use crate::types::{PaperScanEntry, TarScanOutcome};

const KNOWN_EXTENSIONS: &[(&str, DocClass)] = &[
    (".pdf", DocClass::Pdf),
    (".gz", DocClass::SourceGzip),
    (".tar", DocClass::SourceTar),
    (".zip", DocClass::Unknown),
];

/// Stream an arXiv bulk `.tar` and record the payload offset, size, and
/// inferred class of every regular-file member.
///
/// A pure function of the bytes at `path`: no database access, safe to
/// call from any worker thread. Structural or I/O failures are returned
/// as `Err` so the caller can demote them to "this file failed" rather
/// than aborting the whole indexing run.
pub fn scan_tar_file(path: &Path) -> Result<TarScanOutcome, ScanError> {
    let file_hash = md5_file(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mtime = mtime_seconds(path).map_err(|source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let file = fs_err::File::open(path).map_err(|source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = tar::Archive::new(file);

    let mut entries = Vec::new();
    let tar_entries = archive.entries().map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    for entry in tar_entries {
        let entry = entry.map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let entry_path = match entry.path() {
            Ok(p) => p.into_owned(),
            Err(_) => {
                warn!(archive = %path.display(), "skipping tar member with non-UTF8 name");
                continue;
            }
        };
        let Some(name) = entry_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let (id, doc_class) = strip_known_extension(name);
        let offset = entry.raw_file_position();
        let size = entry.header().size().unwrap_or(0);

        entries.push(PaperScanEntry {
            id,
            offset,
            size,
            doc_class,
        });
    }

    Ok(TarScanOutcome {
        file_hash,
        mtime,
        entries,
    })
}

/// Strip one of the known document extensions off a tar member's
/// basename, yielding the canonical paper id and the extension's doc
/// class. An unrecognized extension (or none) is kept verbatim with
/// class `Unknown`, matching the original indexer's permissive fallback.
fn strip_known_extension(basename: &str) -> (String, DocClass) {
    for (ext, class) in KNOWN_EXTENSIONS {
        if let Some(stripped) = basename.strip_suffix(ext) {
            return (stripped.to_string(), *class);
        }
    }
    (basename.to_string(), DocClass::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn scans_a_single_pdf_entry() {
        let dir = tempfile::tempdir().unwrap();
        let tar_path = dir.path().join("arXiv_pdf_1501_001.tar");
        let bytes = build_tar(&[("1501.00963.pdf", b"%PDF-fake-payload")]);
        fs_err::File::create(&tar_path)
            .unwrap()
            .write_all(&bytes)
            .unwrap();

        let result = scan_tar_file(&tar_path).unwrap();
        assert_eq!(result.entries.len(), 1);
        let entry = &result.entries[0];
        assert_eq!(entry.id, "1501.00963");
        assert_eq!(entry.size, 17);
        assert_eq!(entry.doc_class, DocClass::Pdf);
        assert!(!result.file_hash.is_empty());
    }

    #[test]
    fn classifies_source_archives_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let tar_path = dir.path().join("arXiv_src_1501_001.tar");
        let bytes = build_tar(&[
            ("1501.00963.gz", b"gzip-ish"),
            ("astro-ph0412561.tar", b"nested-tar"),
        ]);
        fs_err::File::create(&tar_path)
            .unwrap()
            .write_all(&bytes)
            .unwrap();

        let result = scan_tar_file(&tar_path).unwrap();
        assert_eq!(result.entries[0].doc_class, DocClass::SourceGzip);
        assert_eq!(result.entries[1].doc_class, DocClass::SourceTar);
    }

    #[test]
    fn offsets_skip_the_tar_header() {
        let dir = tempfile::tempdir().unwrap();
        let tar_path = dir.path().join("arXiv_pdf_1501_001.tar");
        let payload = b"%PDF-fake12b";
        let bytes = build_tar(&[("1501.00963.pdf", payload)]);
        fs_err::File::create(&tar_path)
            .unwrap()
            .write_all(&bytes)
            .unwrap();

        let result = scan_tar_file(&tar_path).unwrap();
        let entry = &result.entries[0];

        let on_disk = fs_err::read(&tar_path).unwrap();
        let sliced = &on_disk[entry.offset as usize..entry.offset as usize + entry.size as usize];
        assert_eq!(sliced, payload);
    }

    #[test]
    fn strips_zip_extension_with_unknown_class() {
        let dir = tempfile::tempdir().unwrap();
        let tar_path = dir.path().join("arXiv_src_1501_001.tar");
        let bytes = build_tar(&[("1501.00963.zip", b"nested-zip")]);
        fs_err::File::create(&tar_path)
            .unwrap()
            .write_all(&bytes)
            .unwrap();

        let result = scan_tar_file(&tar_path).unwrap();
        assert_eq!(result.entries[0].id, "1501.00963");
        assert_eq!(result.entries[0].doc_class, DocClass::Unknown);
    }

    #[test]
    fn missing_file_is_a_scan_error_not_a_panic() {
        let result = scan_tar_file(Path::new("/nonexistent/arXiv_pdf_1501_001.tar"));
        assert!(result.is_err());
    }
}
