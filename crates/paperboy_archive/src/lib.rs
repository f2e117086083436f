//! Bulk archive scanning and byte-range extraction.
//!
//! Two independent scanners share no state and no manifest access: the
//! arXiv [`scanner_tar`] streams `.tar` bulk files and records the
//! payload offset of every member; the USPTO [`scanner_zip`] splits a
//! zip's single inner XML file on `<?xml` declarations. Both are pure
//! functions of the bytes on disk, safe to run in parallel across a
//! worker pool. [`fetch`] is the read-side counterpart: given the
//! `(archive_file, offset, size)` a scanner produced, pull the exact
//! byte range back out.

mod error;
mod fetch;
mod hash;
mod scanner_tar;
mod scanner_zip;
mod sniff;
mod types;

pub use error::{FetchError, ScanError};
pub use fetch::{fetch_tar_range, fetch_zip_range};
pub use hash::md5_file;
pub use scanner_tar::scan_tar_file;
pub use scanner_zip::scan_zip_file;
pub use sniff::sniff_doc_class;
pub use types::{PaperScanEntry, PatentScanEntry, TarScanOutcome, ZipScanOutcome};

use std::path::Path;
use std::time::UNIX_EPOCH;

/// Modification time of `path`, as seconds since the Unix epoch — the
/// same representation the manifest's `bulk_files.last_modified` column
/// stores, so it compares directly against a previously recorded value.
pub fn mtime_seconds(path: &Path) -> std::io::Result<f64> {
    let meta = fs_err::metadata(path)?;
    let modified = meta.modified()?;
    let duration = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Ok(duration.as_secs_f64())
}
