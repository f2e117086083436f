use paperboy_manifest::{DocClass, PatentDocType};

/// One document found while scanning an arXiv bulk tar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperScanEntry {
    pub id: String,
    pub offset: u64,
    pub size: u64,
    pub doc_class: DocClass,
}

/// Result of scanning a single arXiv bulk tar file. Workers producing
/// this must be pure functions of the bytes on disk — no shared state,
/// safe to run across threads.
#[derive(Debug, Clone)]
pub struct TarScanOutcome {
    pub file_hash: String,
    pub mtime: f64,
    pub entries: Vec<PaperScanEntry>,
}

/// One document found while splitting a USPTO bulk zip's inner XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatentScanEntry {
    pub id: String,
    pub offset: u64,
    pub size: u64,
    pub doc_type: PatentDocType,
    pub kind_code: Option<String>,
    pub year: Option<i32>,
}

/// Result of scanning a single USPTO bulk zip file.
#[derive(Debug, Clone)]
pub struct ZipScanOutcome {
    pub file_hash: String,
    pub mtime: f64,
    pub entries: Vec<PatentScanEntry>,
    /// Documents whose `<publication-reference>` block had no
    /// extractable `doc-number`; counted but not returned as entries.
    pub skipped: usize,
}
