/// Document class, inferred by the archive scanner from the entry's
/// extension (arXiv) or left `Unknown` until content-sniffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocClass {
    Pdf,
    SourceGzip,
    SourceTar,
    Xml,
    Unknown,
}

impl DocClass {
    pub fn as_db_str(self) -> &'static str {
        match self {
            DocClass::Pdf => "pdf",
            DocClass::SourceGzip => "source_gzip",
            DocClass::SourceTar => "source_tar",
            DocClass::Xml => "xml",
            DocClass::Unknown => "unknown",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "pdf" => DocClass::Pdf,
            "source_gzip" => DocClass::SourceGzip,
            "source_tar" => DocClass::SourceTar,
            "xml" => DocClass::Xml,
            _ => DocClass::Unknown,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            DocClass::Pdf => "application/pdf",
            DocClass::SourceGzip => "application/gzip",
            DocClass::SourceTar => "application/x-tar",
            DocClass::Xml => "application/xml",
            DocClass::Unknown => "application/octet-stream",
        }
    }
}

/// USPTO publication type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatentDocType {
    Grant,
    Application,
    Unknown,
}

impl PatentDocType {
    pub fn as_db_str(self) -> &'static str {
        match self {
            PatentDocType::Grant => "grant",
            PatentDocType::Application => "application",
            PatentDocType::Unknown => "unknown",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "grant" => PatentDocType::Grant,
            "application" => PatentDocType::Application,
            _ => PatentDocType::Unknown,
        }
    }
}

/// Optional enrichment fields backfilled by the metadata enrichment pass.
/// Every field is nullable; a freshly indexed paper has all of them unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentFields {
    pub categories: Option<String>,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub abstract_text: Option<String>,
    pub doi: Option<String>,
    pub journal_ref: Option<String>,
    pub comments: Option<String>,
    pub submitter: Option<String>,
    pub report_no: Option<String>,
    pub versions: Option<String>,
}

/// A row in `paper_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperEntry {
    pub paper_id: String,
    pub archive_file: String,
    pub offset: u64,
    pub size: u64,
    pub doc_class: DocClass,
    pub year: i32,
    pub enrichment: EnrichmentFields,
}

/// A row in `patent_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatentEntry {
    pub patent_id: String,
    pub archive_file: String,
    pub offset: u64,
    pub size: u64,
    pub doc_type: PatentDocType,
    pub kind_code: Option<String>,
    pub year: Option<i32>,
}

/// A row in `bulk_files`, tracking whether an archive has already been
/// scanned.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFileRecord {
    pub file_path: String,
    pub file_hash: String,
    pub last_modified: f64,
}

/// Filters accepted by `random_entry`. `doc_class` is a set rather than
/// a single value so a "source" format filter (which spans both
/// `SourceGzip` and `SourceTar`) can be expressed without a second
/// round trip.
#[derive(Debug, Clone, Default)]
pub struct RandomPaperFilter {
    pub doc_class: Vec<DocClass>,
    pub category_prefix: Option<String>,
    pub local_only_archives: Option<Vec<String>>,
}

/// Summary statistics surfaced by the indexing CLI's final report.
#[derive(Debug, Clone, Default)]
pub struct ManifestStats {
    pub entry_count: u64,
    pub distinct_years: Vec<i32>,
    pub distinct_archives: u64,
}
