use paperboy_manifest::DocClass;

/// The format filter accepted by every retrieval entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFilter {
    Pdf,
    Source,
    Preferred,
}

impl FormatFilter {
    /// Whether a document of `class` satisfies this filter. `Preferred`
    /// accepts anything; callers treat a `None` filter the same way.
    pub fn accepts(self, class: DocClass) -> bool {
        match self {
            FormatFilter::Preferred => true,
            FormatFilter::Pdf => matches!(class, DocClass::Pdf),
            FormatFilter::Source => matches!(class, DocClass::SourceGzip | DocClass::SourceTar),
        }
    }

    pub fn wants_pdf(filter: Option<FormatFilter>) -> bool {
        !matches!(filter, Some(FormatFilter::Source))
    }

    pub fn wants_source(filter: Option<FormatFilter>) -> bool {
        !matches!(filter, Some(FormatFilter::Pdf))
    }
}

/// Which tier ultimately produced a successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Cache,
    Local,
    Upstream,
    Origin,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Cache => "cache",
            Tier::Local => "local",
            Tier::Upstream => "upstream",
            Tier::Origin => "origin",
        }
    }
}

/// A successfully retrieved document.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub content: Vec<u8>,
    pub content_type: &'static str,
    pub source: Tier,
    pub doc_class: DocClass,
}

/// Metadata-only answer for `get_paper_info` / `get_patent_info`: no
/// payload bytes, just what the manifest (and a filesystem existence
/// check) can say about an identifier.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub canonical_id: String,
    pub archive_file: Option<String>,
    pub doc_class: Option<DocClass>,
    pub year: Option<i32>,
    /// USPTO-only: the kind code suffix (`B2`, `A1`, ...). Always `None`
    /// for arXiv papers.
    pub kind_code: Option<String>,
    /// Whether the backing bulk archive currently exists on disk.
    /// `false` with `archive_file` set means the manifest is stale.
    pub locally_available: bool,
    pub source: Tier,
}

/// Filters accepted by `get_random_paper`.
#[derive(Debug, Clone, Default)]
pub struct RandomPaperQuery {
    pub format: Option<FormatFilter>,
    /// Matches either a legacy-id prefix (`astro-ph`) or any token in
    /// the enrichment `categories` column.
    pub category: Option<String>,
    /// Restrict to entries whose `archive_file` currently exists on
    /// disk. The filesystem is authoritative for this predicate.
    pub local_only: bool,
}
