use std::fmt;

use paperboy_ids::ArxivLocationHint;

/// The fixed taxonomy of user-visible retrieval failures (§7). Every
/// failure the engine surfaces across its public API boils down to one
/// of these; anything richer (similar ids, the exact missing archive
/// path, a tar-location hint) rides along on [`RetrievalFailure`]
/// instead of being folded into a bigger enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    VersionNotFound,
    FormatUnavailable,
    ArchiveMissing,
    PermissionDenied,
    EmptyDatabase,
    DatabaseError,
    SystemError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::VersionNotFound => "version_not_found",
            ErrorKind::FormatUnavailable => "format_unavailable",
            ErrorKind::ArchiveMissing => "archive_missing",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::EmptyDatabase => "empty_database",
            ErrorKind::DatabaseError => "database_error",
            ErrorKind::SystemError => "system_error",
        }
    }
}

/// A structured, user-facing retrieval failure. The HTTP layer (out of
/// scope here) maps `kind` to a status code and renders the rest as
/// diagnostic detail; this engine never does its own presentation.
#[derive(Debug, Clone)]
pub struct RetrievalFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// Expected bulk-file location patterns, populated only when the id
    /// parses as an arXiv identifier and no manifest entry was found.
    pub tar_hint: Option<ArxivLocationHint>,
    /// The exact archive path that was expected but absent, populated
    /// only for `ArchiveMissing`.
    pub archive_file: Option<String>,
    /// Up to 3 similarly-prefixed ids, populated only for `NotFound`.
    pub similar_ids: Vec<String>,
}

impl RetrievalFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RetrievalFailure {
            kind,
            message: message.into(),
            tar_hint: None,
            archive_file: None,
            similar_ids: Vec::new(),
        }
    }

    pub fn with_tar_hint(mut self, hint: ArxivLocationHint) -> Self {
        self.tar_hint = Some(hint);
        self
    }

    pub fn with_archive_file(mut self, archive_file: impl Into<String>) -> Self {
        self.archive_file = Some(archive_file.into());
        self
    }

    pub fn with_similar_ids(mut self, ids: Vec<String>) -> Self {
        self.similar_ids = ids;
        self
    }
}

impl fmt::Display for RetrievalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for RetrievalFailure {}

impl From<paperboy_manifest::ManifestError> for RetrievalFailure {
    fn from(err: paperboy_manifest::ManifestError) -> Self {
        RetrievalFailure::new(ErrorKind::DatabaseError, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RetrievalFailure>;
