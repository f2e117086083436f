use std::path::PathBuf;

/// Failures from the indexing pipeline and the enrichment pass.
///
/// Per-file scan failures never reach this type — they're counted and
/// logged inline by the pipeline. What lands here is either a setup
/// failure (bad root, bad single-file target) or a manifest write
/// failure, which the workspace's error-handling design treats as fatal
/// for data-integrity reasons.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("archive root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("'{0}' is not a directory")]
    RootNotADirectory(PathBuf),

    #[error("cannot determine a year for '{0}': expected a digit-only parent directory or an arXiv_(pdf|src)_YYMM_NNN.tar filename")]
    UnknownYear(String),

    #[error("single-file target not found: {0}")]
    SingleFileMissing(PathBuf),

    #[error("'{0}' is not a recognized archive extension for this corpus")]
    WrongExtension(PathBuf),

    #[error("failed to build a {0}-worker thread pool: {1}")]
    WorkerPool(usize, rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Manifest(#[from] paperboy_manifest::ManifestError),

    #[error(transparent)]
    Scan(#[from] paperboy_archive::ScanError),

    #[error("I/O error walking the archive tree: {0}")]
    Io(#[from] std::io::Error),

    #[error("the enrichment pass only applies to an arXiv paper manifest, not a USPTO patent manifest")]
    EnrichmentWrongCorpus,

    #[error("failed to open metadata dump {path}: {source}")]
    DumpOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no .json file found inside metadata zip {0}")]
    DumpZipEmpty(PathBuf),

    #[error(transparent)]
    DumpZip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, IndexError>;
