use std::path::PathBuf;

/// Failures encountered while scanning a bulk archive. Scanners never
/// propagate these out of a pipeline run; they're carried in a
/// `ScanResult::error` field instead so one bad file doesn't abort the
/// whole pass.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive {path} has no recognizable inner document")]
    NoInnerDocument { path: PathBuf },

    #[error("zip archive {path} is malformed: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Failures from fetching an exact byte range out of an archive. These
/// are soft failures for the retrieval engine: a tier that returns one
/// simply has nothing, and the caller moves to the next tier.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("archive file not found: {0}")]
    ArchiveMissing(PathBuf),

    #[error("permission denied reading {0}")]
    PermissionDenied(PathBuf),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("requested range ({offset}, {size}) is out of bounds for {path}")]
    OutOfBounds {
        path: PathBuf,
        offset: u64,
        size: u64,
    },

    #[error("zip archive {path} is malformed: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl FetchError {
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => FetchError::ArchiveMissing(path),
            std::io::ErrorKind::PermissionDenied => FetchError::PermissionDenied(path),
            _ => FetchError::Io { path, source },
        }
    }
}
