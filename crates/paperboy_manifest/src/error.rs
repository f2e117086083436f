use std::path::PathBuf;

/// Failures from the manifest store.
///
/// These are storage-layer failures (schema, I/O, SQL) — not the
/// user-facing retrieval taxonomy, which lives in `paperboy_retrieval`.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to open manifest database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to create manifest schema: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("manifest query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("failed to begin manifest transaction: {0}")]
    BeginTransaction(#[source] rusqlite::Error),

    #[error("failed to commit manifest transaction, batch rolled back: {0}")]
    Commit(#[source] rusqlite::Error),

    #[error("manifest write connection is poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, ManifestError>;
