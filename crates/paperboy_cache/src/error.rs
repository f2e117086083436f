/// Failures from the disk cache. All are local I/O failures; there is
/// no network or database involved at this layer.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache blob of {blob_len} bytes exceeds the {budget}-byte budget")]
    BlobTooLarge { blob_len: u64, budget: u64 },

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
