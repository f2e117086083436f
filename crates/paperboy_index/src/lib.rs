//! Indexing pipeline orchestration: directory enumeration, the
//! mtime/hash skip decision, worker-pool dispatch of pure archive
//! scanners, and the single-writer ingest step that lands results in
//! the manifest. One module per corpus, plus the metadata enrichment
//! pass that backfills arXiv rows after the fact.

mod dispatch;
mod enrich;
mod error;
mod progress;

pub mod arxiv;
pub mod uspto;

pub use dispatch::default_worker_count;
pub use enrich::{enrich_from_dump, EnrichmentReport, DEFAULT_BATCH_SIZE};
pub use error::{IndexError, Result};
pub use progress::{IndexProgress, IndexSummary};
