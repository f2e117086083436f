//! Persistent manifest store mapping canonical document ids to byte
//! ranges inside bulk archives.
//!
//! Two corpora, two sibling schemas ([`PaperManifest`] for arXiv,
//! [`PatentManifest`] for USPTO), sharing the same connection-pairing
//! and bulk-file tracking machinery under the hood. A single dedicated
//! write connection keeps batch commits atomic; a separate read-only
//! connection keeps lookups from ever blocking behind an in-progress
//! indexing run.

mod conn;
mod error;
mod paper;
mod patent;
mod types;

pub use error::{ManifestError, Result};
pub use paper::PaperManifest;
pub use patent::PatentManifest;
pub use types::{
    BulkFileRecord, DocClass, EnrichmentFields, ManifestStats, PaperEntry, PatentDocType,
    PatentEntry, RandomPaperFilter,
};
