//! Tiered document retrieval: disk cache, local bulk archive, a
//! configured upstream mirror, and — for arXiv only — the origin of
//! record itself.
//!
//! [`paper_engine::ArxivEngine`] and [`patent_engine::PatentEngine`]
//! share the same shape (resolve an identifier, walk a fallback chain
//! of [`tier::FetchTier`] implementations, classify what's left as a
//! [`error::RetrievalFailure`]) but are kept as separate types rather
//! than one generic engine: arXiv has versioning and an origin tier,
//! USPTO has neither, and forcing both through one abstraction would
//! cost more in conditionals than it saves in code.

mod error;
mod paper_engine;
mod patent_engine;
mod tier;
mod types;

pub use error::{ErrorKind, RetrievalFailure, Result};
pub use paper_engine::ArxivEngine;
pub use patent_engine::PatentEngine;
pub use tier::{ArxivOriginFetchTier, CacheFetchTier, FetchTier, UpstreamFetchTier};
pub use types::{DocumentInfo, FetchedDocument, FormatFilter, RandomPaperQuery, Tier};

use std::time::Duration;

use paperboy_cache::DiskCache;
use paperboy_config::Config;
use paperboy_manifest::{PaperManifest, PatentManifest};

/// Build an [`ArxivEngine`] from the workspace's typed configuration,
/// opening the manifest and (optionally) the disk cache as a side
/// effect.
pub fn arxiv_engine_from_config(config: &Config) -> anyhow::Result<ArxivEngine> {
    let db_path = config
        .index_db_path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("INDEX_DB_PATH is not configured"))?;
    let archive_root = config.tar_dir_path.clone();

    let manifest = PaperManifest::open(&db_path)?;
    let cache = match &config.cache_dir_path {
        Some(dir) => Some(DiskCache::open(dir, config.cache_max_size_bytes())?),
        None => None,
    };
    let upstream_url = if config.upstream_enabled { config.upstream_server_url.clone() } else { None };

    Ok(ArxivEngine::new(
        manifest,
        archive_root,
        cache,
        upstream_url,
        config.upstream_timeout,
        config.arxiv_fallback_enabled,
        config.arxiv_timeout,
    )?)
}

/// Build a [`PatentEngine`] from the workspace's typed configuration.
pub fn patent_engine_from_config(config: &Config) -> anyhow::Result<PatentEngine> {
    let db_path = config
        .patent_index_db_path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("PATENT_INDEX_DB_PATH is not configured"))?;
    let manifest = PatentManifest::open(&db_path)?;
    let upstream_url = if config.upstream_enabled { config.upstream_server_url.clone() } else { None };
    Ok(PatentEngine::new(manifest, config.patent_bulk_dir_path.clone(), upstream_url, config.upstream_timeout)?)
}

/// Default per-request deadline used when a caller builds tiers by hand
/// rather than going through [`Config`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
