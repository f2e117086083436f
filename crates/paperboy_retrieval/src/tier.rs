use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use paperboy_cache::DiskCache;
use regex::Regex;
use tracing::warn;

use crate::types::{FormatFilter, Tier};

/// A fetch capability: given a canonical id and an optional format
/// filter, produce the document's bytes or admit it has nothing. Every
/// tier in the engine's fallback chain implements this so the chain
/// itself never hard-codes HTTP or archive specifics.
pub trait FetchTier: Send + Sync {
    fn tier(&self) -> Tier;
    fn fetch(&self, canonical_id: &str, format: Option<FormatFilter>) -> Option<Vec<u8>>;
}

/// The disk cache, consulted first and populated on every successful
/// fetch from a slower tier.
pub struct CacheFetchTier<'a> {
    pub cache: &'a DiskCache,
}

impl FetchTier for CacheFetchTier<'_> {
    fn tier(&self) -> Tier {
        Tier::Cache
    }

    fn fetch(&self, canonical_id: &str, _format: Option<FormatFilter>) -> Option<Vec<u8>> {
        match self.cache.get(canonical_id) {
            Ok(hit) => hit,
            Err(err) => {
                warn!(id = canonical_id, error = %err, "cache read failed");
                None
            }
        }
    }
}

/// A configured upstream mirror, queried with a single GET before
/// falling back to origin-of-record (arXiv) or giving up (USPTO).
pub struct UpstreamFetchTier {
    pub client: reqwest::blocking::Client,
    pub base_url: String,
    /// `"paper"` or `"patent"`, matching the upstream's own routing.
    pub path_segment: &'static str,
}

impl UpstreamFetchTier {
    pub fn new(base_url: String, timeout: Duration, path_segment: &'static str) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(UpstreamFetchTier { client, base_url, path_segment })
    }
}

impl FetchTier for UpstreamFetchTier {
    fn tier(&self) -> Tier {
        Tier::Upstream
    }

    fn fetch(&self, canonical_id: &str, _format: Option<FormatFilter>) -> Option<Vec<u8>> {
        let url = format!("{}/{}/{}", self.base_url.trim_end_matches('/'), self.path_segment, canonical_id);
        match self.client.get(&url).send() {
            Ok(resp) if resp.status().is_success() => resp.bytes().ok().map(|b| b.to_vec()),
            Ok(resp) if resp.status().as_u16() == 404 => None,
            Ok(resp) => {
                warn!(id = canonical_id, status = %resp.status(), "upstream returned an unexpected status");
                None
            }
            Err(err) => {
                warn!(id = canonical_id, error = %err, "upstream request failed");
                None
            }
        }
    }
}

static LEGACY_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-zA-Z-]+)(\d+)$").unwrap());

/// Reinsert the `/` a legacy arXiv id lost during normalization, since
/// arxiv.org's own URLs expect `astro-ph/0412561`, not `astro-ph0412561`.
pub(crate) fn origin_path_id(base: &str) -> String {
    match LEGACY_ID.captures(base) {
        Some(caps) => format!("{}/{}", &caps[1], &caps[2]),
        None => base.to_string(),
    }
}

/// arXiv's own servers, the last resort when neither the local archive
/// nor an upstream mirror had the paper.
pub struct ArxivOriginFetchTier {
    pub client: reqwest::blocking::Client,
}

impl ArxivOriginFetchTier {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(ArxivOriginFetchTier { client })
    }
}

impl FetchTier for ArxivOriginFetchTier {
    fn tier(&self) -> Tier {
        Tier::Origin
    }

    fn fetch(&self, canonical_id: &str, format: Option<FormatFilter>) -> Option<Vec<u8>> {
        let path_id = origin_path_id(canonical_id);

        if FormatFilter::wants_pdf(format) {
            let url = format!("https://arxiv.org/pdf/{path_id}.pdf");
            if let Ok(resp) = self.client.get(&url).send() {
                if resp.status().is_success() {
                    if let Ok(bytes) = resp.bytes() {
                        if bytes.starts_with(b"%PDF") {
                            return Some(bytes.to_vec());
                        }
                    }
                }
            }
        }

        if FormatFilter::wants_source(format) {
            let url = format!("https://export.arxiv.org/e-print/{path_id}");
            if let Ok(resp) = self.client.get(&url).send() {
                if resp.status().is_success() {
                    if let Ok(bytes) = resp.bytes() {
                        return Some(bytes.to_vec());
                    }
                }
            }
        }

        None
    }
}

pub fn archive_exists(archive_root: &Path, archive_file: &str) -> bool {
    archive_root.join(archive_file).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinserts_slash_for_legacy_ids() {
        assert_eq!(origin_path_id("astro-ph0412561"), "astro-ph/0412561");
    }

    #[test]
    fn leaves_new_style_ids_untouched() {
        assert_eq!(origin_path_id("1501.00963"), "1501.00963");
    }
}
