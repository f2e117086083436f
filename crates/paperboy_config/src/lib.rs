//! Typed configuration for the retrieval engine and the indexing CLIs.
//!
//! One flat struct read from the process environment, no dynamic reload
//! and no generic config bag — every field in §6 of the workspace's
//! specification gets a named, typed accessor. Paths and toggles are
//! read with explicit defaults; nothing here talks to a config file.

mod error;

pub use error::{ConfigError, Result};

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_UPSTREAM_TIMEOUT_SECS: f64 = 30.0;
const DEFAULT_ARXIV_TIMEOUT_SECS: f64 = 30.0;
const DEFAULT_CACHE_MAX_SIZE_GB: f64 = 1.0;

/// The full set of environment-sourced settings the retrieval engine and
/// indexing CLIs recognize.
#[derive(Debug, Clone)]
pub struct Config {
    /// arXiv manifest database path.
    pub index_db_path: Option<PathBuf>,
    /// arXiv bulk archive root.
    pub tar_dir_path: Option<PathBuf>,
    /// USPTO manifest database path.
    pub patent_index_db_path: Option<PathBuf>,
    /// USPTO bulk archive root.
    pub patent_bulk_dir_path: Option<PathBuf>,

    /// Base URL of an upstream mirror consulted before origin-of-record.
    pub upstream_server_url: Option<String>,
    /// Per-request deadline for the upstream tier.
    pub upstream_timeout: Duration,
    /// Whether the upstream tier is consulted at all.
    pub upstream_enabled: bool,

    /// Directory backing the disk LRU blob cache.
    pub cache_dir_path: Option<PathBuf>,
    /// Total byte budget for the disk cache, in gigabytes.
    pub cache_max_size_gb: f64,

    /// Whether the arXiv origin-of-record tier (arxiv.org direct) runs.
    pub arxiv_fallback_enabled: bool,
    /// Per-request deadline for the origin-of-record tier.
    pub arxiv_timeout: Duration,
}

impl Config {
    /// Read every recognized key from the process environment. Missing
    /// optional keys fall back to their documented defaults; missing
    /// path keys are left `None` (callers that need them call
    /// [`Config::require_arxiv_paths`] / [`Config::require_patent_paths`]
    /// to turn that into a startup error).
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            index_db_path: env_path("INDEX_DB_PATH"),
            tar_dir_path: env_path("TAR_DIR_PATH"),
            patent_index_db_path: env_path("PATENT_INDEX_DB_PATH"),
            patent_bulk_dir_path: env_path("PATENT_BULK_DIR_PATH"),

            upstream_server_url: env_string("UPSTREAM_SERVER_URL"),
            upstream_timeout: env_duration_secs("UPSTREAM_TIMEOUT", DEFAULT_UPSTREAM_TIMEOUT_SECS)?,
            upstream_enabled: env_bool("UPSTREAM_ENABLED", true)?,

            cache_dir_path: env_path("CACHE_DIR_PATH"),
            cache_max_size_gb: env_f64("CACHE_MAX_SIZE_GB", DEFAULT_CACHE_MAX_SIZE_GB)?,

            arxiv_fallback_enabled: env_bool("ARXIV_FALLBACK_ENABLED", false)?,
            arxiv_timeout: env_duration_secs("ARXIV_TIMEOUT", DEFAULT_ARXIV_TIMEOUT_SECS)?,
        })
    }

    /// Total cache budget in bytes, as the disk cache crate wants it.
    pub fn cache_max_size_bytes(&self) -> u64 {
        (self.cache_max_size_gb * 1024.0 * 1024.0 * 1024.0) as u64
    }

    /// Validate that the arXiv retrieval path's required settings are
    /// present, mirroring the original retriever's startup check.
    pub fn require_arxiv_paths(&self) -> Result<(&PathBuf, &PathBuf)> {
        let db = self
            .index_db_path
            .as_ref()
            .ok_or(ConfigError::Missing("INDEX_DB_PATH"))?;
        let root = self
            .tar_dir_path
            .as_ref()
            .ok_or(ConfigError::Missing("TAR_DIR_PATH"))?;
        Ok((db, root))
    }

    /// Validate that the USPTO retrieval path's required settings are
    /// present.
    pub fn require_patent_paths(&self) -> Result<&PathBuf> {
        self.patent_index_db_path
            .as_ref()
            .ok_or(ConfigError::Missing("PATENT_INDEX_DB_PATH"))
    }
}

fn env_string(key: &'static str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_path(key: &'static str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}

fn env_bool(key: &'static str, default: bool) -> Result<bool> {
    match env_string(key) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key, value: raw }),
        },
    }
}

fn env_f64(key: &'static str, default: f64) -> Result<f64> {
    match env_string(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

fn env_duration_secs(key: &'static str, default_secs: f64) -> Result<Duration> {
    let secs = env_f64(key, default_secs)?;
    Ok(Duration::from_secs_f64(secs.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the tests that
    // touch them so they don't interfere with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap();
        for (k, v) in vars {
            std::env::set_var(k, v);
        }
        f();
        for (k, _) in vars {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        with_env(&[], || {
            let config = Config::from_env().unwrap();
            assert!(config.index_db_path.is_none());
            assert!(config.upstream_enabled);
            assert!(!config.arxiv_fallback_enabled);
            assert_eq!(config.cache_max_size_gb, 1.0);
        });
    }

    #[test]
    fn reads_paths_and_toggles() {
        with_env(
            &[
                ("INDEX_DB_PATH", "/data/arxiv.db"),
                ("TAR_DIR_PATH", "/data/arxiv"),
                ("UPSTREAM_ENABLED", "false"),
                ("CACHE_MAX_SIZE_GB", "4.5"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.index_db_path, Some(PathBuf::from("/data/arxiv.db")));
                assert_eq!(config.tar_dir_path, Some(PathBuf::from("/data/arxiv")));
                assert!(!config.upstream_enabled);
                assert_eq!(config.cache_max_size_gb, 4.5);
                assert_eq!(config.cache_max_size_bytes(), (4.5 * 1024.0 * 1024.0 * 1024.0) as u64);
            },
        );
    }

    #[test]
    fn invalid_bool_is_a_config_error() {
        with_env(&[("UPSTREAM_ENABLED", "maybe")], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
        });
    }

    #[test]
    fn require_arxiv_paths_reports_the_missing_key() {
        with_env(&[], || {
            let config = Config::from_env().unwrap();
            let err = config.require_arxiv_paths().unwrap_err();
            assert!(matches!(err, ConfigError::Missing("INDEX_DB_PATH")));
        });
    }
}
