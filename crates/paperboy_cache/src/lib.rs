//! A fixed-byte-budget disk cache for retrieved document blobs, keyed by
//! sanitized canonical document id.
//!
//! The cache directory is the source of truth: there is no in-memory
//! index. Eviction is strict LRU by file modification time, matching
//! the original paper cache's mtime-sorted eviction scan — touch on
//! read, evict-smallest-mtime-first on write pressure.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;

mod error;
pub use error::{CacheError, Result};

/// Summary statistics for the cache's current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub budget_bytes: u64,
    pub current_size_bytes: u64,
    pub num_entries: usize,
    pub utilization_pct: f64,
}

/// A fixed-budget, mtime-LRU blob cache rooted at a single directory.
pub struct DiskCache {
    dir: PathBuf,
    budget_bytes: u64,
    // Serializes eviction + write so concurrent `put`s can't both decide
    // there's room and jointly blow the budget.
    mutator: Mutex<()>,
}

impl DiskCache {
    /// Open (creating if absent) a cache rooted at `dir` with a total
    /// byte budget of `budget_bytes`.
    pub fn open(dir: impl Into<PathBuf>, budget_bytes: u64) -> Result<Self> {
        let dir = dir.into();
        fs_err::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            budget_bytes,
            mutator: Mutex::new(()),
        })
    }

    /// Replace path-hostile characters so a canonical id is safe to use
    /// as a filename.
    pub fn sanitize_key(key: &str) -> String {
        key.chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                other => other,
            })
            .collect()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(Self::sanitize_key(key))
    }

    /// Fetch a cached blob, touching its mtime to "now" on a hit.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs_err::read(&path) {
            Ok(bytes) => {
                touch(&path)?;
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store `blob` under `key`, evicting the least-recently-touched
    /// entries until there is room. Refuses outright if `blob` alone
    /// exceeds the total budget.
    pub fn put(&self, key: &str, blob: &[u8]) -> Result<()> {
        let blob_len = blob.len() as u64;
        if blob_len > self.budget_bytes {
            return Err(CacheError::BlobTooLarge {
                blob_len,
                budget: self.budget_bytes,
            });
        }

        let _guard = self.mutator.lock();

        let mut entries = self.list_entries()?;
        let mut current: u64 = entries.iter().map(|e| e.size).sum();

        entries.sort_by_key(|e| e.mtime);
        let mut iter = entries.into_iter();
        while current + blob_len > self.budget_bytes {
            let Some(victim) = iter.next() else {
                break;
            };
            if fs_err::remove_file(&victim.path).is_ok() {
                current = current.saturating_sub(victim.size);
            }
        }

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        fs_err::write(tmp.path(), blob)?;
        let dest = self.path_for(key);
        tmp.persist(&dest)
            .map_err(|e| CacheError::Io(e.error))?;

        Ok(())
    }

    /// Remove every cached entry, returning the number removed.
    pub fn clear(&self) -> Result<usize> {
        let _guard = self.mutator.lock();
        let entries = self.list_entries()?;
        let mut removed = 0;
        for entry in entries {
            if fs_err::remove_file(&entry.path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.list_entries()?;
        let current_size_bytes: u64 = entries.iter().map(|e| e.size).sum();
        let utilization_pct = if self.budget_bytes == 0 {
            0.0
        } else {
            100.0 * current_size_bytes as f64 / self.budget_bytes as f64
        };
        Ok(CacheStats {
            budget_bytes: self.budget_bytes,
            current_size_bytes,
            num_entries: entries.len(),
            utilization_pct,
        })
    }

    fn list_entries(&self) -> Result<Vec<CacheFileEntry>> {
        let mut out = Vec::new();
        for entry in fs_err::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let meta = entry.metadata()?;
            out.push(CacheFileEntry {
                path,
                size: meta.len(),
                mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(out)
    }
}

struct CacheFileEntry {
    path: PathBuf,
    size: u64,
    mtime: SystemTime,
}

fn touch(path: &Path) -> Result<()> {
    let now = SystemTime::now();
    let file = fs_err::OpenOptions::new().write(true).open(path)?;
    file.set_modified(now)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_slashes_and_colons() {
        assert_eq!(DiskCache::sanitize_key("astro-ph/0412561"), "astro-ph_0412561");
        assert_eq!(DiskCache::sanitize_key("a:b\\c"), "a_b_c");
    }

    #[test]
    fn round_trips_a_blob() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).unwrap();
        cache.put("1501.00963", b"hello world").unwrap();
        assert_eq!(cache.get("1501.00963").unwrap().unwrap(), b"hello world");
    }

    #[test]
    fn miss_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).unwrap();
        assert!(cache.get("nope").unwrap().is_none());
    }

    #[test]
    fn refuses_blobs_larger_than_budget() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 4).unwrap();
        let err = cache.put("too-big", b"way too large").unwrap_err();
        assert!(matches!(err, CacheError::BlobTooLarge { .. }));
    }

    #[test]
    fn evicts_least_recently_touched_entry_under_pressure() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 100).unwrap();

        cache.put("a", &[0u8; 40]).unwrap();
        touch_with_delay();
        cache.put("b", &[0u8; 40]).unwrap();
        touch_with_delay();
        cache.put("c", &[0u8; 40]).unwrap();

        // Budget is 100; three 40-byte entries (120 total) can't all fit.
        // "a" is the oldest and must have been evicted.
        assert!(cache.get("a").unwrap().is_none());
        assert!(cache.get("b").unwrap().is_some());
        assert!(cache.get("c").unwrap().is_some());

        let stats = cache.stats().unwrap();
        assert!(stats.current_size_bytes <= stats.budget_bytes);
    }

    #[test]
    fn touching_an_entry_protects_it_from_the_next_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 100).unwrap();

        cache.put("a", &[0u8; 40]).unwrap();
        touch_with_delay();
        cache.put("b", &[0u8; 40]).unwrap();
        touch_with_delay();
        cache.put("c", &[0u8; 40]).unwrap();
        touch_with_delay();

        // Touch "b" so it becomes the most recently used.
        cache.get("b").unwrap();
        touch_with_delay();
        cache.put("d", &[0u8; 40]).unwrap();

        // "a" and "c" are the two least-recently-touched; one or both
        // should be gone to make room, but "b" (recently touched) and
        // "d" (just written) must both remain.
        assert!(cache.get("b").unwrap().is_some());
        assert!(cache.get("d").unwrap().is_some());
    }

    #[test]
    fn clear_removes_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).unwrap();
        cache.put("a", b"x").unwrap();
        cache.put("b", b"y").unwrap();
        assert_eq!(cache.clear().unwrap(), 2);
        assert!(cache.get("a").unwrap().is_none());
    }

    fn touch_with_delay() {
        // File mtimes on some filesystems have only ~1ms/10ms
        // resolution; sleep a touch so ordering is unambiguous in tests.
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
}
