use std::time::Duration;

/// A snapshot of an indexing run's progress, handed to the caller's
/// progress callback after every ingested bulk file.
///
/// Mirrors the `{files_done, files_total, entries_added, files_failed,
/// elapsed, eta}` shape the original scanners printed to a single
/// progress line; a CLI renders this however it likes (a bar, a
/// `tracing` line, a test assertion).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexProgress {
    pub files_done: usize,
    pub files_total: usize,
    pub entries_added: u64,
    pub files_failed: usize,
    pub elapsed: Duration,
}

impl IndexProgress {
    /// Estimated remaining time, extrapolated from the average
    /// per-file rate so far. `None` before the first file completes or
    /// once the run is done.
    pub fn eta(&self) -> Option<Duration> {
        if self.files_done == 0 || self.files_done >= self.files_total {
            return None;
        }
        let elapsed_secs = self.elapsed.as_secs_f64();
        if elapsed_secs <= 0.0 {
            return None;
        }
        let rate = self.files_done as f64 / elapsed_secs;
        if rate <= 0.0 {
            return None;
        }
        let remaining_files = (self.files_total - self.files_done) as f64;
        Some(Duration::from_secs_f64(remaining_files / rate))
    }

    pub fn fraction_done(&self) -> f64 {
        if self.files_total == 0 {
            1.0
        } else {
            self.files_done as f64 / self.files_total as f64
        }
    }
}

/// Final tally returned once a directory scan completes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndexSummary {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub entries_added: u64,
}
