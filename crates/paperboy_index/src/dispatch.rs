use crate::error::{IndexError, Result};

/// Run `scan_fn` over every item in `items` on a dedicated worker pool
/// of `workers` threads, invoking `on_result` in the calling thread as
/// each job completes — in completion order, not input order.
///
/// This is the direct analogue of the original pipeline's
/// `ProcessPoolExecutor` + `as_completed` loop: scanning is pure and
/// side-effect free (no manifest access from a worker), and only the
/// calling thread — the single coordinator — ever touches the
/// manifest, inside `on_result`.
pub(crate) fn dispatch_scan<T, R, F>(
    items: Vec<T>,
    workers: usize,
    scan_fn: F,
    mut on_result: impl FnMut(T, R),
) -> Result<()>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(&T) -> R + Send + Sync + Copy + 'static,
{
    if items.is_empty() {
        return Ok(());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|source| IndexError::WorkerPool(workers, source))?;

    let (tx, rx) = std::sync::mpsc::channel();
    for item in items {
        let tx = tx.clone();
        pool.spawn(move || {
            let result = scan_fn(&item);
            let _ = tx.send((item, result));
        });
    }
    drop(tx);

    for (item, result) in rx {
        on_result(item, result);
    }
    Ok(())
}

/// `max(1, cpu_count - 1)` worker threads, the default across both
/// corpora per the workspace's concurrency design.
pub fn default_worker_count() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}
