//! Order-preserving chunked execution.
//!
//! Work is split into contiguous chunks with numpy's `array_split` rule and
//! each chunk runs as one task.  Results come back in chunk order no matter
//! which task finishes first, so the concatenated output never depends on
//! the thread count.
use std::ops::Range;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::error::{RansacError, Result};

/// Split `0..n` into `n_chunks` contiguous ranges.  The first `n % n_chunks`
/// ranges get one extra element; trailing ranges may be empty.
pub fn array_split(n: usize, n_chunks: usize) -> Vec<Range<usize>> {
    let n_chunks = n_chunks.max(1);
    let base = n / n_chunks;
    let extra = n % n_chunks;
    let mut start = 0;
    (0..n_chunks)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let r = start..start + len;
            start += len;
            r
        })
        .collect()
}

/// Run `task` on every chunk with `n_jobs` threads; results in chunk order.
///
/// The pool never has more threads than non-empty chunks.  A single worker
/// runs inline on the calling thread.
pub fn run_chunks<T, F>(n_jobs: usize, chunks: &[Range<usize>], task: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(Range<usize>) -> Result<T> + Send + Sync,
{
    let n_threads = n_jobs.min(chunks.iter().filter(|r| !r.is_empty()).count());
    if n_threads <= 1 {
        return chunks.iter().cloned().map(&task).collect();
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map_err(|e| RansacError::InvalidConfig(format!("cannot start {n_threads} workers: {e}")))?;
    pool.install(|| chunks.par_iter().cloned().map(&task).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_split_matches_numpy() {
        // np.array_split(np.arange(10), 3) → [0..4, 4..7, 7..10]
        assert_eq!(array_split(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(array_split(6, 2), vec![0..3, 3..6]);
        assert_eq!(array_split(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
        assert_eq!(array_split(5, 1), vec![0..5]);
    }

    #[test]
    fn results_keep_chunk_order() {
        let chunks = array_split(100, 7);
        let out = run_chunks(4, &chunks, |r| {
            // Make later chunks finish first.
            std::thread::sleep(std::time::Duration::from_millis((10 - r.start / 15) as u64));
            Ok(r.collect::<Vec<_>>())
        })
        .unwrap();
        let flat: Vec<usize> = out.into_iter().flatten().collect();
        assert_eq!(flat, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn oversized_n_jobs_uses_one_thread_per_chunk() {
        let chunks = array_split(6, 3);
        let out = run_chunks(1_000_000, &chunks, |r| Ok(r.len())).unwrap();
        assert_eq!(out, vec![2, 2, 2]);

        let idle = [0..0, 0..0, 0..5];
        let out = run_chunks(usize::MAX, &idle, |r| Ok(r.len())).unwrap();
        assert_eq!(out, vec![0, 0, 5]);
    }

    #[test]
    fn first_error_is_returned() {
        let chunks = array_split(4, 4);
        let res: Result<Vec<()>> = run_chunks(2, &chunks, |r| {
            if r.start == 2 {
                Err(RansacError::Kernel("boom".into()))
            } else {
                Ok(())
            }
        });
        assert!(matches!(res, Err(RansacError::Kernel(_))));
    }
}
