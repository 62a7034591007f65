//! A bounded worker pool used by the Reader, FileDot, and FileBLessAATB.
//! Sizing is resolved once per call from an explicit argument, a handle
//! default, or a fixed environment-variable precedence, falling back to the
//! machine's available parallelism.

use std::ops::Range;

use crate::error::{CustomError, Result};

const ENV_PRECEDENCE: [&str; 3] = ["PST_NUM_THREADS", "NUM_THREADS", "MKL_NUM_THREADS"];

/// Resolves the effective worker count from (in priority order): an
/// explicit call-site argument, an explicit handle-level default, the
/// environment-variable precedence, or available parallelism.
pub fn resolve_num_threads(explicit: Option<i64>, handle_default: Option<i64>) -> Result<usize> {
    if let Some(n) = explicit.or(handle_default) {
        return positive(n);
    }
    for var in ENV_PRECEDENCE {
        if let Ok(raw) = std::env::var(var) {
            let parsed: i64 = raw.trim().parse().map_err(|_| CustomError::InvalidConfiguration {
                message: format!("{var}={raw:?} is not an integer"),
            })?;
            return positive(parsed);
        }
    }
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    Ok(available.max(1))
}

fn positive(n: i64) -> Result<usize> {
    if n <= 0 {
        return Err(CustomError::InvalidConfiguration {
            message: format!("thread count must be positive, got {n}"),
        });
    }
    Ok(n as usize)
}

/// A reusable, bounded `rayon` worker pool exposing a blocking
/// `run_parallel_for`.
pub struct BedThreadPool {
    pool: rayon::ThreadPool,
}

impl BedThreadPool {
    pub fn new(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(CustomError::InvalidConfiguration {
                message: "thread count must be positive, got 0".to_string(),
            });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Partitions `0..n` into roughly equal contiguous ranges, one per
    /// worker, and invokes `f(range)` on each, blocking until every
    /// partition has finished. Returns the first error encountered, by
    /// shard order (shards cover strictly increasing ranges, so this is
    /// also first by element order).
    pub fn run_parallel_for<F>(&self, n: usize, f: F) -> Result<()>
    where
        F: Fn(Range<usize>) -> Result<()> + Sync,
    {
        if n == 0 {
            return Ok(());
        }
        let shards = self.shard_ranges(n);
        let mut errors: Vec<Option<CustomError>> = (0..shards.len()).map(|_| None).collect();

        self.pool.scope(|scope| {
            for (slot, range) in errors.iter_mut().zip(shards.into_iter()) {
                let f = &f;
                scope.spawn(move |_| {
                    if let Err(e) = f(range) {
                        *slot = Some(e);
                    }
                });
            }
        });

        for slot in errors {
            if let Some(e) = slot {
                return Err(e);
            }
        }
        Ok(())
    }

    /// The same contiguous, roughly-equal partition of `0..n` that
    /// `run_parallel_for` uses, exposed so callers that must pair a shard's
    /// index range with a matching slice of caller-owned data (the Reader's
    /// disjoint output columns) can split both consistently.
    pub fn shard_ranges(&self, n: usize) -> Vec<Range<usize>> {
        partition(n, self.num_threads())
    }

    /// Escape hatch onto the underlying `rayon::Scope`, for callers (the
    /// Reader) that need to spawn work paired with non-`Range` data such as
    /// disjoint mutable output slices.
    pub fn scope<'scope, OP>(&self, op: OP)
    where
        OP: FnOnce(&rayon::Scope<'scope>) + 'scope,
    {
        self.pool.scope(op)
    }
}

fn partition(n: usize, num_workers: usize) -> Vec<Range<usize>> {
    let num_workers = num_workers.max(1).min(n.max(1));
    let base = n / num_workers;
    let remainder = n % num_workers;
    let mut ranges = Vec::with_capacity(num_workers);
    let mut start = 0;
    for worker in 0..num_workers {
        let len = base + if worker < remainder { 1 } else { 0 };
        let end = start + len;
        if len > 0 {
            ranges.push(start..end);
        }
        start = end;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn partition_covers_range_exactly_once() {
        for n in [0, 1, 3, 7, 16, 17, 100] {
            for workers in [1, 2, 3, 8] {
                let ranges = partition(n, workers);
                let mut covered = Vec::new();
                for r in ranges {
                    covered.extend(r);
                }
                covered.sort();
                assert_eq!(covered, (0..n).collect::<Vec<_>>(), "n={n} workers={workers}");
            }
        }
    }

    #[test]
    fn resolve_explicit_wins_over_handle_default() {
        let n = resolve_num_threads(Some(4), Some(2)).unwrap();
        assert_eq!(n, 4);
    }

    #[test]
    fn resolve_rejects_non_positive() {
        let err = resolve_num_threads(Some(0), None).unwrap_err();
        assert!(matches!(err, CustomError::InvalidConfiguration { .. }));
        let err = resolve_num_threads(Some(-3), None).unwrap_err();
        assert!(matches!(err, CustomError::InvalidConfiguration { .. }));
    }

    #[test]
    fn run_parallel_for_visits_every_index_exactly_once() {
        let pool = BedThreadPool::new(4).unwrap();
        let seen: Mutex<Vec<usize>> = Mutex::new(Vec::new());
        pool.run_parallel_for(50, |range| {
            seen.lock().unwrap().extend(range);
            Ok(())
        })
        .unwrap();
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn run_parallel_for_surfaces_an_error() {
        let pool = BedThreadPool::new(4).unwrap();
        let err = pool
            .run_parallel_for(10, |range| {
                if range.contains(&7) {
                    Err(CustomError::NotBed)
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, CustomError::NotBed));
    }

    #[test]
    fn zero_thread_count_is_rejected() {
        let err = BedThreadPool::new(0).unwrap_err();
        assert!(matches!(err, CustomError::InvalidConfiguration { .. }));
    }
}
