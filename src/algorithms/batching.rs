//! Work partitioning and the worker pool.
//!
//! Every strategy splits its index space into [`Batch`]es, runs one job per
//! batch on a fixed-size pool, and folds the per-batch accumulators together
//! in batch order.

use tracing::debug;

use crate::core::matrix_profile::ProfileAccumulator;
use crate::error::Result;
#[cfg(feature = "parallel")]
use crate::error::Error;

/// Minimum number of subsequences before dispatching to the worker pool.
/// Below this threshold, thread-dispatch overhead exceeds parallelism gains.
pub const MIN_PARALLEL_SUBS: usize = 256;

/// A contiguous range `[idx, idx + size)` of the diagonal or row index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub idx: usize,
    pub size: usize,
}

impl Batch {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.idx..self.idx + self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Worker count actually used for `n_subs` subsequences.
pub fn effective_parallelism(n_subs: usize, parallelism: usize) -> usize {
    if n_subs < MIN_PARALLEL_SUBS {
        1
    } else {
        parallelism.max(1)
    }
}

/// Split `n_diags` diagonals into exactly `p` work-balanced batches.
///
/// Diagonal `t` (counted from the first one) holds `n_diags - t` cells, so
/// the cumulative work of the first `i` diagonals is
/// `i * n_diags - i * (i - 1) / 2`. Batch boundaries are found by bisecting
/// that closed form at `c / p` of the total. Earlier batches therefore get
/// fewer, longer diagonals. Batches may be empty when `p > n_diags`; they are
/// always contiguous and their sizes sum to `n_diags`.
pub fn diagonal_batches(n_diags: usize, p: usize) -> Vec<Batch> {
    let cumwork = |i: usize| -> u128 {
        let i = i as u128;
        let n = n_diags as u128;
        i * n - i * i.saturating_sub(1) / 2
    };
    partition(n_diags, p, cumwork)
}

/// Split items of uneven cost into exactly `p` contiguous batches of roughly
/// equal total `weights`.
pub fn weighted_batches(weights: &[usize], p: usize) -> Vec<Batch> {
    let mut prefix = Vec::with_capacity(weights.len() + 1);
    let mut total = 0u128;
    prefix.push(total);
    for &w in weights {
        total += w as u128;
        prefix.push(total);
    }
    partition(weights.len(), p, |i| prefix[i])
}

/// Split `n` rows into exactly `p` batches of (nearly) equal count.
pub fn even_batches(n: usize, p: usize) -> Vec<Batch> {
    partition(n, p, |i| i as u128)
}

fn partition(n: usize, p: usize, cumwork: impl Fn(usize) -> u128) -> Vec<Batch> {
    let p = p.max(1);
    let total = cumwork(n);
    let mut batches = Vec::with_capacity(p);
    let mut prev = 0usize;

    for c in 1..=p {
        let end = if c == p {
            n
        } else {
            let threshold = (c as u128 * total + p as u128 / 2) / p as u128;
            let mut lo = prev;
            let mut hi = n;
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                if cumwork(mid) >= threshold {
                    hi = mid;
                } else {
                    lo = mid + 1;
                }
            }
            lo
        };
        batches.push(Batch {
            idx: prev,
            size: end - prev,
        });
        prev = end;
    }

    batches
}

/// Run `job` once per batch on a pool of `parallelism` workers.
///
/// Results come back in batch order. If any job fails, the error of the
/// earliest failing batch is returned and every partial result is dropped.
pub fn run_batches<T, F>(batches: &[Batch], parallelism: usize, job: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(Batch) -> Result<T> + Sync + Send,
{
    debug!(
        n_batches = batches.len(),
        parallelism,
        sizes = ?batches.iter().map(|b| b.size).collect::<Vec<_>>(),
        "dispatching batches"
    );

    #[cfg(feature = "parallel")]
    if parallelism > 1 && batches.len() > 1 {
        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()
            .map_err(|e| Error::InvalidParameter(format!("cannot start worker pool: {e}")))?;
        let results: Vec<Result<T>> =
            pool.install(|| batches.par_iter().map(|&b| job(b)).collect());
        return results.into_iter().collect();
    }

    batches.iter().map(|&b| job(b)).collect()
}

/// Fold per-batch accumulators together in batch order.
pub(crate) fn merge_in_order(n: usize, parts: Vec<ProfileAccumulator>) -> ProfileAccumulator {
    let mut parts = parts.into_iter();
    let mut combined = parts.next().unwrap_or_else(|| ProfileAccumulator::new(n));
    for part in parts {
        combined.merge(&part);
    }
    combined
}
