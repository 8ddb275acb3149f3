use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::algorithms::batching::{even_batches, merge_in_order, run_batches};
use crate::algorithms::common::apply_exclusion_zone;
use crate::algorithms::mass::DistanceKernel;
use crate::algorithms::Join;
use crate::core::matrix_profile::{ComputedProfile, ProfileAccumulator};
use crate::error::Result;

/// Number of target offsets visited for a sampling `ratio` in `(0, 1]`.
pub fn sample_count(n: usize, ratio: f64) -> usize {
    ((ratio * n as f64).ceil() as usize).clamp(1usize.min(n), n)
}

/// Sampled matrix profile.
///
/// Target offsets are drawn without replacement in random order. Each drawn
/// offset `q` yields the distances from every window of A to target window
/// `q`, which are offered to all entries of A at once. For self-joins the
/// same column is also the row of `q`, so `q` itself gets its exact nearest
/// neighbour. Entries never drawn keep the best distance seen from other
/// columns; at `ratio = 1.0` the result is exact. Self-join entries that no
/// drawn column reached outside their exclusion zone get their row computed
/// directly.
pub(crate) fn compute(
    join: &Join<'_>,
    ratio: f64,
    seed: Option<u64>,
    parallelism: usize,
) -> Result<ComputedProfile> {
    let n_a = join.n_a();
    let n_b = join.n_b();
    let zone = join.zone();

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut order: Vec<usize> = (0..n_b).collect();
    order.shuffle(&mut rng);
    order.truncate(sample_count(n_b, ratio));
    debug!(n_sampled = order.len(), n_b, ratio, "sampled target offsets");

    // Distances are taken from the target windows towards A.
    let kernel = DistanceKernel::new(join.a, join.stats_a, join.m)?;

    let batches = even_batches(order.len(), parallelism);
    let parts = run_batches(&batches, parallelism, |batch| {
        let mut acc = ProfileAccumulator::new(n_a);
        for &q in &order[batch.range()] {
            let mut dp = kernel.distance_profile_at(join.b, join.stats_b, q)?;
            if join.self_join {
                apply_exclusion_zone(&mut dp, q, zone);
                for (i, &d) in dp.iter().enumerate() {
                    if i < q {
                        acc.update_right(i, d, q);
                        acc.update(q, d, i);
                    } else {
                        acc.update(i, d, q);
                        acc.update_right(q, d, i);
                    }
                }
            } else {
                for (i, &d) in dp.iter().enumerate() {
                    acc.update(i, d, q);
                }
            }
        }
        Ok(acc)
    })?;

    let mut acc = merge_in_order(n_a, parts);
    if join.self_join {
        fill_unreached(join, &kernel, &mut acc, parallelism)?;
    }
    Ok(acc.finish(join.self_join, |d| d))
}

/// Compute the full row of every self-join entry whose only sampled columns
/// fell inside its own exclusion zone, so no `+inf` survives sampling.
fn fill_unreached(
    join: &Join<'_>,
    kernel: &DistanceKernel<'_>,
    acc: &mut ProfileAccumulator,
    parallelism: usize,
) -> Result<()> {
    let n_a = join.n_a();
    let zone = join.zone();
    let unreached: Vec<usize> = acc
        .entries
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.score.is_finite())
        .map(|(i, _)| i)
        .collect();
    if unreached.is_empty() {
        return Ok(());
    }
    debug!(n_unreached = unreached.len(), "computing rows missed by sampling");

    let batches = even_batches(unreached.len(), parallelism);
    let parts = run_batches(&batches, parallelism, |batch| {
        let mut fill = ProfileAccumulator::new(n_a);
        for &i in &unreached[batch.range()] {
            let mut dp = kernel.distance_profile_at(join.a, join.stats_a, i)?;
            apply_exclusion_zone(&mut dp, i, zone);
            for (j, &d) in dp.iter().enumerate() {
                if j > i {
                    fill.update_right(i, d, j);
                } else {
                    fill.update(i, d, j);
                }
            }
        }
        Ok(fill)
    })?;
    acc.merge(&merge_in_order(n_a, parts));
    Ok(())
}
