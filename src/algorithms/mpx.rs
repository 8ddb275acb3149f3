use crate::algorithms::batching::{diagonal_batches, merge_in_order, run_batches};
use crate::algorithms::Join;
use crate::core::matrix_profile::{ComputedProfile, ProfileAccumulator};
use crate::error::Result;

/// Single-pass self-join (MPX).
///
/// Works on mean-centred covariances instead of raw dot products, so no
/// sliding dot product is needed and the update stays well conditioned for
/// series far from zero. With
///
/// ```text
/// df[i] = (a[i+m-1] - a[i-1]) / 2
/// dg[i] = (a[i+m-1] - mu[i]) + (a[i-1] - mu[i-1])
/// ```
///
/// the covariance along a diagonal advances as
/// `c[i][j] = c[i-1][j-1] + df[i]*dg[j] + df[j]*dg[i]`, and the correlation
/// is `c * inv_norm[i] * inv_norm[j]`. Each diagonal's first covariance is
/// computed directly in `O(m)`.
///
/// With `remap_negative` the score is `|r|`, so strongly anti-correlated
/// windows count as matches.
pub(crate) fn compute(join: &Join<'_>, remap_negative: bool, parallelism: usize) -> Result<ComputedProfile> {
    let a = join.a;
    let m = join.m;
    let n_subs = join.n_a();
    let mu = &join.stats_a.mean;
    let invn = &join.stats_a.inv_norm;

    let mut df = vec![0.0; n_subs];
    let mut dg = vec![0.0; n_subs];
    for i in 1..n_subs {
        df[i] = 0.5 * (a[i + m - 1] - a[i - 1]);
        dg[i] = (a[i + m - 1] - mu[i]) + (a[i - 1] - mu[i - 1]);
    }
    let centred_first: Vec<f64> = a[..m].iter().map(|x| x - mu[0]).collect();

    let score = |c: f64, i: usize, j: usize| -> f64 {
        let (si, sj) = (invn[i], invn[j]);
        let r = if si == 0.0 || sj == 0.0 {
            if si == 0.0 && sj == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            c * si * sj
        };
        if remap_negative {
            -r.abs()
        } else {
            -r
        }
    };

    let first_k = join.zone() + 1;
    let n_diags = n_subs.saturating_sub(first_k);
    let batches = diagonal_batches(n_diags, parallelism);
    let parts = run_batches(&batches, parallelism, |batch| {
        let mut acc = ProfileAccumulator::new(n_subs);
        for t in batch.range() {
            let k = first_k + t;
            let mut c: f64 = a[k..k + m]
                .iter()
                .zip(&centred_first)
                .map(|(x, y)| (x - mu[k]) * y)
                .sum();
            let nc = score(c, 0, k);
            acc.update_right(0, nc, k);
            acc.update(k, nc, 0);

            for i in 1..n_subs - k {
                let j = i + k;
                c += df[i].mul_add(dg[j], df[j] * dg[i]);
                let nc = score(c, i, j);
                acc.update_right(i, nc, j);
                acc.update(j, nc, i);
            }
        }
        Ok(acc)
    })?;

    let two_m = 2.0 * m as f64;
    Ok(merge_in_order(n_subs, parts).finish(true, |nc| (two_m * (1.0 + nc)).max(0.0).sqrt()))
}
