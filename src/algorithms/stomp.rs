use crate::algorithms::batching::{diagonal_batches, merge_in_order, run_batches, weighted_batches};
use crate::algorithms::common::sliding_dot_product;
use crate::algorithms::Join;
use crate::core::matrix_profile::{ComputedProfile, ProfileAccumulator};
use crate::error::Result;

/// Negated Pearson correlation of two windows from their dot product.
///
/// `m_mu_i` is `m * mean[i]`. Constant windows follow the kernel's rule:
/// two constant windows correlate perfectly, one constant window not at all.
#[inline(always)]
fn neg_corr(qt: f64, m_mu_i: f64, mu_j: f64, si: f64, sj: f64) -> f64 {
    if si == 0.0 || sj == 0.0 {
        if si == 0.0 && sj == 0.0 {
            -1.0
        } else {
            0.0
        }
    } else {
        m_mu_i.mul_add(mu_j, -qt) * si * sj
    }
}

/// Read-only context shared by the diagonal loops.
struct CorrCtx<'a> {
    a: &'a [f64],
    b: &'a [f64],
    m: usize,
    m_mean_a: &'a [f64],
    mean_b: &'a [f64],
    inv_a: &'a [f64],
    inv_b: &'a [f64],
}

impl CorrCtx<'_> {
    /// Walk the diagonal starting at `(i0, j0)` for `len` cells, calling
    /// `visit(i, j, neg_corr)` on each.
    ///
    /// `QT[i][j] = QT[i-1][j-1] - a[i-1]*b[j-1] + a[i+m-1]*b[j+m-1]`
    #[inline(always)]
    fn walk(&self, i0: usize, j0: usize, len: usize, qt_init: f64, mut visit: impl FnMut(usize, usize, f64)) {
        let m = self.m;
        let mut qt = qt_init;
        visit(
            i0,
            j0,
            neg_corr(qt, self.m_mean_a[i0], self.mean_b[j0], self.inv_a[i0], self.inv_b[j0]),
        );
        for p in 1..len {
            let i = i0 + p;
            let j = j0 + p;
            qt = (-self.a[i - 1]).mul_add(self.b[j - 1], qt);
            qt = self.a[i + m - 1].mul_add(self.b[j + m - 1], qt);
            visit(
                i,
                j,
                neg_corr(qt, self.m_mean_a[i], self.mean_b[j], self.inv_a[i], self.inv_b[j]),
            );
        }
    }
}

/// Diagonal-traversal matrix profile (STOMP).
///
/// Each diagonal of the implicit distance matrix starts from one dot product
/// taken from the first row (or first column for AB-joins) and is then
/// advanced by the `O(1)` recurrence, giving `O(n^2)` work with a single
/// sliding dot product per edge. Scores are negated correlations, converted
/// to distances once per entry at the end.
///
/// Self-joins visit diagonals `k > zone` only, updating both `(i, i+k)` and
/// `(i+k, i)`. Diagonals are batched by work, not count.
pub(crate) fn compute(join: &Join<'_>, parallelism: usize) -> Result<ComputedProfile> {
    let m = join.m;
    let m_f = m as f64;
    let m_mean_a: Vec<f64> = join.stats_a.mean.iter().map(|&mu| m_f * mu).collect();
    let cx = CorrCtx {
        a: join.a,
        b: join.b,
        m,
        m_mean_a: &m_mean_a,
        mean_b: &join.stats_b.mean,
        inv_a: &join.stats_a.inv_norm,
        inv_b: &join.stats_b.inv_norm,
    };

    let acc = if join.self_join {
        self_join(join, &cx, parallelism)?
    } else {
        ab_join(join, &cx, parallelism)?
    };

    let two_m = 2.0 * m_f;
    Ok(acc.finish(join.self_join, |nc| (two_m * (1.0 + nc)).max(0.0).sqrt()))
}

fn self_join(join: &Join<'_>, cx: &CorrCtx<'_>, parallelism: usize) -> Result<ProfileAccumulator> {
    let n_subs = join.n_a();
    let first_k = join.zone() + 1;
    let n_diags = n_subs.saturating_sub(first_k);
    let qt_first = sliding_dot_product(&join.a[..join.m], join.a)?;

    let batches = diagonal_batches(n_diags, parallelism);
    let parts = run_batches(&batches, parallelism, |batch| {
        let mut acc = ProfileAccumulator::new(n_subs);
        for t in batch.range() {
            let k = first_k + t;
            cx.walk(0, k, n_subs - k, qt_first[k], |i, j, nc| {
                acc.update_right(i, nc, j);
                acc.update(j, nc, i);
            });
        }
        Ok(acc)
    })?;
    Ok(merge_in_order(n_subs, parts))
}

/// AB-join diagonals: `d < n_b` starts at `(0, d)`, the rest at
/// `(d - n_b + 1, 0)`. Their lengths rise, plateau and fall, so batches are
/// balanced on the actual cell counts.
fn ab_join(join: &Join<'_>, cx: &CorrCtx<'_>, parallelism: usize) -> Result<ProfileAccumulator> {
    let m = join.m;
    let n_a = join.n_a();
    let n_b = join.n_b();
    let qt_row = sliding_dot_product(&join.a[..m], join.b)?;
    let qt_col = sliding_dot_product(&join.b[..m], join.a)?;

    let start = |d: usize| -> (usize, usize) {
        if d < n_b {
            (0, d)
        } else {
            (d - n_b + 1, 0)
        }
    };
    let lengths: Vec<usize> = (0..n_a + n_b - 1)
        .map(|d| {
            let (i0, j0) = start(d);
            (n_a - i0).min(n_b - j0)
        })
        .collect();

    let batches = weighted_batches(&lengths, parallelism);
    let parts = run_batches(&batches, parallelism, |batch| {
        let mut acc = ProfileAccumulator::new(n_a);
        for d in batch.range() {
            let (i0, j0) = start(d);
            let qt_init = if i0 == 0 { qt_row[j0] } else { qt_col[i0] };
            cx.walk(i0, j0, lengths[d], qt_init, |i, j, nc| acc.update(i, nc, j));
        }
        Ok(acc)
    })?;
    Ok(merge_in_order(n_a, parts))
}

#[cfg(test)]
mod tests {
    use crate::core::options::{Algorithm, ComputeOptions};
    use crate::MatrixProfile;

    fn run(a: &[f64], b: Option<&[f64]>, m: usize, algorithm: Algorithm, p: usize) -> MatrixProfile {
        let mut mp = MatrixProfile::new(a, b, m).unwrap();
        mp.compute(&ComputeOptions::new(algorithm).with_parallelism(p))
            .unwrap();
        mp
    }

    #[test]
    fn test_linear_series_is_all_zero() {
        // Every window of a line has the same shape
        let ts: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let mp = run(&ts, None, 4, Algorithm::Diagonal, 1);
        for (i, &d) in mp.profile().iter().enumerate() {
            assert!(d < 1e-6, "distance {d} at {i}");
        }
    }

    #[test]
    fn test_smallest_self_join() {
        // n = 6, m = 3: windows 0..=3, zone 1, pairs (0,2), (0,3), (1,3)
        let ts = vec![1.0, 2.0, 3.0, 1.0, 2.0, 0.5];
        let mp = run(&ts, None, 3, Algorithm::Diagonal, 1);
        assert_eq!(mp.len(), 4);
        assert!(mp.profile().iter().all(|d| d.is_finite()));
        assert_eq!(mp.profile_index()[1], 3);
        assert!(mp.profile_index()[0] >= 2);
    }

    #[test]
    fn test_matches_brute_force_in_parallel() {
        let ts: Vec<f64> = (0..700)
            .map(|i| (i as f64 * 0.13).sin() + 0.3 * (i as f64 * 0.031).sin())
            .collect();
        let reference = run(&ts, None, 25, Algorithm::BruteForce, 1);
        let diag = run(&ts, None, 25, Algorithm::Diagonal, 4);
        for (i, (a, b)) in reference.profile().iter().zip(diag.profile()).enumerate() {
            assert!((a - b).abs() < 1e-6, "offset {i}: {a} vs {b}");
        }
        let right_ref = reference.right_profile().unwrap();
        let right = diag.right_profile().unwrap();
        for (a, b) in right_ref.iter().zip(right) {
            match (a, b) {
                (Some(a), Some(b)) => assert!((a.distance - b.distance).abs() < 1e-6),
                (None, None) => {}
                _ => panic!("right profile presence differs"),
            }
        }
    }

    #[test]
    fn test_ab_join_matches_brute_force() {
        let a: Vec<f64> = (0..150).map(|i| (i as f64 * 0.2).sin() + i as f64 * 0.01).collect();
        let b: Vec<f64> = (0..90).map(|i| (i as f64 * 0.25).cos()).collect();
        let reference = run(&a, Some(&b), 10, Algorithm::BruteForce, 1);
        let diag = run(&a, Some(&b), 10, Algorithm::Diagonal, 3);
        for (x, y) in reference.profile().iter().zip(diag.profile()) {
            assert!((x - y).abs() < 1e-6);
        }

        // B longer than A exercises the other diagonal shape
        let reference = run(&b, Some(&a), 10, Algorithm::BruteForce, 1);
        let diag = run(&b, Some(&a), 10, Algorithm::Diagonal, 3);
        for (x, y) in reference.profile().iter().zip(diag.profile()) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_constant_windows() {
        let mut ts: Vec<f64> = (0..40).map(|i| (i as f64 * 0.9).sin()).collect();
        ts[10..22].iter_mut().for_each(|x| *x = 1.5);
        ts[28..40].iter_mut().for_each(|x| *x = -2.0);
        let mp = run(&ts, None, 6, Algorithm::Diagonal, 1);
        // window 10 is constant and has constant windows outside its zone
        assert_eq!(mp.profile()[10], 0.0);
        assert!(mp.profile().iter().all(|d| d.is_finite()));
    }
}
