use crate::algorithms::batching::{even_batches, merge_in_order, run_batches};
use crate::algorithms::common::apply_exclusion_zone;
use crate::algorithms::mass::DistanceKernel;
use crate::algorithms::Join;
use crate::core::matrix_profile::{ComputedProfile, ProfileAccumulator};
use crate::error::Result;

/// Row-wise matrix profile: one FFT distance profile per offset of A.
///
/// `O(n^2 log n)` but with no recurrence to drift, which makes it the
/// reference the faster strategies are checked against. Rows are split evenly
/// across workers; each row is owned by exactly one batch.
pub(crate) fn compute(join: &Join<'_>, parallelism: usize) -> Result<ComputedProfile> {
    let n_a = join.n_a();
    let zone = join.zone();
    let kernel = DistanceKernel::new(join.b, join.stats_b, join.m)?;

    let batches = even_batches(n_a, parallelism);
    let parts = run_batches(&batches, parallelism, |batch| {
        let mut acc = ProfileAccumulator::new(n_a);
        for i in batch.range() {
            let mut dp = kernel.distance_profile_at(join.a, join.stats_a, i)?;
            if join.self_join {
                apply_exclusion_zone(&mut dp, i, zone);
                for (j, &d) in dp.iter().enumerate() {
                    if j > i {
                        acc.update_right(i, d, j);
                    } else {
                        acc.update(i, d, j);
                    }
                }
            } else {
                for (j, &d) in dp.iter().enumerate() {
                    acc.update(i, d, j);
                }
            }
        }
        Ok(acc)
    })?;

    Ok(merge_in_order(n_a, parts).finish(join.self_join, |d| d))
}

#[cfg(test)]
mod tests {
    use crate::core::options::{Algorithm, ComputeOptions};
    use crate::MatrixProfile;

    fn brute(ts: &[f64], b: Option<&[f64]>, m: usize) -> MatrixProfile {
        let mut mp = MatrixProfile::new(ts, b, m).unwrap();
        mp.compute(&ComputeOptions::new(Algorithm::BruteForce).with_parallelism(1))
            .unwrap();
        mp
    }

    #[test]
    fn test_tiny_repeating() {
        let ts = vec![1.0, 2.0, 3.0, 2.0, 1.0, 2.0, 3.0, 2.0];
        let mp = brute(&ts, None, 4);
        assert!(mp.profile()[0] < 1e-6);
        assert!(mp.profile()[4] < 1e-6);
        assert_eq!(mp.profile_index()[0], 4);
        assert_eq!(mp.profile_index()[4], 0);
    }

    #[test]
    fn test_known_motif() {
        let mut ts = vec![0.0; 20];
        ts[..4].copy_from_slice(&[0.0, 1.0, 0.0, -1.0]);
        for (i, val) in ts.iter_mut().enumerate().take(10).skip(4) {
            *val = (i as f64) * 0.5;
        }
        ts[10..14].copy_from_slice(&[0.0, 1.0, 0.0, -1.0]);
        for (i, val) in ts.iter_mut().enumerate().skip(14) {
            *val = -(i as f64) * 0.3;
        }

        let mp = brute(&ts, None, 4);
        assert_eq!(mp.profile_index()[0], 10);
        assert_eq!(mp.profile_index()[10], 0);
        assert!(mp.profile()[0] < 1e-6);
    }

    #[test]
    fn test_right_profile_looks_forward() {
        let ts: Vec<f64> = (0..60).map(|i| (i as f64 * 0.7).cos() + i as f64 * 0.02).collect();
        let mp = brute(&ts, None, 8);
        let right = mp.right_profile().unwrap();
        let zone = mp.exclusion_radius();
        for (i, nb) in right.iter().enumerate() {
            match nb {
                Some(nb) => {
                    assert!(nb.index > i + zone);
                    assert!(nb.distance >= mp.profile()[i] - 1e-12);
                }
                None => assert!(i + zone + 1 >= mp.len()),
            }
        }
    }

    #[test]
    fn test_ab_join_indices_reference_b() {
        let a: Vec<f64> = (0..30).map(|i| (i as f64 * 0.5).sin()).collect();
        let b: Vec<f64> = (0..12).map(|i| (i as f64 * 0.5 + 1.0).sin()).collect();
        let mp = brute(&a, Some(&b), 5);
        assert_eq!(mp.len(), 26);
        assert!(mp.right_profile().is_none());
        assert!(mp.profile_index().iter().all(|&j| j <= b.len() - 5));
    }
}
