use tracing::{debug, instrument};

use crate::algorithms::batching::{effective_parallelism, even_batches, merge_in_order, run_batches};
use crate::algorithms::common::{apply_exclusion_zone, exclusion_zone};
use crate::algorithms::mass::DistanceKernel;
use crate::core::matrix_profile::{check_finite, JoinStats, MatrixProfile, Neighbor, ProfileAccumulator};
use crate::core::stats::RollingStats;
use crate::error::{Error, Result};

impl MatrixProfile {
    /// Append `samples` to series A and extend the profile incrementally.
    ///
    /// Only the new windows get fresh statistics and distance profiles. For a
    /// self-join each new window is compared against every window of the
    /// extended series, and older entries adopt a new window as neighbour
    /// when it is strictly closer. For an AB-join the new windows of A are
    /// matched against the unchanged B.
    ///
    /// Runs on as many workers as the last `compute` used. Fails with
    /// `NotComputed` before the first `compute` and with `InvalidInput` on
    /// non-finite samples; nothing is modified on failure. An annotation
    /// vector installed with [`annotate`](Self::annotate) is rebuilt from the
    /// extended series; a caller-built one is dropped.
    pub fn update(&mut self, samples: &[f64]) -> Result<()> {
        self.update_with(samples, self.parallelism)
    }

    /// [`update`](Self::update) on `parallelism` workers.
    #[instrument(skip_all, fields(n_new = samples.len(), n = self.a.len(), m = self.m))]
    pub fn update_with(&mut self, samples: &[f64], parallelism: usize) -> Result<()> {
        if parallelism == 0 {
            return Err(Error::InvalidParameter("parallelism must be at least 1".into()));
        }
        self.require_computed()?;
        check_finite(samples, "new samples")?;
        if samples.is_empty() {
            return Ok(());
        }

        let m = self.m;
        let mut a = Vec::with_capacity(self.a.len() + samples.len());
        a.extend_from_slice(&self.a);
        a.extend_from_slice(samples);

        let (mut stats_a, stats_b) = match &self.stats {
            Some(cached) => (cached.a.clone(), cached.b.clone()),
            None => (
                RollingStats::compute(&self.a, m)?,
                self.b.as_deref().map(|b| RollingStats::compute(b, m)).transpose()?,
            ),
        };
        stats_a.extend(&a, m)?;

        let old_n = self.profile.len();
        let new_n = a.len() - m + 1;
        let parallelism = effective_parallelism(new_n, parallelism);

        let acc = match (&self.b, &stats_b) {
            (Some(b), Some(stats_b)) => {
                let kernel = DistanceKernel::new(b, stats_b, m)?;
                let batches = even_batches(new_n - old_n, parallelism);
                let parts = run_batches(&batches, parallelism, |batch| {
                    let mut acc = ProfileAccumulator::new(new_n);
                    for q in batch.range().map(|t| old_n + t) {
                        let dp = kernel.distance_profile_at(&a, &stats_a, q)?;
                        for (j, &d) in dp.iter().enumerate() {
                            acc.update(q, d, j);
                        }
                    }
                    Ok(acc)
                })?;
                merge_in_order(new_n, parts)
            }
            _ => {
                let zone = exclusion_zone(m);
                let kernel = DistanceKernel::new(&a, &stats_a, m)?;
                let batches = even_batches(new_n - old_n, parallelism);
                let parts = run_batches(&batches, parallelism, |batch| {
                    let mut acc = ProfileAccumulator::new(new_n);
                    for q in batch.range().map(|t| old_n + t) {
                        let mut dp = kernel.distance_profile_at(&a, &stats_a, q)?;
                        apply_exclusion_zone(&mut dp, q, zone);
                        for (j, &d) in dp.iter().enumerate() {
                            if j > q {
                                acc.update_right(q, d, j);
                            } else {
                                acc.update(q, d, j);
                            }
                            // older windows see the new one on their right
                            if j < old_n {
                                acc.update_right(j, d, q);
                            }
                        }
                    }
                    Ok(acc)
                })?;
                merge_in_order(new_n, parts)
            }
        };

        let annotation = match (self.annotation_kind, &self.annotation) {
            (Some(kind), Some(_)) => Some(kind.generate(&a, m)?),
            (None, Some(_)) => {
                debug!("dropping caller-built annotation vector");
                None
            }
            _ => None,
        };

        // Commit: nothing above touched `self`.
        let self_join = self.is_self_join();
        self.profile.resize(new_n, f64::INFINITY);
        self.profile_index.resize(new_n, 0);
        if let Some(right) = &mut self.right_profile {
            right.resize(new_n, None);
        }
        let mut adopted = 0usize;
        for (i, e) in acc.entries.iter().enumerate() {
            if e.score < self.profile[i] {
                self.profile[i] = e.score;
                self.profile_index[i] = e.index;
                if i < old_n {
                    adopted += 1;
                }
            }
            if let Some(right) = &mut self.right_profile {
                let better = match right[i] {
                    Some(nb) => e.right_score < nb.distance,
                    None => e.right_score.is_finite(),
                };
                if self_join && better {
                    right[i] = Some(Neighbor {
                        distance: e.right_score,
                        index: e.right_index,
                    });
                }
            }
        }
        self.a = a;
        self.stats = Some(JoinStats { a: stats_a, b: stats_b });
        if annotation.is_none() {
            self.annotation_kind = None;
        }
        self.annotation = annotation;

        debug!(old_n, new_n, adopted, "matrix profile extended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::options::{Algorithm, ComputeOptions};
    use crate::error::Error;
    use crate::{AnnotationVector, Format, MatrixProfile};

    fn series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (i as f64 * 0.23).sin() + 0.5 * (i as f64 * 0.041).cos() + (i % 7) as f64 * 0.01)
            .collect()
    }

    fn exact() -> ComputeOptions {
        ComputeOptions::new(Algorithm::BruteForce).with_parallelism(1)
    }

    #[test]
    fn test_update_matches_batch_self_join() {
        let ts = series(160);
        let m = 12;
        let mut online = MatrixProfile::new(&ts[..100], None, m).unwrap();
        online.compute(&exact()).unwrap();
        online.update(&ts[100..130]).unwrap();
        online.update(&ts[130..]).unwrap();

        let mut batch = MatrixProfile::new(&ts, None, m).unwrap();
        batch.compute(&exact()).unwrap();

        assert_eq!(online.len(), batch.len());
        assert_eq!(online.a(), batch.a());
        for (i, (a, b)) in online.profile().iter().zip(batch.profile()).enumerate() {
            assert!((a - b).abs() < 1e-9, "offset {i}: {a} vs {b}");
        }
        let (ro, rb) = (online.right_profile().unwrap(), batch.right_profile().unwrap());
        for (a, b) in ro.iter().zip(rb) {
            match (a, b) {
                (Some(a), Some(b)) => assert!((a.distance - b.distance).abs() < 1e-9),
                (None, None) => {}
                _ => panic!("right profile presence differs"),
            }
        }
    }

    #[test]
    fn test_update_single_samples() {
        let ts = series(90);
        let m = 8;
        let mut online = MatrixProfile::new(&ts[..40], None, m).unwrap();
        online.compute(&ComputeOptions::default()).unwrap();
        for x in &ts[40..] {
            online.update(std::slice::from_ref(x)).unwrap();
        }
        let mut batch = MatrixProfile::new(&ts, None, m).unwrap();
        batch.compute(&exact()).unwrap();
        for (a, b) in online.profile().iter().zip(batch.profile()) {
            assert!((a - b).abs() < 1e-6);
        }
        for (i, &j) in online.profile_index().iter().enumerate() {
            assert!(2 * i.abs_diff(j) >= m);
        }
    }

    #[test]
    fn test_update_ab_join() {
        let a = series(80);
        let b: Vec<f64> = series(140)[60..].to_vec();
        let m = 10;
        let mut online = MatrixProfile::new(&a[..50], Some(&b), m).unwrap();
        online.compute(&exact()).unwrap();
        online.update(&a[50..]).unwrap();

        let mut batch = MatrixProfile::new(&a, Some(&b), m).unwrap();
        batch.compute(&exact()).unwrap();
        assert_eq!(online.len(), batch.len());
        for (x, y) in online.profile().iter().zip(batch.profile()) {
            assert!((x - y).abs() < 1e-9);
        }
        assert!(online.right_profile().is_none());
    }

    #[test]
    fn test_update_validation() {
        let ts = series(60);
        let mut mp = MatrixProfile::new(&ts, None, 8).unwrap();
        assert!(matches!(mp.update(&[1.0]), Err(Error::NotComputed)));

        mp.compute(&exact()).unwrap();
        let before = mp.clone();
        assert!(matches!(
            mp.update(&[1.0, f64::INFINITY]),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(mp, before);

        assert!(matches!(
            mp.update_with(&[1.0], 0),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(mp, before);

        mp.update(&[]).unwrap();
        assert_eq!(mp, before);
    }

    #[test]
    fn test_annotated_profile_saved_after_update() {
        let ts = series(150);
        let m = 12;
        let mut mp = MatrixProfile::new(&ts[..90], None, m).unwrap();
        mp.compute(&exact()).unwrap();
        mp.annotate(AnnotationVector::Complexity).unwrap();
        mp.update(&ts[90..]).unwrap();
        assert_eq!(mp.annotation().map(<[f64]>::len), Some(mp.len()));

        let mut buf = Vec::new();
        mp.to_writer(&mut buf, Format::Json).unwrap();
        let back = MatrixProfile::from_reader(buf.as_slice(), Format::Json).unwrap();
        assert_eq!(back, mp);
        assert_eq!(back.annotation_kind(), Some(AnnotationVector::Complexity));
    }

    #[test]
    fn test_update_with_worker_count_matches_sequential() {
        let ts = series(700);
        let m = 16;
        let mut one = MatrixProfile::new(&ts[..400], None, m).unwrap();
        one.compute(&exact()).unwrap();
        let mut many = one.clone();
        one.update_with(&ts[400..], 1).unwrap();
        many.update_with(&ts[400..], 4).unwrap();
        assert_eq!(one.profile(), many.profile());
        assert_eq!(one.profile_index(), many.profile_index());
    }
}
