pub mod annotation;
pub mod batching;
pub mod brute_force;
pub mod common;
pub mod fluss;
pub mod mass;
pub mod motifs;
pub mod mpdist;
pub mod mpx;
pub mod sampled;
pub mod stampi;
pub mod stomp;

use tracing::{debug, instrument};

use crate::algorithms::batching::effective_parallelism;
use crate::algorithms::common::exclusion_zone;
use crate::core::matrix_profile::{ComputedProfile, JoinStats, MatrixProfile};
use crate::core::options::{Algorithm, ComputeOptions};
use crate::core::stats::RollingStats;
use crate::error::Result;

/// Read-only view of one join, shared by every strategy and worker.
///
/// For a self-join `b` is `a` and `stats_b` is `stats_a`.
pub(crate) struct Join<'a> {
    pub a: &'a [f64],
    pub b: &'a [f64],
    pub m: usize,
    pub stats_a: &'a RollingStats,
    pub stats_b: &'a RollingStats,
    pub self_join: bool,
}

impl Join<'_> {
    /// Windows of A, i.e. profile entries.
    pub fn n_a(&self) -> usize {
        self.a.len() - self.m + 1
    }

    /// Windows of the target series.
    pub fn n_b(&self) -> usize {
        self.b.len() - self.m + 1
    }

    /// Inclusive exclusion radius; only meaningful for self-joins.
    pub fn zone(&self) -> usize {
        exclusion_zone(self.m)
    }
}

impl MatrixProfile {
    /// Populate the profile with the strategy chosen in `options`.
    ///
    /// Recomputing replaces every array; the annotation vector is kept. The
    /// worker count is remembered for later [`update`](Self::update) calls.
    #[instrument(skip_all, fields(n = self.a.len(), m = self.m, algorithm = ?options.algorithm))]
    pub fn compute(&mut self, options: &ComputeOptions) -> Result<()> {
        options.validate()?;

        let stats_a = RollingStats::compute(&self.a, self.m)?;
        let stats_b = match &self.b {
            Some(b) => Some(RollingStats::compute(b, self.m)?),
            None => None,
        };

        let computed = {
            let join = Join {
                a: &self.a,
                b: self.target(),
                m: self.m,
                stats_a: &stats_a,
                stats_b: stats_b.as_ref().unwrap_or(&stats_a),
                self_join: self.is_self_join(),
            };
            let parallelism =
                effective_parallelism(join.n_a().max(join.n_b()), options.parallelism);
            run_strategy(&join, options, parallelism)?
        };

        self.install(computed, JoinStats { a: stats_a, b: stats_b });
        self.parallelism = options.parallelism;
        debug!(
            n_subs = self.len(),
            has_right = self.right_profile.is_some(),
            "matrix profile computed"
        );
        Ok(())
    }
}

fn run_strategy(join: &Join<'_>, options: &ComputeOptions, parallelism: usize) -> Result<ComputedProfile> {
    debug!(self_join = join.self_join, parallelism, "running strategy");
    match options.algorithm {
        Algorithm::BruteForce => brute_force::compute(join, parallelism),
        Algorithm::Sampled { ratio } => sampled::compute(join, ratio, options.seed, parallelism),
        Algorithm::Diagonal => stomp::compute(join, parallelism),
        Algorithm::SinglePass if join.self_join => {
            mpx::compute(join, options.remap_negative_correlation, parallelism)
        }
        Algorithm::SinglePass => stomp::compute(join, parallelism),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> Vec<f64> {
        (0..300)
            .map(|i| {
                let t = i as f64;
                (t * 0.21).sin() + 0.4 * (t * 0.053).cos() + 0.05 * ((t * 7.3).sin() * 3.1).fract()
            })
            .collect()
    }

    #[test]
    fn test_all_strategies_agree_on_self_join() {
        let ts = series();
        let m = 20;
        let algorithms = [
            Algorithm::BruteForce,
            Algorithm::Sampled { ratio: 1.0 },
            Algorithm::Diagonal,
            Algorithm::SinglePass,
        ];
        let mut profiles = Vec::new();
        for algorithm in algorithms {
            let mut mp = MatrixProfile::new(&ts, None, m).unwrap();
            mp.compute(&ComputeOptions::new(algorithm).with_parallelism(3).with_seed(7))
                .unwrap();
            profiles.push(mp);
        }
        let reference = profiles[0].profile();
        for mp in &profiles[1..] {
            for (i, (a, b)) in reference.iter().zip(mp.profile()).enumerate() {
                assert!((a - b).abs() < 1e-6, "offset {i}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_no_trivial_matches() {
        let ts = series();
        let m = 24;
        let mut mp = MatrixProfile::new(&ts, None, m).unwrap();
        mp.compute(&ComputeOptions::default()).unwrap();
        for (i, &j) in mp.profile_index().iter().enumerate() {
            assert!(2 * i.abs_diff(j) >= m, "offset {i} matched {j}");
        }
        assert!(mp.profile().iter().all(|d| d.is_finite() && *d >= 0.0));
    }

    #[test]
    fn test_invalid_options_do_not_mutate() {
        let ts = series();
        let mut mp = MatrixProfile::new(&ts, None, 16).unwrap();
        let before = mp.clone();
        assert!(mp
            .compute(&ComputeOptions::default().with_parallelism(0))
            .is_err());
        assert_eq!(mp, before);
    }
}
