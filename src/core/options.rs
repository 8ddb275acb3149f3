use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Strategy used to populate a matrix profile.
///
/// All strategies produce the same distances (within floating tolerance) when
/// run to completion; they differ in cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Algorithm {
    /// One FFT distance profile per query offset, minimum taken per row.
    /// `O(n^2 log n)`; the reference for correctness.
    BruteForce,
    /// Distance profiles for a random subset of target offsets.
    ///
    /// `ratio` in `(0, 1]` is a best-effort completeness knob: offsets are drawn
    /// without replacement, and entries never queried directly keep the best
    /// distance seen from other queries' rows. No statistical accuracy bound is
    /// implied for small ratios.
    Sampled { ratio: f64 },
    /// Diagonal traversal with the `O(1)` dot-product recurrence. `O(n^2)`.
    Diagonal,
    /// Covariance-update traversal (mean-centred recurrence, correlation
    /// domain). Lowest constant factor; AB-joins run the diagonal path.
    SinglePass,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::SinglePass
    }
}

/// Options controlling [`MatrixProfile::compute`](crate::MatrixProfile::compute).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeOptions {
    pub algorithm: Algorithm,
    /// Number of workers. Defaults to one per logical CPU.
    pub parallelism: usize,
    /// Seed for [`Algorithm::Sampled`]. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Single-pass only: score windows by `|r|` so anti-correlated windows
    /// count as matches.
    pub remap_negative_correlation: bool,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            parallelism: num_cpus::get().max(1),
            seed: None,
            remap_negative_correlation: false,
        }
    }
}

impl ComputeOptions {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_remap_negative_correlation(mut self, remap: bool) -> Self {
        self.remap_negative_correlation = remap;
        self
    }

    /// Check that every option is in range.
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(Error::InvalidParameter(
                "parallelism must be at least 1".into(),
            ));
        }
        if let Algorithm::Sampled { ratio } = self.algorithm {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(Error::InvalidParameter(format!(
                    "sampling ratio must be in (0, 1], got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// Options for [`mpdist`](crate::mpdist).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpDistOptions {
    /// Fraction of the combined series length used to pick the reported
    /// order statistic.
    pub percentile: f64,
    pub compute: ComputeOptions,
}

impl Default for MpDistOptions {
    fn default() -> Self {
        Self {
            percentile: 0.05,
            compute: ComputeOptions::default(),
        }
    }
}

impl MpDistOptions {
    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.percentile = percentile;
        self
    }

    pub fn with_compute(mut self, compute: ComputeOptions) -> Self {
        self.compute = compute;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.percentile) {
            return Err(Error::InvalidParameter(format!(
                "percentile must be in [0, 1], got {}",
                self.percentile
            )));
        }
        self.compute.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ComputeOptions::default();
        assert_eq!(opts.algorithm, Algorithm::SinglePass);
        assert!(opts.parallelism >= 1);
        assert!(opts.validate().is_ok());

        let mpd = MpDistOptions::default();
        assert!((mpd.percentile - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let opts = ComputeOptions::default().with_parallelism(0);
        assert!(matches!(opts.validate(), Err(Error::InvalidParameter(_))));

        for ratio in [0.0, -0.5, 1.5, f64::NAN] {
            let opts = ComputeOptions::new(Algorithm::Sampled { ratio });
            assert!(opts.validate().is_err(), "ratio {ratio} should be rejected");
        }
        let opts = ComputeOptions::new(Algorithm::Sampled { ratio: 1.0 });
        assert!(opts.validate().is_ok());

        let mpd = MpDistOptions::default().with_percentile(1.2);
        assert!(mpd.validate().is_err());
    }
}
