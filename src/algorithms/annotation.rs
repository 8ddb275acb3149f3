//! Annotation vectors: per-offset weights in `[0, 1]` that bias motif and
//! discord search away from uninteresting regions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::matrix_profile::{check_finite, MatrixProfile};
use crate::core::stats::{validate_window, RollingStats};
use crate::error::{Error, Result};

/// Built-in annotation vector generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnnotationVector {
    /// All ones; leaves the profile unchanged.
    #[default]
    Default,
    /// Favours windows with more movement: `sqrt(sum of squared steps)`,
    /// min-max normalised.
    Complexity,
    /// 1 where the window is quieter than the average window, else 0.
    MeanStd,
    /// Penalises windows touching the series minimum or maximum, which is
    /// where a clipped sensor saturates.
    Clipping,
}

impl AnnotationVector {
    /// Build the vector for every window of length `m` in `ts`.
    pub fn generate(self, ts: &[f64], m: usize) -> Result<Vec<f64>> {
        validate_window(ts.len(), m)?;
        check_finite(ts, "series")?;
        let n_subs = ts.len() - m + 1;

        let av = match self {
            Self::Default => vec![1.0; n_subs],
            Self::Complexity => {
                let raw: Vec<f64> = ts
                    .windows(m)
                    .map(|w| w.windows(2).map(|p| (p[1] - p[0]).powi(2)).sum::<f64>().sqrt())
                    .collect();
                min_max_normalize(&raw)
            }
            Self::MeanStd => {
                let stats = RollingStats::compute(ts, m)?;
                let mean_std = stats.std.iter().sum::<f64>() / n_subs as f64;
                stats
                    .std
                    .iter()
                    .map(|&s| if s < mean_std { 1.0 } else { 0.0 })
                    .collect()
            }
            Self::Clipping => {
                let lo = ts.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = ts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let counts: Vec<f64> = ts
                    .windows(m)
                    .map(|w| w.iter().filter(|&&x| x == lo || x == hi).count() as f64)
                    .collect();
                min_max_normalize(&counts).into_iter().map(|c| 1.0 - c).collect()
            }
        };
        debug!(kind = ?self, n_subs, "annotation vector generated");
        Ok(av)
    }
}

/// Scale to `[0, 1]`; a flat input maps to all ones.
fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    if span <= 0.0 {
        return vec![1.0; values.len()];
    }
    values.iter().map(|v| (v - lo) / span).collect()
}

pub(crate) fn check_annotation(av: &[f64], n_subs: usize) -> Result<()> {
    if av.len() != n_subs {
        return Err(Error::LengthMismatch {
            expected: n_subs,
            got: av.len(),
        });
    }
    match av.iter().position(|w| !(w.is_finite() && (0.0..=1.0).contains(w))) {
        Some(pos) => Err(Error::InvalidInput(format!(
            "annotation weight {} at offset {pos} is outside [0, 1]",
            av[pos]
        ))),
        None => Ok(()),
    }
}

impl MatrixProfile {
    /// Install a caller-built annotation vector, one weight per offset.
    ///
    /// A caller-built vector cannot follow the series as it grows, so
    /// [`update`](Self::update) drops it.
    pub fn set_annotation_vector(&mut self, av: Vec<f64>) -> Result<()> {
        check_annotation(&av, self.len())?;
        self.annotation = Some(av);
        self.annotation_kind = None;
        Ok(())
    }

    /// Generate and install one of the built-in annotation vectors from A.
    /// It is rebuilt from the extended series on every update.
    pub fn annotate(&mut self, kind: AnnotationVector) -> Result<()> {
        let av = kind.generate(&self.a, self.m)?;
        check_annotation(&av, self.len())?;
        self.annotation = Some(av);
        self.annotation_kind = Some(kind);
        Ok(())
    }

    pub fn clear_annotation(&mut self) {
        self.annotation = None;
        self.annotation_kind = None;
    }

    /// The profile with the annotation vector applied:
    /// `d[i] + (1 - av[i]) * max(d)`, over finite distances.
    ///
    /// Without an annotation vector this is a copy of the profile. The
    /// profile itself is never modified.
    pub fn apply_annotation_vector(&self) -> Result<Vec<f64>> {
        self.require_computed()?;
        let Some(av) = &self.annotation else {
            return Ok(self.profile.clone());
        };
        if av.len() != self.profile.len() {
            return Err(Error::LengthMismatch {
                expected: self.profile.len(),
                got: av.len(),
            });
        }
        let max = self
            .profile
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(0.0, f64::max);
        Ok(self
            .profile
            .iter()
            .zip(av)
            .map(|(&d, &w)| d + (1.0 - w) * max)
            .collect())
    }
}
