use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::core::matrix_profile::check_finite;
use crate::core::stats::{norm_from_m2, validate_window, window_moments, RollingStats};
use crate::error::{Error, Result};

/// Z-normalized Euclidean distance from a sliding dot product.
///
/// `inv_*` are `1 / (sqrt(m) * sigma)` (zero for constant windows). Two
/// constant windows are identical; a constant window is `sqrt(2m)` away from
/// any other. Round-off is clamped before the square root.
#[inline]
pub(crate) fn qt_to_distance(qt: f64, m_f: f64, mu_q: f64, inv_q: f64, mu_t: f64, inv_t: f64) -> f64 {
    if inv_q == 0.0 || inv_t == 0.0 {
        return if inv_q == 0.0 && inv_t == 0.0 {
            0.0
        } else {
            (2.0 * m_f).sqrt()
        };
    }
    let r = ((qt - m_f * mu_q * mu_t) * inv_q * inv_t).clamp(-1.0, 1.0);
    (2.0 * m_f * (1.0 - r)).max(0.0).sqrt()
}

/// Distance profile kernel for one target series.
///
/// The target's spectrum is computed once; each query then costs one forward
/// and one inverse real FFT. The kernel is immutable after construction, so a
/// single instance is shared by every worker.
pub struct DistanceKernel<'a> {
    target: &'a [f64],
    stats: &'a RollingStats,
    m: usize,
    fft_len: usize,
    spectrum: Vec<Complex<f64>>,
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
}

impl<'a> DistanceKernel<'a> {
    /// Plan the transforms and cache the spectrum of `target`.
    ///
    /// `stats` must be the rolling statistics of `target` for window `m`.
    pub fn new(target: &'a [f64], stats: &'a RollingStats, m: usize) -> Result<Self> {
        validate_window(target.len(), m)?;
        if stats.len() != target.len() - m + 1 {
            return Err(Error::LengthMismatch {
                expected: target.len() - m + 1,
                got: stats.len(),
            });
        }
        let fft_len = (target.len() + m - 1).next_power_of_two();
        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        let mut padded = vec![0.0; fft_len];
        padded[..target.len()].copy_from_slice(target);
        let mut spectrum = forward.make_output_vec();
        forward.process(&mut padded, &mut spectrum)?;

        Ok(Self {
            target,
            stats,
            m,
            fft_len,
            spectrum,
            forward,
            inverse,
        })
    }

    /// Number of target windows, i.e. the length of every distance profile.
    pub fn n_subs(&self) -> usize {
        self.target.len() - self.m + 1
    }

    /// `dot(query, target[j..j+m])` for every target offset `j`.
    pub fn dot_products(&self, query: &[f64]) -> Result<Vec<f64>> {
        if query.len() != self.m {
            return Err(Error::LengthMismatch {
                expected: self.m,
                got: query.len(),
            });
        }
        let mut padded = vec![0.0; self.fft_len];
        for (dst, src) in padded.iter_mut().zip(query.iter().rev()) {
            *dst = *src;
        }
        let mut q_spectrum = self.forward.make_output_vec();
        self.forward.process(&mut padded, &mut q_spectrum)?;
        for (q, t) in q_spectrum.iter_mut().zip(self.spectrum.iter()) {
            *q *= t;
        }
        let mut out = vec![0.0; self.fft_len];
        self.inverse.process(&mut q_spectrum, &mut out)?;

        let norm = 1.0 / self.fft_len as f64;
        let start = self.m - 1;
        Ok(out[start..start + self.n_subs()]
            .iter()
            .map(|&x| x * norm)
            .collect())
    }

    /// Distances from a query with known statistics to every target window.
    ///
    /// No exclusion zone is applied.
    pub fn distance_profile(&self, query: &[f64], q_mean: f64, q_inv_norm: f64) -> Result<Vec<f64>> {
        let qt = self.dot_products(query)?;
        let m_f = self.m as f64;
        Ok(qt
            .iter()
            .zip(self.stats.mean.iter().zip(&self.stats.inv_norm))
            .map(|(&qt, (&mu, &inv))| qt_to_distance(qt, m_f, q_mean, q_inv_norm, mu, inv))
            .collect())
    }

    /// Distance profile of window `q` of `source`, whose statistics are
    /// `source_stats`.
    pub fn distance_profile_at(
        &self,
        source: &[f64],
        source_stats: &RollingStats,
        q: usize,
    ) -> Result<Vec<f64>> {
        self.distance_profile(
            &source[q..q + self.m],
            source_stats.mean[q],
            source_stats.inv_norm[q],
        )
    }
}

/// Distance profile of an arbitrary `query` against every window of `series`
/// (Mueen's algorithm for similarity search).
pub fn mass(query: &[f64], series: &[f64]) -> Result<Vec<f64>> {
    let m = query.len();
    validate_window(series.len(), m)?;
    check_finite(query, "query")?;
    check_finite(series, "series")?;

    let stats = RollingStats::compute(series, m)?;
    let kernel = DistanceKernel::new(series, &stats, m)?;
    let (mu, m2) = window_moments(query);
    let (_, inv) = norm_from_m2(m2, mu, m);
    kernel.distance_profile(query, mu, inv)
}
