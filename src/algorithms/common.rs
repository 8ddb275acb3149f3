use realfft::RealFftPlanner;

use crate::error::Result;

/// Size threshold (n * m) above which we dispatch to the FFT path.
/// Below this, the naive O(n*m) loop wins due to lower constant overhead.
const FFT_THRESHOLD: usize = 256 * 1024;

/// Compute the sliding dot product between a query subsequence `q` and time series `ts`.
///
/// Returns a vector of length `ts.len() - q.len() + 1` where element `i` is
/// `dot(q, ts[i..i+m])`. Callers guarantee `ts.len() >= q.len() > 0`.
///
/// Adaptively dispatches to an FFT-based O(n log n) implementation for large
/// inputs, falling back to the naive O(n*m) loop for small inputs.
pub fn sliding_dot_product(q: &[f64], ts: &[f64]) -> Result<Vec<f64>> {
    if ts.len() * q.len() > FFT_THRESHOLD {
        sliding_dot_product_fft(q, ts)
    } else {
        Ok(sliding_dot_product_naive(q, ts))
    }
}

/// Naive O(n*m) sliding dot product.
pub fn sliding_dot_product_naive(q: &[f64], ts: &[f64]) -> Vec<f64> {
    let m = q.len();
    let n_subs = ts.len() + 1 - m;

    (0..n_subs)
        .map(|i| q.iter().zip(&ts[i..i + m]).map(|(a, b)| a * b).sum())
        .collect()
}

/// FFT-based O(n log n) sliding dot product via cross-correlation.
///
/// One-shot version of [`DistanceKernel`](crate::algorithms::mass::DistanceKernel)'s
/// cached-spectrum path: plans, transforms both inputs and discards everything.
pub fn sliding_dot_product_fft(q: &[f64], ts: &[f64]) -> Result<Vec<f64>> {
    let m = q.len();
    let n = ts.len();
    let n_subs = n + 1 - m;
    let fft_len = (n + m - 1).next_power_of_two();

    let mut planner = RealFftPlanner::<f64>::new();
    let fft_forward = planner.plan_fft_forward(fft_len);
    let fft_inverse = planner.plan_fft_inverse(fft_len);

    let mut q_padded = vec![0.0; fft_len];
    for (dst, src) in q_padded.iter_mut().zip(q.iter().rev()) {
        *dst = *src;
    }
    let mut ts_padded = vec![0.0; fft_len];
    ts_padded[..n].copy_from_slice(ts);

    let mut q_spectrum = fft_forward.make_output_vec();
    let mut ts_spectrum = fft_forward.make_output_vec();
    fft_forward.process(&mut q_padded, &mut q_spectrum)?;
    fft_forward.process(&mut ts_padded, &mut ts_spectrum)?;

    for (q_val, ts_val) in q_spectrum.iter_mut().zip(ts_spectrum.iter()) {
        *q_val *= ts_val;
    }

    let mut result = vec![0.0; fft_len];
    fft_inverse.process(&mut q_spectrum, &mut result)?;

    // realfft inverse is unnormalized
    let norm = 1.0 / fft_len as f64;
    Ok(result[m - 1..m - 1 + n_subs]
        .iter()
        .map(|&x| x * norm)
        .collect())
}

/// Inclusive self-join exclusion radius for window length `m`.
///
/// Offsets closer than `m / 2` to a query are trivial matches, so the zone
/// around `i` is `[i - (m-1)/2, i + (m-1)/2]`.
#[inline]
pub fn exclusion_zone(m: usize) -> usize {
    m.saturating_sub(1) / 2
}

/// Apply an exclusion zone around index `idx`, setting entries within the zone to infinity.
///
/// The zone covers indices `[idx - zone, idx + zone]` (clamped to bounds).
#[inline]
pub fn apply_exclusion_zone(profile: &mut [f64], idx: usize, zone: usize) {
    let start = idx.saturating_sub(zone).min(profile.len());
    let end = (idx + zone + 1).min(profile.len());
    for val in &mut profile[start..end] {
        *val = f64::INFINITY;
    }
}

/// Position and value of the smallest finite entry; ties go to the lowest index.
pub(crate) fn argmin_finite(values: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_finite() && best.map_or(true, |(_, b)| v < b) {
            best = Some((i, v));
        }
    }
    best
}

/// Position and value of the largest finite entry; ties go to the lowest index.
pub(crate) fn argmax_finite(values: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_finite() && best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best
}

/// Convert Pearson correlations to z-normalized Euclidean distances for
/// window length `m`. Correlations above 1 (round-off) are capped.
pub fn pearson_to_euclidean(correlations: &[f64], m: usize) -> Vec<f64> {
    let two_m = 2.0 * m as f64;
    correlations
        .iter()
        .map(|&r| (two_m * (1.0 - r.min(1.0))).sqrt())
        .collect()
}

/// Convert z-normalized Euclidean distances to Pearson correlations for
/// window length `m`, clamped to `[0, 1]`. Negative correlations are not
/// recovered.
pub fn euclidean_to_pearson(distances: &[f64], m: usize) -> Vec<f64> {
    let two_m = 2.0 * m as f64;
    distances
        .iter()
        .map(|&d| (1.0 - d * d / two_m).clamp(0.0, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sliding_dot_product_simple() {
        // dot([1,2], [1,2]) = 5, dot([1,2], [2,3]) = 8, dot([1,2], [3,4]) = 11
        let q = vec![1.0, 2.0];
        let ts = vec![1.0, 2.0, 3.0, 4.0];
        let result = sliding_dot_product(&q, &ts).unwrap();
        assert_eq!(result, vec![5.0, 8.0, 11.0]);
    }

    #[test]
    fn test_fft_vs_naive_equivalence() {
        for (n, m) in [(100, 10), (1000, 50), (5000, 100)] {
            let ts: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin()).collect();
            let q = &ts[0..m];
            let naive = sliding_dot_product_naive(q, &ts);
            let fft = sliding_dot_product_fft(q, &ts).unwrap();
            assert_eq!(naive.len(), fft.len());
            for (i, (a, b)) in naive.iter().zip(fft.iter()).enumerate() {
                assert!(
                    (a - b).abs() < 1e-6,
                    "Mismatch at {i} (n={n}, m={m}): naive={a}, fft={b}"
                );
            }
        }
    }

    #[test]
    fn test_exclusion_zone_radius() {
        assert_eq!(exclusion_zone(2), 0);
        assert_eq!(exclusion_zone(3), 1);
        assert_eq!(exclusion_zone(4), 1);
        assert_eq!(exclusion_zone(32), 15);
        // |i - j| < m/2 for every excluded j
        for m in 2..40usize {
            let r = exclusion_zone(m);
            assert!(2 * r < m);
            assert!(2 * (r + 1) >= m);
        }
    }

    #[test]
    fn test_apply_exclusion_zone_middle_and_edge() {
        let mut profile = vec![1.0; 10];
        apply_exclusion_zone(&mut profile, 5, 2);
        for (i, &val) in profile.iter().enumerate() {
            assert_eq!(val.is_infinite(), (3..=7).contains(&i));
        }

        let mut profile = vec![1.0; 5];
        apply_exclusion_zone(&mut profile, 0, 2);
        assert_eq!(profile.iter().filter(|v| v.is_infinite()).count(), 3);

        let mut profile = vec![1.0; 5];
        apply_exclusion_zone(&mut profile, 4, 0);
        assert!(profile[4].is_infinite());
        assert!(profile[..4].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_argmin_argmax_ties() {
        let v = [3.0, 1.0, f64::INFINITY, 1.0, 5.0, 5.0];
        assert_eq!(argmin_finite(&v), Some((1, 1.0)));
        assert_eq!(argmax_finite(&v), Some((4, 5.0)));
        assert_eq!(argmin_finite(&[f64::INFINITY; 3]), None);
    }

    #[test]
    fn test_pearson_euclidean_round_trip() {
        let m = 8;
        let r = vec![1.0, 0.9, 0.5, 0.1, 0.0];
        let d = pearson_to_euclidean(&r, m);
        assert_abs_diff_eq!(d[0], 0.0);
        assert_abs_diff_eq!(d[4], 4.0, epsilon = 1e-12);
        let back = euclidean_to_pearson(&d, m);
        for (a, b) in r.iter().zip(&back) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pearson_conversion_clamps() {
        let d = pearson_to_euclidean(&[1.0 + 1e-12], 4);
        assert_eq!(d[0], 0.0);
        // distance beyond sqrt(2m) means negative correlation, clamped to 0
        let r = euclidean_to_pearson(&[5.0], 4);
        assert_eq!(r[0], 0.0);
    }
}
