use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::common::argmin_finite;
use crate::core::matrix_profile::MatrixProfile;
use crate::error::{Error, Result};

/// Single change point found by [`MatrixProfile::segment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    /// Offset with the lowest corrected arc curve value.
    pub change_point: usize,
    /// Curve value at `change_point`, in `[0, 1]`.
    pub score: f64,
    /// Corrected Arc Curve. Values near 0 indicate regime boundaries.
    pub cac: Vec<f64>,
}

/// Number of nearest-neighbour arcs passing over each offset.
///
/// The arc `i -> profile_index[i]` crosses the offsets strictly between its
/// endpoints. Counted with a delta array and a prefix sum.
fn arc_counts(profile_index: &[usize]) -> Vec<usize> {
    let n = profile_index.len();
    let mut deltas = vec![0i64; n + 1];
    for (i, &j) in profile_index.iter().enumerate() {
        let (lo, hi) = (i.min(j), i.max(j).min(n));
        if hi > lo + 1 {
            deltas[lo + 1] += 1;
            deltas[hi] -= 1;
        }
    }

    let mut running = 0i64;
    deltas[..n]
        .iter()
        .map(|d| {
            running += d;
            running.max(0) as usize
        })
        .collect()
}

/// Corrected Arc Curve of a self-join profile index.
///
/// Arc counts are divided by the triangular envelope `min(p, n - 1 - p)` and
/// clamped to `[0, 1]`. Offsets with an empty envelope, including both
/// endpoints, are set to 1.
pub fn corrected_arc_curve(profile_index: &[usize]) -> Vec<f64> {
    let n = profile_index.len();
    arc_counts(profile_index)
        .into_iter()
        .enumerate()
        .map(|(p, count)| {
            let envelope = p.min(n - 1 - p);
            if envelope == 0 {
                1.0
            } else {
                (count as f64 / envelope as f64).clamp(0.0, 1.0)
            }
        })
        .collect()
}

impl MatrixProfile {
    /// Locate the most likely regime change of a self-joined series.
    pub fn segment(&self) -> Result<SegmentationResult> {
        self.require_computed()?;
        if !self.is_self_join() {
            return Err(Error::InvalidInput(
                "segmentation needs a self-join profile".into(),
            ));
        }

        let cac = corrected_arc_curve(&self.profile_index);
        let (change_point, score) = argmin_finite(&cac).unwrap_or((0, 1.0));
        debug!(change_point, score, "segmentation done");
        Ok(SegmentationResult {
            change_point,
            score,
            cac,
        })
    }
}
