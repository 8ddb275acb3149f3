use tracing::{debug, instrument};

use crate::core::matrix_profile::MatrixProfile;
use crate::core::options::MpDistOptions;
use crate::error::Result;

/// MPdist: a single dissimilarity between two whole series.
///
/// Both AB-join profiles (A against B, then B against A) are concatenated and
/// the value at `k = ceil(percentile * (len(a) + len(b)))` in sorted order is
/// returned, or the largest value when `k` runs past the end. A small
/// percentile makes the measure robust to a few dissimilar regions.
///
/// # References
/// Gharghabi et al., "Matrix Profile XII: MPdist", 2018.
#[instrument(skip_all, fields(len_a = a.len(), len_b = b.len(), m = m))]
pub fn mpdist(a: &[f64], b: &[f64], m: usize, options: &MpDistOptions) -> Result<f64> {
    options.validate()?;

    let mut ab = MatrixProfile::new(a, Some(b), m)?;
    let mut ba = MatrixProfile::new(b, Some(a), m)?;
    ab.compute(&options.compute)?;
    ba.compute(&options.compute)?;

    let mut joined = Vec::with_capacity(ab.len() + ba.len());
    joined.extend_from_slice(ab.profile());
    joined.extend_from_slice(ba.profile());

    let k = ((options.percentile * (a.len() + b.len()) as f64).ceil() as usize)
        .min(joined.len() - 1);
    let (_, kth, _) = joined.select_nth_unstable_by(k, f64::total_cmp);
    let distance = *kth;
    debug!(k, n = joined.len(), distance, "mpdist");
    Ok(distance)
}
