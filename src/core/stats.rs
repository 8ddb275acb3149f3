use crate::error::{Error, Result};

/// Windows whose standard deviation is below this fraction of their scale
/// (`max(|mean|, 1)`) are treated as constant.
const CONSTANT_STD_RATIO: f64 = 1e-12;

/// Rolling updates leave a residue of a few ulps of the largest variance seen so
/// far. Windows whose variance falls below this fraction of that peak are
/// recomputed directly so that flat regions come out exactly flat.
const REFRESH_VAR_RATIO: f64 = 1e-8;

/// Running sum with a Knuth two-sum correction term.
#[derive(Debug, Clone, Copy, Default)]
struct Compensated {
    sum: f64,
    err: f64,
}

impl Compensated {
    fn from_value(v: f64) -> Self {
        Self { sum: v, err: 0.0 }
    }

    #[inline]
    fn add(&mut self, x: f64) {
        let s = self.sum + x;
        let z = s - self.sum;
        self.err += (self.sum - (s - z)) + (x - z);
        self.sum = s;
    }

    #[inline]
    fn value(&self) -> f64 {
        self.sum + self.err
    }
}

/// Two-pass compensated mean and sum of squared deviations of `w`.
pub(crate) fn window_moments(w: &[f64]) -> (f64, f64) {
    let n = w.len() as f64;
    let mut sum = Compensated::default();
    for &x in w {
        sum.add(x);
    }
    let mu = sum.value() / n;
    let mut m2 = Compensated::default();
    for &x in w {
        let d = x - mu;
        m2.add(d * d);
    }
    (mu, m2.value().max(0.0))
}

/// Convert a window's sum of squared deviations into `(std, inv_norm)`.
///
/// `inv_norm = 1 / sqrt(m2) = 1 / (sqrt(m) * sigma)`; zero for constant windows.
#[inline]
pub(crate) fn norm_from_m2(m2: f64, mu: f64, m: usize) -> (f64, f64) {
    let m2 = m2.max(0.0);
    let sigma = (m2 / m as f64).sqrt();
    if sigma <= CONSTANT_STD_RATIO * mu.abs().max(1.0) {
        (sigma, 0.0)
    } else {
        (sigma, 1.0 / m2.sqrt())
    }
}

pub(crate) fn validate_window(len: usize, m: usize) -> Result<()> {
    if m <= 1 {
        return Err(Error::window(m, "must be at least 2"));
    }
    if m > len {
        return Err(Error::window(
            m,
            format!("exceeds series length {len}"),
        ));
    }
    Ok(())
}

/// Sliding-window mean, standard deviation and inverse norm for all
/// subsequences of length `m`.
///
/// The mean is carried as a compensated running sum; the sum of squared
/// deviations follows the sliding Welford recurrence
/// `M2' = M2 + (x_in - x_out) * (x_in - mu' + x_out - mu)`, also compensated.
/// Both are a single linear pass but agree with a two-pass computation to a few
/// ulps, unlike differencing cumulative sums of squares.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    /// `1 / (sqrt(m) * sigma)` per window, zero where the window is constant.
    /// Turns the Pearson correlation into a pure product:
    /// `r = (QT - m*mu_i*mu_j) * inv_norm[i] * inv_norm[j]`.
    pub inv_norm: Vec<f64>,
}

impl RollingStats {
    /// Compute rolling statistics for subsequences of length `m`.
    ///
    /// Fails with `InvalidWindow` when `m <= 1` or `m > ts.len()`.
    pub fn compute(ts: &[f64], m: usize) -> Result<Self> {
        validate_window(ts.len(), m)?;
        let n_subs = ts.len() - m + 1;
        let mut stats = Self {
            mean: Vec::with_capacity(n_subs),
            std: Vec::with_capacity(n_subs),
            inv_norm: Vec::with_capacity(n_subs),
        };
        stats.fill(ts, m, 0, n_subs);
        Ok(stats)
    }

    /// Number of windows covered.
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Extend the statistics after samples were appended to `ts`.
    ///
    /// Only the windows that did not exist before are computed.
    pub fn extend(&mut self, ts: &[f64], m: usize) -> Result<()> {
        validate_window(ts.len(), m)?;
        let start = self.len();
        let end = ts.len() - m + 1;
        if end > start {
            self.fill(ts, m, start, end);
        }
        Ok(())
    }

    fn fill(&mut self, ts: &[f64], m: usize, start: usize, end: usize) {
        let m_f = m as f64;

        let mut sum = Compensated::default();
        for &x in &ts[start..start + m] {
            sum.add(x);
        }
        let (mut mu, m2_first) = window_moments(&ts[start..start + m]);
        let mut m2 = Compensated::from_value(m2_first);
        let mut peak = m2_first;
        self.push(mu, m2_first, m);

        for i in (start + 1)..end {
            let x_out = ts[i - 1];
            let x_in = ts[i + m - 1];
            sum.add(x_in);
            sum.add(-x_out);
            let mu_next = sum.value() / m_f;
            m2.add((x_in - x_out) * (x_in - mu_next + x_out - mu));
            mu = mu_next;

            let mut m2_val = m2.value();
            if m2_val <= REFRESH_VAR_RATIO * peak {
                let (mu_exact, m2_exact) = window_moments(&ts[i..i + m]);
                mu = mu_exact;
                m2_val = m2_exact;
                m2 = Compensated::from_value(m2_exact);
            }
            peak = peak.max(m2_val);
            self.push(mu, m2_val, m);
        }
    }

    fn push(&mut self, mu: f64, m2: f64, m: usize) {
        let (sigma, inv) = norm_from_m2(m2, mu, m);
        self.mean.push(mu);
        self.std.push(sigma);
        self.inv_norm.push(inv);
    }
}

/// Z-normalize a whole series: `(x - mean) / std` with the population std.
///
/// Fails with `InvalidLength` on empty input and `DegenerateSeries` when the
/// series is constant.
pub fn z_normalize(ts: &[f64]) -> Result<Vec<f64>> {
    if ts.is_empty() {
        return Err(Error::InvalidLength("cannot normalize an empty series".into()));
    }
    let (mu, m2) = window_moments(ts);
    let sigma = (m2 / ts.len() as f64).sqrt();
    if sigma == 0.0 {
        return Err(Error::DegenerateSeries(
            "standard deviation is zero".into(),
        ));
    }
    Ok(ts.iter().map(|&x| (x - mu) / sigma).collect())
}
