use crate::algorithms::annotation::AnnotationVector;
use crate::algorithms::common::exclusion_zone;
use crate::core::stats::{validate_window, RollingStats};
use crate::error::{Error, Result};

/// A nearest neighbour: distance and start offset into the target series.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Neighbor {
    pub distance: f64,
    pub index: usize,
}

/// Rolling statistics of the series taking part in a join, kept between
/// `compute` and `update` so only new windows need fresh statistics.
#[derive(Debug, Clone)]
pub(crate) struct JoinStats {
    pub a: RollingStats,
    /// Statistics of B for AB-joins; self-joins reuse `a`.
    pub b: Option<RollingStats>,
}

/// The matrix profile of series A, joined against itself or against B.
///
/// Created by [`MatrixProfile::new`], populated by
/// [`compute`](MatrixProfile::compute), extended by
/// [`update`](MatrixProfile::update) and read by the post-analysis methods.
/// Until computed, every distance is `+inf`.
#[derive(Debug, Clone)]
pub struct MatrixProfile {
    pub(crate) a: Vec<f64>,
    pub(crate) b: Option<Vec<f64>>,
    pub(crate) m: usize,
    pub(crate) profile: Vec<f64>,
    pub(crate) profile_index: Vec<usize>,
    pub(crate) right_profile: Option<Vec<Option<Neighbor>>>,
    pub(crate) annotation: Option<Vec<f64>>,
    /// Generator of `annotation`, when it came from a built-in one, so it can
    /// be rebuilt after the series grows.
    pub(crate) annotation_kind: Option<AnnotationVector>,
    pub(crate) computed: bool,
    pub(crate) stats: Option<JoinStats>,
    /// Workers used by `update`; set by the last `compute`.
    pub(crate) parallelism: usize,
}

impl MatrixProfile {
    /// Validate the inputs and create an empty profile.
    ///
    /// `b = None` requests a self-join, which additionally needs
    /// `a.len() >= 2 * m` so the exclusion zone leaves candidates for every
    /// offset.
    pub fn new(a: &[f64], b: Option<&[f64]>, m: usize) -> Result<Self> {
        if a.is_empty() {
            return Err(Error::InvalidLength("series A is empty".into()));
        }
        if let Some(b) = b {
            if b.is_empty() {
                return Err(Error::InvalidLength("series B is empty".into()));
            }
        }
        check_finite(a, "series A")?;
        if let Some(b) = b {
            check_finite(b, "series B")?;
        }

        validate_window(a.len(), m)?;
        match b {
            Some(b) => validate_window(b.len(), m)?,
            None if a.len() < 2 * m => {
                return Err(Error::window(
                    m,
                    format!(
                        "self-join needs a series of at least 2m = {} samples, got {}",
                        2 * m,
                        a.len()
                    ),
                ));
            }
            None => {}
        }

        let n_subs = a.len() - m + 1;
        Ok(Self {
            a: a.to_vec(),
            b: b.map(<[f64]>::to_vec),
            m,
            profile: vec![f64::INFINITY; n_subs],
            profile_index: vec![0; n_subs],
            right_profile: None,
            annotation: None,
            annotation_kind: None,
            computed: false,
            stats: None,
            parallelism: num_cpus::get(),
        })
    }

    /// Series A.
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Series B, `None` for a self-join.
    pub fn b(&self) -> Option<&[f64]> {
        self.b.as_deref()
    }

    /// Window length.
    pub fn m(&self) -> usize {
        self.m
    }

    pub fn is_self_join(&self) -> bool {
        self.b.is_none()
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    /// Nearest-neighbour distance per offset of A.
    pub fn profile(&self) -> &[f64] {
        &self.profile
    }

    /// Offset of the nearest neighbour, into B for AB-joins and A otherwise.
    pub fn profile_index(&self) -> &[usize] {
        &self.profile_index
    }

    /// Nearest neighbour among later offsets (self-joins only). `None` entries
    /// have no candidate to their right outside the exclusion zone.
    pub fn right_profile(&self) -> Option<&[Option<Neighbor>]> {
        self.right_profile.as_deref()
    }

    /// The installed annotation vector, if any.
    pub fn annotation(&self) -> Option<&[f64]> {
        self.annotation.as_deref()
    }

    /// The built-in generator of the installed annotation vector; `None` for
    /// caller-supplied vectors.
    pub fn annotation_kind(&self) -> Option<AnnotationVector> {
        self.annotation_kind
    }

    /// Number of profile entries, `len(A) - m + 1`.
    pub fn len(&self) -> usize {
        self.profile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_empty()
    }

    /// Self-join exclusion radius: offsets `j` with `|i - j| <= radius` are
    /// trivial matches of `i`. Zero for AB-joins.
    pub fn exclusion_radius(&self) -> usize {
        if self.is_self_join() {
            exclusion_zone(self.m)
        } else {
            0
        }
    }

    /// The series subsequences are matched against.
    pub(crate) fn target(&self) -> &[f64] {
        self.b.as_deref().unwrap_or(&self.a)
    }

    pub(crate) fn require_computed(&self) -> Result<()> {
        if self.computed {
            Ok(())
        } else {
            Err(Error::NotComputed)
        }
    }

    /// Profile distances converted to Pearson correlations in `[0, 1]`.
    pub fn to_pearson(&self) -> Result<Vec<f64>> {
        self.require_computed()?;
        Ok(crate::algorithms::common::euclidean_to_pearson(
            &self.profile,
            self.m,
        ))
    }

    /// Replace all computed arrays at once.
    pub(crate) fn install(&mut self, computed: ComputedProfile, stats: JoinStats) {
        self.profile = computed.profile;
        self.profile_index = computed.profile_index;
        self.right_profile = computed.right_profile;
        self.stats = Some(stats);
        self.computed = true;
    }

    /// Check every structural invariant of a computed profile.
    pub(crate) fn check_invariants(&self) -> Result<()> {
        if self.a.is_empty() {
            return Err(Error::InvalidLength("series A is empty".into()));
        }
        check_finite(&self.a, "series A")?;
        if let Some(b) = &self.b {
            if b.is_empty() {
                return Err(Error::InvalidLength("series B is empty".into()));
            }
            check_finite(b, "series B")?;
            validate_window(b.len(), self.m)?;
        }
        validate_window(self.a.len(), self.m)?;

        let n_subs = self.a.len() - self.m + 1;
        let n_target = self.target().len() - self.m + 1;
        if self.profile.len() != n_subs {
            return Err(Error::LengthMismatch {
                expected: n_subs,
                got: self.profile.len(),
            });
        }
        if self.profile_index.len() != n_subs {
            return Err(Error::LengthMismatch {
                expected: n_subs,
                got: self.profile_index.len(),
            });
        }
        if let Some(d) = self.profile.iter().find(|d| !(d.is_finite() && **d >= 0.0)) {
            return Err(Error::InvalidInput(format!(
                "profile distance {d} is not a finite non-negative number"
            )));
        }

        let radius = self.exclusion_radius();
        for (i, &j) in self.profile_index.iter().enumerate() {
            if j >= n_target {
                return Err(Error::InvalidInput(format!(
                    "profile index {j} at offset {i} is out of range"
                )));
            }
            if self.is_self_join() && i.abs_diff(j) <= radius {
                return Err(Error::InvalidInput(format!(
                    "profile index {j} at offset {i} is a trivial match"
                )));
            }
        }

        if let Some(right) = &self.right_profile {
            if !self.is_self_join() {
                return Err(Error::InvalidInput(
                    "right profile is only defined for self-joins".into(),
                ));
            }
            if right.len() != n_subs {
                return Err(Error::LengthMismatch {
                    expected: n_subs,
                    got: right.len(),
                });
            }
            for (i, nb) in right.iter().enumerate() {
                if let Some(nb) = nb {
                    if nb.index <= i + radius || nb.index >= n_subs || !nb.distance.is_finite() {
                        return Err(Error::InvalidInput(format!(
                            "right neighbour {} at offset {i} is invalid",
                            nb.index
                        )));
                    }
                }
            }
        }

        if let Some(av) = &self.annotation {
            crate::algorithms::annotation::check_annotation(av, n_subs)?;
        }
        Ok(())
    }
}

/// Equality over the observable state; the statistics cache and worker count
/// are ignored.
impl PartialEq for MatrixProfile {
    fn eq(&self, other: &Self) -> bool {
        self.a == other.a
            && self.b == other.b
            && self.m == other.m
            && self.profile == other.profile
            && self.profile_index == other.profile_index
            && self.right_profile == other.right_profile
            && self.annotation == other.annotation
            && self.annotation_kind == other.annotation_kind
            && self.computed == other.computed
    }
}

pub(crate) fn check_finite(ts: &[f64], what: &str) -> Result<()> {
    match ts.iter().position(|x| !x.is_finite()) {
        Some(pos) => Err(Error::InvalidInput(format!(
            "{what} has a non-finite sample at position {pos}"
        ))),
        None => Ok(()),
    }
}

/// Output of one algorithm run, ready to be installed into a profile.
#[derive(Debug, Clone)]
pub(crate) struct ComputedProfile {
    pub profile: Vec<f64>,
    pub profile_index: Vec<usize>,
    pub right_profile: Option<Vec<Option<Neighbor>>>,
}

/// A single accumulator slot.
///
/// `score` is any quantity where lower is better: a distance for the
/// FFT-based strategies, a negated correlation for the diagonal ones.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AccEntry {
    pub score: f64,
    pub right_score: f64,
    pub index: usize,
    pub right_index: usize,
}

/// Per-worker best-so-far buffer.
///
/// Each worker owns one; they are merged in batch order once all workers
/// finish, so no slot is ever written concurrently.
#[derive(Debug, Clone)]
pub(crate) struct ProfileAccumulator {
    pub entries: Vec<AccEntry>,
}

impl ProfileAccumulator {
    pub fn new(n: usize) -> Self {
        Self {
            entries: vec![
                AccEntry {
                    score: f64::INFINITY,
                    right_score: f64::INFINITY,
                    index: 0,
                    right_index: 0,
                };
                n
            ],
        }
    }

    /// Offer `neighbor` as a candidate for `idx`. Ties keep the earlier one.
    #[inline(always)]
    pub fn update(&mut self, idx: usize, score: f64, neighbor: usize) {
        let e = &mut self.entries[idx];
        if score < e.score {
            e.score = score;
            e.index = neighbor;
        }
    }

    /// Like [`update`](Self::update) for a neighbour known to lie after
    /// `idx`, so the right profile is offered the candidate too.
    #[inline(always)]
    pub fn update_right(&mut self, idx: usize, score: f64, neighbor: usize) {
        let e = &mut self.entries[idx];
        if score < e.score {
            e.score = score;
            e.index = neighbor;
        }
        if score < e.right_score {
            e.right_score = score;
            e.right_index = neighbor;
        }
    }

    /// Fold `other` in, keeping our entry on ties.
    pub fn merge(&mut self, other: &Self) {
        for (a, b) in self.entries.iter_mut().zip(other.entries.iter()) {
            if b.score < a.score {
                a.score = b.score;
                a.index = b.index;
            }
            if b.right_score < a.right_score {
                a.right_score = b.right_score;
                a.right_index = b.right_index;
            }
        }
    }

    /// Convert scores to distances with `convert`, once per entry.
    ///
    /// With `with_right`, slots that never saw a right candidate become `None`.
    pub fn finish(self, with_right: bool, convert: impl Fn(f64) -> f64) -> ComputedProfile {
        let n = self.entries.len();
        let mut profile = Vec::with_capacity(n);
        let mut profile_index = Vec::with_capacity(n);
        let mut right = Vec::with_capacity(if with_right { n } else { 0 });
        for e in &self.entries {
            profile.push(convert(e.score));
            profile_index.push(e.index);
            if with_right {
                right.push(e.right_score.is_finite().then(|| Neighbor {
                    distance: convert(e.right_score),
                    index: e.right_index,
                }));
            }
        }
        ComputedProfile {
            profile,
            profile_index,
            right_profile: with_right.then_some(right),
        }
    }
}
