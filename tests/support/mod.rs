//! Synthetic signals shared by the integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One piece of a piecewise sine signal.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub len: usize,
    pub freq_hz: f64,
    pub amplitude: f64,
    pub offset: f64,
}

/// Concatenate sine segments sampled at `fs` Hz and add uniform noise in
/// `[-noise, noise]`. The phase restarts at every segment.
pub fn sine_segments(segments: &[Segment], fs: f64, noise: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(segments.iter().map(|s| s.len).sum());
    for s in segments {
        for t in 0..s.len {
            let x = s.offset
                + s.amplitude * (2.0 * std::f64::consts::PI * s.freq_hz * t as f64 / fs).sin();
            let jitter = if noise > 0.0 {
                rng.gen_range(-noise..=noise)
            } else {
                0.0
            };
            out.push(x + jitter);
        }
    }
    out
}

/// Two regimes: 200 samples of a 5 Hz unit sine, then 100 samples of a
/// quieter 10 Hz sine raised by 0.75, sampled at 100 Hz, with noise 0.01.
pub fn two_regimes(seed: u64) -> Vec<f64> {
    two_regimes_with_noise(seed, 0.01)
}

pub fn two_regimes_with_noise(seed: u64, noise: f64) -> Vec<f64> {
    sine_segments(
        &[
            Segment {
                len: 200,
                freq_hz: 5.0,
                amplitude: 1.0,
                offset: 0.0,
            },
            Segment {
                len: 100,
                freq_hz: 10.0,
                amplitude: 0.25,
                offset: 0.75,
            },
        ],
        100.0,
        noise,
        seed,
    )
}

/// Seeded uniform noise in `[-1, 1]`.
pub fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..=1.0)).collect()
}
