//! Matrix profile computation and analysis.
//!
//! A [`MatrixProfile`] records, for every length-`m` subsequence of a series
//! A, the z-normalized Euclidean distance to its nearest neighbour in A
//! itself (self-join) or in a second series B (AB-join). Several exact and
//! approximate strategies compute it in parallel; the result feeds motif and
//! discord discovery, regime segmentation and the MPdist series distance.
//!
//! # Examples
//!
//! ```
//! use matrix_profile::{Algorithm, ComputeOptions, MatrixProfile};
//!
//! let ts: Vec<f64> = (0..200).map(|i| (i as f64 * 0.3).sin()).collect();
//! let mut mp = MatrixProfile::new(&ts, None, 16)?;
//! mp.compute(&ComputeOptions::new(Algorithm::Diagonal))?;
//! assert_eq!(mp.len(), ts.len() - 16 + 1);
//!
//! let motifs = mp.top_k_motifs(1, 2.0)?;
//! assert_eq!(motifs.len(), 1);
//! # Ok::<(), matrix_profile::Error>(())
//! ```

pub mod algorithms;
pub mod core;
pub mod error;

pub use crate::algorithms::annotation::AnnotationVector;
pub use crate::algorithms::batching::{diagonal_batches, Batch};
pub use crate::algorithms::common::{euclidean_to_pearson, pearson_to_euclidean};
pub use crate::algorithms::fluss::{corrected_arc_curve, SegmentationResult};
pub use crate::algorithms::mass::{mass, DistanceKernel};
pub use crate::algorithms::motifs::{Discord, MotifGroup};
pub use crate::algorithms::mpdist::mpdist;
pub use crate::core::matrix_profile::{MatrixProfile, Neighbor};
pub use crate::core::options::{Algorithm, ComputeOptions, MpDistOptions};
pub use crate::core::persist::Format;
pub use crate::core::stats::{z_normalize, RollingStats};
pub use crate::error::{Error, Result};
