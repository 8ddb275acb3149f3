use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::common::{apply_exclusion_zone, argmax_finite, argmin_finite, exclusion_zone};
use crate::algorithms::mass::DistanceKernel;
use crate::core::matrix_profile::MatrixProfile;
use crate::core::stats::RollingStats;
use crate::error::{Error, Result};

/// A group of mutually similar subsequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifGroup {
    /// Member offsets into A, ascending.
    pub indices: Vec<usize>,
    /// Profile value of the pair that seeded the group.
    pub min_distance: f64,
}

/// A subsequence whose nearest neighbour is unusually far away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discord {
    pub index: usize,
    pub distance: f64,
}

impl MatrixProfile {
    /// Find up to `k` motif groups of a self-join.
    ///
    /// Each round seeds a group with the smallest entry of the (annotated)
    /// working profile and its nearest neighbour, then gathers every other
    /// offset within `radius * min_distance` of either seed, nearest first,
    /// skipping the exclusion zones of the seeds, of members already taken
    /// and of earlier groups. The whole group is then masked out of the
    /// working profile. Stops early when no finite entry remains.
    pub fn top_k_motifs(&self, k: usize, radius: f64) -> Result<Vec<MotifGroup>> {
        if k == 0 {
            return Err(Error::InvalidK(k));
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(Error::InvalidRadius(radius));
        }
        self.require_computed()?;
        if !self.is_self_join() {
            return Err(Error::InvalidInput(
                "motif discovery needs a self-join profile".into(),
            ));
        }

        let m = self.m;
        let zone = exclusion_zone(m);
        let owned;
        let stats = match &self.stats {
            Some(cached) => &cached.a,
            None => {
                owned = RollingStats::compute(&self.a, m)?;
                &owned
            }
        };
        let kernel = DistanceKernel::new(&self.a, stats, m)?;

        let mut working = self.apply_annotation_vector()?;
        let mut groups: Vec<MotifGroup> = Vec::with_capacity(k);

        while groups.len() < k {
            let Some((seed, min_distance)) = argmin_finite(&working) else {
                break;
            };
            let pair = [seed, self.profile_index[seed]];
            let threshold = radius * min_distance;
            let mut members: Vec<usize> = Vec::new();

            for &q in &pair {
                let mut dp = kernel.distance_profile_at(&self.a, stats, q)?;
                for &p in &pair {
                    apply_exclusion_zone(&mut dp, p, zone);
                }
                for &p in members.iter().chain(groups.iter().flat_map(|g| &g.indices)) {
                    apply_exclusion_zone(&mut dp, p, zone);
                }
                while let Some((idx, d)) = argmin_finite(&dp) {
                    if d >= threshold {
                        break;
                    }
                    members.push(idx);
                    apply_exclusion_zone(&mut dp, idx, zone);
                }
            }

            // the seed's neighbour may already belong to an earlier group
            let claimed = |i: &usize| groups.iter().any(|g| g.indices.contains(i));
            members.extend(pair.into_iter().filter(|i| !claimed(i)));
            members.sort_unstable();
            members.dedup();
            for &idx in &members {
                apply_exclusion_zone(&mut working, idx, zone);
            }
            debug!(group = groups.len(), seed, size = members.len(), min_distance, "motif group found");
            groups.push(MotifGroup {
                indices: members,
                min_distance,
            });
        }

        Ok(groups)
    }

    /// Find up to `k` discords: the largest finite entries of the
    /// (annotated) profile, masking `exclusion_radius` offsets on both sides
    /// of each pick before the next one.
    pub fn top_k_discords(&self, k: usize, exclusion_radius: usize) -> Result<Vec<Discord>> {
        if k == 0 {
            return Err(Error::InvalidK(k));
        }
        self.require_computed()?;

        let mut working = self.apply_annotation_vector()?;
        let mut discords = Vec::with_capacity(k);
        while discords.len() < k {
            let Some((index, distance)) = argmax_finite(&working) else {
                break;
            };
            discords.push(Discord { index, distance });
            apply_exclusion_zone(&mut working, index, exclusion_radius);
        }
        debug!(found = discords.len(), k, "discords found");
        Ok(discords)
    }
}
