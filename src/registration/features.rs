//! Edge and planar feature selection.
//!
//! Each beam's curvature-valid range is split into six contiguous
//! segments so features spread around the whole revolution instead of
//! clustering on the strongest structure. Within a segment, indices are
//! sorted by curvature; the top of the order yields edge picks, the
//! bottom planar picks. Every pick masks up to five tightly-spaced
//! neighbors on each side so later picks land elsewhere.

use crate::core::types::PointCloud;
use crate::utils::constants::{CLUSTER_SPREAD_SQ, CURVATURE_THRESHOLD};

use super::curvature::FeatureScratch;
use super::voxel::VoxelGridFilter;

/// Per-segment pick limits and thresholds.
#[derive(Debug, Clone, Copy)]
pub struct SelectionConfig {
    /// Curvature boundary between edge and planar candidates
    pub curvature_threshold: f32,
    /// Squared distance that ends the neighbor-masking walk
    pub cluster_spread_sq: f32,
    /// Sharp edge picks per segment
    pub max_sharp: usize,
    /// Total edge picks per segment (sharp included)
    pub max_less_sharp: usize,
    /// Planar picks per segment
    pub max_flat: usize,
    /// Segments per beam
    pub segments: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            curvature_threshold: CURVATURE_THRESHOLD,
            cluster_spread_sq: CLUSTER_SPREAD_SQ,
            max_sharp: 2,
            max_less_sharp: 20,
            max_flat: 4,
            segments: 6,
        }
    }
}

/// The four feature clouds extracted from one sweep.
#[derive(Debug, Default)]
pub struct SweepFeatures {
    pub corner_sharp: PointCloud,
    pub corner_less_sharp: PointCloud,
    pub surf_flat: PointCloud,
    pub surf_less_flat: PointCloud,
}

/// Select features over the concatenated cloud.
///
/// `ranges` are the per-beam curvature-valid index ranges; inverted
/// ranges (short or empty beams) are skipped. The less-flat bulk of each
/// beam is voxel-downsampled before joining the global cloud.
pub fn select_features(
    cloud: &PointCloud,
    ranges: &[(isize, isize)],
    scratch: &mut FeatureScratch,
    config: &SelectionConfig,
    voxel: &VoxelGridFilter,
) -> SweepFeatures {
    let mut features = SweepFeatures::default();
    let mut less_flat_scan = PointCloud::new();

    for &(beam_start, beam_end) in ranges {
        if beam_start > beam_end {
            continue;
        }
        less_flat_scan.clear();

        let segments = config.segments as isize;
        for j in 0..segments {
            let sp = (beam_start * (segments - j) + beam_end * j) / segments;
            let ep = (beam_start * (segments - 1 - j) + beam_end * (j + 1)) / segments - 1;
            if sp > ep {
                continue;
            }
            let (sp, ep) = (sp as usize, ep as usize);

            sort_segment_by_curvature(scratch, sp, ep);
            pick_corners(cloud, scratch, config, sp, ep, &mut features);
            pick_planar(cloud, scratch, config, sp, ep, &mut features);

            // Everything not labeled an edge joins the less-flat bulk.
            for k in sp..=ep {
                if scratch.label[k] <= 0 {
                    less_flat_scan.push(cloud[k]);
                }
            }
        }

        features.surf_less_flat.append(&voxel.apply(&less_flat_scan));
    }

    features
}

/// Stable insertion sort of `sort_ind[sp..=ep]` ascending by curvature.
///
/// Segments hold 50–100 indices, so insertion sort beats the allocation
/// of a general sort, and keying ties by the original index keeps the
/// pick order reproducible.
fn sort_segment_by_curvature(scratch: &mut FeatureScratch, sp: usize, ep: usize) {
    for k in sp + 1..=ep {
        let mut l = k;
        while l > sp {
            let (a, b) = (scratch.sort_ind[l - 1], scratch.sort_ind[l]);
            if (scratch.curvature[a], a) <= (scratch.curvature[b], b) {
                break;
            }
            scratch.sort_ind.swap(l - 1, l);
            l -= 1;
        }
    }
}

/// Walk outward from a pick and mask neighbors until the chain breaks.
fn mask_cluster(cloud: &PointCloud, scratch: &mut FeatureScratch, ind: usize, spread_sq: f32) {
    scratch.neighbor_picked[ind] = true;
    for l in 1..=5usize {
        if cloud[ind + l].squared_distance(&cloud[ind + l - 1]) > spread_sq {
            break;
        }
        scratch.neighbor_picked[ind + l] = true;
    }
    for l in 1..=5usize {
        if cloud[ind - l].squared_distance(&cloud[ind - l + 1]) > spread_sq {
            break;
        }
        scratch.neighbor_picked[ind - l] = true;
    }
}

fn pick_corners(
    cloud: &PointCloud,
    scratch: &mut FeatureScratch,
    config: &SelectionConfig,
    sp: usize,
    ep: usize,
    features: &mut SweepFeatures,
) {
    let mut picked = 0usize;
    for k in (sp..=ep).rev() {
        let ind = scratch.sort_ind[k];
        if scratch.neighbor_picked[ind] || scratch.curvature[ind] <= config.curvature_threshold {
            continue;
        }

        picked += 1;
        if picked <= config.max_sharp {
            scratch.label[ind] = 2;
            features.corner_sharp.push(cloud[ind]);
            features.corner_less_sharp.push(cloud[ind]);
        } else if picked <= config.max_less_sharp {
            scratch.label[ind] = 1;
            features.corner_less_sharp.push(cloud[ind]);
        } else {
            break;
        }

        mask_cluster(cloud, scratch, ind, config.cluster_spread_sq);
    }
}

fn pick_planar(
    cloud: &PointCloud,
    scratch: &mut FeatureScratch,
    config: &SelectionConfig,
    sp: usize,
    ep: usize,
    features: &mut SweepFeatures,
) {
    let mut picked = 0usize;
    for k in sp..=ep {
        let ind = scratch.sort_ind[k];
        if scratch.neighbor_picked[ind] || scratch.curvature[ind] >= config.curvature_threshold {
            continue;
        }

        scratch.label[ind] = -1;
        features.surf_flat.push(cloud[ind]);
        mask_cluster(cloud, scratch, ind, config.cluster_spread_sq);

        picked += 1;
        if picked >= config.max_flat {
            break;
        }
    }
}
