//! Curvature proxy and feature-rejection masks.
//!
//! Curvature of a point is the squared norm of the 11-point second
//! difference of its neighborhood along the sweep. Large values mark
//! edges, small values planes. Before selection, two classes of points
//! are masked out: those on surfaces grazing the beam (easily occluded
//! between sweeps) and isolated returns that jump away from both
//! neighbors.

use crate::core::types::PointCloud;
use crate::utils::constants::MAX_SWEEP_POINTS;

/// Reusable per-sweep scratch arrays.
///
/// Grown to the largest observed sweep and reused across frames; growth
/// is capped at [`MAX_SWEEP_POINTS`].
#[derive(Debug, Default)]
pub struct FeatureScratch {
    /// Squared norm of the 11-point second difference
    pub curvature: Vec<f32>,
    /// Index permutation sorted per segment during selection
    pub sort_ind: Vec<usize>,
    /// Mask of points excluded from further picks
    pub neighbor_picked: Vec<bool>,
    /// Pick label: 2 sharp, 1 less sharp, 0 untouched, −1 flat
    pub label: Vec<i8>,
}

impl FeatureScratch {
    /// Create empty scratch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize for a sweep of `len` points and reset all per-point state.
    pub fn reset(&mut self, len: usize) {
        let len = len.min(MAX_SWEEP_POINTS);
        self.curvature.clear();
        self.curvature.resize(len, 0.0);
        self.sort_ind.clear();
        self.sort_ind.extend(0..len);
        self.neighbor_picked.clear();
        self.neighbor_picked.resize(len, false);
        self.label.clear();
        self.label.resize(len, 0);
    }
}

/// Per-beam index ranges over the concatenated cloud within which
/// curvature is valid (the 10-neighborhood stays inside one beam).
///
/// For beam `b` at offset `o` with `n` points the range is
/// `[o + 5, o + n − 5]`. Beams too short to host a full neighborhood
/// produce an inverted range, which the selection pass skips.
pub fn beam_ranges(beam_lens: &[usize]) -> Vec<(isize, isize)> {
    let mut ranges = Vec::with_capacity(beam_lens.len());
    let mut offset = 0isize;
    for &len in beam_lens {
        ranges.push((offset + 5, offset + len as isize - 5));
        offset += len as isize;
    }
    ranges
}

/// Fill `scratch.curvature` for every interior index of the cloud.
///
/// Indices whose neighborhood crosses a beam boundary still get a value
/// here; the beam ranges exclude them from selection.
pub fn compute_curvature(cloud: &PointCloud, scratch: &mut FeatureScratch) {
    let n = scratch.curvature.len();
    if n < 11 {
        return;
    }
    for i in 5..n - 5 {
        let c = &cloud[i];
        let mut dx = -10.0 * c.x;
        let mut dy = -10.0 * c.y;
        let mut dz = -10.0 * c.z;
        for k in 1..=5usize {
            let a = &cloud[i - k];
            let b = &cloud[i + k];
            dx += a.x + b.x;
            dy += a.y + b.y;
            dz += a.z + b.z;
        }
        scratch.curvature[i] = dx * dx + dy * dy + dz * dz;
    }
}

/// Rejection thresholds for [`mark_unreliable`].
#[derive(Debug, Clone, Copy)]
pub struct RejectionThresholds {
    /// Squared gap between consecutive points that triggers the
    /// occlusion check
    pub occlusion_gap_sq: f32,
    /// Side-length ratio under which a depth step counts as grazing
    pub occlusion_ratio: f32,
    /// Relative squared-distance threshold for isolated returns
    pub outlier_ratio: f32,
}

/// Mask points on grazing surfaces and isolated returns.
///
/// A large depth step between neighbors `i` and `i+1` whose direction is
/// nearly parallel to the beam indicates a surface one sweep can see and
/// the next cannot; the five points on the nearer side of the step are
/// masked. Separately, a point far from both of its direct neighbors
/// (relative to its depth) is masked as an outlier.
pub fn mark_unreliable(
    cloud: &PointCloud,
    scratch: &mut FeatureScratch,
    thresholds: &RejectionThresholds,
) {
    let n = scratch.neighbor_picked.len();
    if n < 12 {
        return;
    }
    for i in 5..n - 6 {
        let gap_sq = cloud[i + 1].squared_distance(&cloud[i]);

        if gap_sq > thresholds.occlusion_gap_sq {
            let depth1 = cloud[i].depth();
            let depth2 = cloud[i + 1].depth();

            if depth1 > depth2 {
                // Pull the farther point onto the nearer ray and compare
                // the residual against the nearer depth.
                let dx = cloud[i + 1].x - cloud[i].x * depth2 / depth1;
                let dy = cloud[i + 1].y - cloud[i].y * depth2 / depth1;
                let dz = cloud[i + 1].z - cloud[i].z * depth2 / depth1;
                if (dx * dx + dy * dy + dz * dz).sqrt() / depth2 < thresholds.occlusion_ratio {
                    for m in scratch.neighbor_picked[i - 5..=i].iter_mut() {
                        *m = true;
                    }
                }
            } else {
                let dx = cloud[i + 1].x * depth1 / depth2 - cloud[i].x;
                let dy = cloud[i + 1].y * depth1 / depth2 - cloud[i].y;
                let dz = cloud[i + 1].z * depth1 / depth2 - cloud[i].z;
                if (dx * dx + dy * dy + dz * dz).sqrt() / depth1 < thresholds.occlusion_ratio {
                    for m in scratch.neighbor_picked[i + 1..=i + 6].iter_mut() {
                        *m = true;
                    }
                }
            }
        }

        let diff_next = gap_sq;
        let diff_prev = cloud[i].squared_distance(&cloud[i - 1]);
        let depth_sq = cloud[i].squared_depth();
        if diff_next > thresholds.outlier_ratio * depth_sq
            && diff_prev > thresholds.outlier_ratio * depth_sq
        {
            scratch.neighbor_picked[i] = true;
        }
    }
}
