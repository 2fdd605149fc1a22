//! Per-sweep output bundle.

use serde::{Deserialize, Serialize};

use super::imu::ImuTrans;
use super::point::PointCloud;

/// Everything the registration front-end publishes for one sweep.
///
/// All five clouds share the input sweep's timestamp and frame id. The
/// feature clouds are subsets of the full de-skewed cloud:
/// `corner_sharp ⊆ corner_less_sharp` and `surf_flat` is disjoint from
/// the (pre-downsampling) less-flat bulk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationFrame {
    /// Timestamp of the input sweep, seconds
    pub stamp: f64,
    /// Frame identifier stamped on every artifact
    pub frame_id: String,
    /// Full de-skewed cloud, beams concatenated in order
    pub cloud: PointCloud,
    /// Edge features, highest curvature (≤ 2 per beam segment)
    pub corner_sharp: PointCloud,
    /// Edge features, high curvature (≤ 20 per beam segment)
    pub corner_less_sharp: PointCloud,
    /// Planar features, lowest curvature (≤ 4 per beam segment)
    pub surf_flat: PointCloud,
    /// Voxel-downsampled bulk of the remaining non-edge points
    pub surf_less_flat: PointCloud,
    /// Start/end attitude and accelerated-motion residual of the sweep
    pub imu_trans: ImuTrans,
}
