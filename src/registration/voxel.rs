//! Uniform voxel-grid downsampling.
//!
//! The less-flat bulk of a sweep holds thousands of points per beam —
//! far more than the downstream solver can digest. Points are binned
//! into axis-aligned cubic cells and each occupied cell is replaced by
//! the centroid of its members, preserving surface shape while bounding
//! the count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{PointCloud, SweepPoint};
use crate::utils::constants::VOXEL_LEAF_SIZE;

/// Configuration for the voxel grid filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoxelGridConfig {
    /// Cell edge length in meters
    pub leaf_size: f32,
}

impl Default for VoxelGridConfig {
    fn default() -> Self {
        Self {
            leaf_size: VOXEL_LEAF_SIZE,
        }
    }
}

/// Centroid-per-cell downsampling filter.
pub struct VoxelGridFilter {
    config: VoxelGridConfig,
}

#[derive(Default)]
struct CellAccumulator {
    x: f64,
    y: f64,
    z: f64,
    intensity: f64,
    count: u32,
}

impl VoxelGridFilter {
    /// Create a filter with the given configuration.
    pub fn new(config: VoxelGridConfig) -> Self {
        Self { config }
    }

    /// Downsample a cloud to one centroid per occupied cell.
    ///
    /// Output order follows the lexicographic cell index, so equal
    /// inputs always produce equal outputs. A non-positive leaf size
    /// passes the cloud through unchanged.
    pub fn apply(&self, cloud: &PointCloud) -> PointCloud {
        let leaf = self.config.leaf_size;
        if leaf <= 0.0 {
            return cloud.clone();
        }

        let inv_leaf = 1.0 / leaf;
        let mut cells: BTreeMap<(i32, i32, i32), CellAccumulator> = BTreeMap::new();

        for p in cloud.iter() {
            let key = (
                (p.x * inv_leaf).floor() as i32,
                (p.y * inv_leaf).floor() as i32,
                (p.z * inv_leaf).floor() as i32,
            );
            let cell = cells.entry(key).or_default();
            cell.x += p.x as f64;
            cell.y += p.y as f64;
            cell.z += p.z as f64;
            cell.intensity += p.intensity as f64;
            cell.count += 1;
        }

        let mut out = PointCloud::with_capacity(cells.len());
        for cell in cells.values() {
            let inv_n = 1.0 / cell.count as f64;
            out.push(SweepPoint::new(
                (cell.x * inv_n) as f32,
                (cell.y * inv_n) as f32,
                (cell.z * inv_n) as f32,
                (cell.intensity * inv_n) as f32,
            ));
        }
        out
    }
}

impl Default for VoxelGridFilter {
    fn default() -> Self {
        Self::new(VoxelGridConfig::default())
    }
}
