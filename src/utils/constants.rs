//! Sensor and pipeline constants for a 16-beam spinning LiDAR.
//!
//! Centralizes the tunables of the registration front-end so the
//! registrar, the node and the tests agree on one set of numbers.
//!
//! # Device assumptions
//!
//! The constants below describe a VLP-16-class device: 16 vertical beams
//! spaced 2° apart covering ±15°, rotating in the horizontal plane at
//! 10 Hz. The IMU is expected to arrive at 100 Hz or faster; integration
//! is paused across gaps of a full sweep period or more.

/// Duration of one full LiDAR revolution in seconds (10 Hz rotation).
pub const SCAN_PERIOD: f64 = 0.1;

/// Number of vertical beams on the device.
pub const N_SCANS: usize = 16;

/// Number of initial sweeps dropped while the sensor stack settles.
pub const SYSTEM_DELAY: u32 = 20;

/// Capacity of the IMU history ring buffer.
///
/// At 100 Hz this holds two seconds of samples, comfortably covering the
/// 0.1 s window a single sweep can query.
pub const IMU_QUEUE_LENGTH: usize = 200;

/// Hard cap on per-sweep scratch growth (points per revolution).
pub const MAX_SWEEP_POINTS: usize = 40_000;

/// Curvature above which a point qualifies as an edge candidate, and
/// below which it qualifies as a planar candidate.
pub const CURVATURE_THRESHOLD: f32 = 0.1;

/// Squared-distance threshold that ends the neighbor-masking walk around
/// a picked feature.
pub const CLUSTER_SPREAD_SQ: f32 = 0.05;

/// Relative squared-distance threshold for isolated-point rejection.
pub const OUTLIER_RATIO: f32 = 2e-4;

/// Side-length ratio below which a depth step is treated as a grazing
/// surface nearly parallel to the beam.
pub const OCCLUSION_RATIO: f32 = 0.1;

/// Squared gap between consecutive points that triggers the occlusion
/// check.
pub const OCCLUSION_GAP_SQ: f32 = 0.1;

/// Leaf size of the voxel grid applied to the less-flat bulk, in meters.
pub const VOXEL_LEAF_SIZE: f32 = 0.2;

/// Standard gravity in m/s².
pub const GRAVITY: f32 = 9.81;

/// Frame identifier stamped on every published artifact.
pub const CAMERA_FRAME_ID: &str = "camera";

/// Transport queue depth for sweep messages.
pub const CLOUD_QUEUE_DEPTH: usize = 2;

/// Transport queue depth for IMU messages.
pub const IMU_QUEUE_DEPTH: usize = 50;
