//! megha-registration — scan registration front-end of a LOAM-style
//! LiDAR odometry pipeline.
//!
//! Takes raw per-revolution point clouds from a 16-beam spinning LiDAR
//! plus a higher-rate inertial stream, and produces per revolution the
//! full de-skewed cloud, four feature clouds (sharp/less-sharp edges,
//! flat/less-flat planes) and a compact IMU transform summary for the
//! downstream odometry and mapping solvers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │              (node queues, bag replay)              │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  registration/                      │  ← Core pipeline
//! │     (beams, deskew, curvature, features, voxel)     │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Sensor processing
//! │             (imu history + integration)             │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (types, math)                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Processing of one sweep
//!
//! 1. Drop non-finite returns; derive the sweep's start/end azimuth.
//! 2. Permute each point into the canonical frame (z-forward, x-left,
//!    y-up), recover its beam from elevation and its fractional sweep
//!    time from azimuth.
//! 3. De-skew against the IMU history: interpolate the state at the
//!    point's sampling instant and remove the accelerated-motion
//!    residual relative to the sweep's first point.
//! 4. Concatenate beams, compute per-point curvature, mask grazing
//!    surfaces and isolated returns.
//! 5. Pick edge and planar features per beam segment under spatial
//!    spread constraints; voxel-downsample the less-flat bulk.

// Layer 1: Core foundation (no internal deps)
pub mod core;

// Layer 2: Sensor processing (depends on core)
pub mod sensors;

// Layer 3: Registration pipeline (depends on core, sensors)
pub mod registration;

// Layer 4: I/O infrastructure (depends on all layers)
pub mod io;

pub mod error;
pub mod utils;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

pub use crate::core::math;
pub use crate::core::types::{
    ImuSample, ImuTrans, PointCloud, RawPoint, RegistrationFrame, SweepPoint,
};

pub use sensors::{ImuState, ImuTracker, ImuTrackerConfig};

pub use registration::{
    AzimuthUnwrapper, Deskewer, FeatureScratch, RegistrarConfig, RejectionThresholds,
    ScanRegistrar, SelectionConfig, SweepBounds, SweepFeatures, VoxelGridConfig, VoxelGridFilter,
};

pub use io::{BagMessage, BagPlayer, BagRecorder, RegistrationNode, SweepMessage};

pub use error::{MeghaError, Result};
