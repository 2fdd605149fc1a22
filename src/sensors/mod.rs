//! Sensor processing: IMU history and integration.

pub mod imu_tracker;

pub use imu_tracker::{ImuState, ImuTracker, ImuTrackerConfig};
