//! Inertial measurement types.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// One inertial sample as delivered by the transport.
///
/// Orientation is an absolute attitude quaternion in the IMU-native frame
/// (x-forward, y-left, z-up); linear acceleration is specific force in
/// the same frame, gravity still included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    /// Wall-clock timestamp in seconds
    pub stamp: f64,
    /// Absolute orientation in the IMU-native frame
    pub orientation: UnitQuaternion<f32>,
    /// Specific force in the IMU-native frame, m/s² (gravity included)
    pub linear_acceleration: Vector3<f32>,
}

impl ImuSample {
    /// Create a new sample.
    pub fn new(
        stamp: f64,
        orientation: UnitQuaternion<f32>,
        linear_acceleration: Vector3<f32>,
    ) -> Self {
        Self {
            stamp,
            orientation,
            linear_acceleration,
        }
    }

    /// A level, weightless sample — useful for tests and synthetic data.
    pub fn stationary(stamp: f64, gravity: f32) -> Self {
        Self {
            stamp,
            orientation: UnitQuaternion::identity(),
            linear_acceleration: Vector3::new(0.0, 0.0, gravity),
        }
    }
}

/// Compact IMU transform summary published alongside each sweep.
///
/// Captures the sweep's start and end attitude plus the motion of the
/// end relative to the start, expressed in the start frame. Downstream
/// odometry consumes this to undo the constant-velocity assumption of
/// its own de-skew.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImuTrans {
    /// Attitude at the sweep's first point (canonical-frame rpy)
    pub roll_start: f32,
    pub pitch_start: f32,
    pub yaw_start: f32,
    /// Attitude at the sweep's last point (canonical-frame rpy)
    pub roll_cur: f32,
    pub pitch_cur: f32,
    pub yaw_cur: f32,
    /// Accumulated shift of the last point relative to the start, in the
    /// start frame (accelerated-motion residual)
    pub shift_from_start: [f32; 3],
    /// Velocity change of the last point relative to the start, in the
    /// start frame
    pub velo_from_start: [f32; 3],
}

impl ImuTrans {
    /// Encode as the 4-point wire payload consumed downstream.
    ///
    /// Row order: `(pitchS, yawS, rollS)`, `(pitchCur, yawCur, rollCur)`,
    /// shift, velocity change.
    pub fn to_point_rows(&self) -> [[f32; 3]; 4] {
        [
            [self.pitch_start, self.yaw_start, self.roll_start],
            [self.pitch_cur, self.yaw_cur, self.roll_cur],
            self.shift_from_start,
            self.velo_from_start,
        ]
    }
}
