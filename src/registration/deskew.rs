//! Per-point motion de-skew.
//!
//! Points inside one sweep are sampled while the sensor moves, so each
//! sits in a slightly different body frame. Using the IMU-integrated
//! state at every point's sampling instant, the points are re-expressed
//! in the frame of the sweep's first point: rotate through the world
//! frame and add the accelerated-motion shift accumulated since the
//! start. The constant-velocity component of the motion is deliberately
//! left in — the downstream odometry solver models it — only the
//! acceleration residual is removed here.

use nalgebra::Vector3;

use crate::core::math::{rotate_to_local, rotate_to_world};
use crate::core::types::{ImuTrans, SweepPoint};
use crate::sensors::ImuState;

/// De-skews the points of one sweep against its start state.
///
/// Created from the IMU state at the sweep's first valid point, which
/// defines the reference frame and is itself left untouched.
#[derive(Debug, Clone)]
pub struct Deskewer {
    start: ImuState,
    cur: ImuState,
    shift_from_start: Vector3<f32>,
    velo_from_start: Vector3<f32>,
}

impl Deskewer {
    /// Anchor a new sweep at the state of its first valid point.
    pub fn begin(start: ImuState) -> Self {
        Self {
            start,
            cur: start,
            shift_from_start: Vector3::zeros(),
            velo_from_start: Vector3::zeros(),
        }
    }

    /// De-skew one point in place.
    ///
    /// `cur` is the interpolated IMU state at the point's sampling
    /// instant and `point_time` its offset from the start of the sweep
    /// in seconds.
    pub fn apply(&mut self, cur: ImuState, point_time: f32, point: &mut SweepPoint) {
        self.cur = cur;
        self.shift_to_start(point_time);
        self.velo_to_start();
        self.transform_to_start(point);
    }

    /// Accumulated shift of the current point relative to the start,
    /// with the start velocity's linear contribution removed, rotated
    /// into the start frame.
    fn shift_to_start(&mut self, point_time: f32) {
        let delta =
            self.cur.shift - self.start.shift - self.start.velo * point_time;
        self.shift_from_start =
            rotate_to_local(delta, self.start.roll, self.start.pitch, self.start.yaw);
    }

    /// Velocity change relative to the start, rotated into the start
    /// frame.
    fn velo_to_start(&mut self) {
        let delta = self.cur.velo - self.start.velo;
        self.velo_from_start =
            rotate_to_local(delta, self.start.roll, self.start.pitch, self.start.yaw);
    }

    /// Rotate the point from its own body frame into the start frame
    /// (via the world frame) and add the accumulated shift.
    fn transform_to_start(&self, point: &mut SweepPoint) {
        let body = Vector3::new(point.x, point.y, point.z);
        let world = rotate_to_world(body, self.cur.roll, self.cur.pitch, self.cur.yaw);
        let local =
            rotate_to_local(world, self.start.roll, self.start.pitch, self.start.yaw);

        point.x = local.x + self.shift_from_start.x;
        point.y = local.y + self.shift_from_start.y;
        point.z = local.z + self.shift_from_start.z;
    }

    /// Summarize the sweep's motion for the downstream solver.
    ///
    /// `cur` holds the state of the last point handed to [`apply`], so
    /// calling this after the sweep loop captures end-of-sweep values.
    ///
    /// [`apply`]: Deskewer::apply
    pub fn imu_trans(&self) -> ImuTrans {
        ImuTrans {
            roll_start: self.start.roll,
            pitch_start: self.start.pitch,
            yaw_start: self.start.yaw,
            roll_cur: self.cur.roll,
            pitch_cur: self.cur.pitch,
            yaw_cur: self.cur.yaw,
            shift_from_start: self.shift_from_start.into(),
            velo_from_start: self.velo_from_start.into(),
        }
    }
}
