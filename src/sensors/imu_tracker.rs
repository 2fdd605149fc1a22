//! IMU history and dead-reckoning integration.
//!
//! Consumes orientation + specific-force samples, removes gravity,
//! rotates acceleration into a fixed world frame and integrates velocity
//! and position into a bounded ring of recent states. The sweep
//! processor queries this history to recover the sensor's kinematic
//! state at arbitrary instants inside a sweep.
//!
//! Integration assumes the platform starts near rest and that samples
//! arrive faster than the sweep rate. Across a gap of a full sweep
//! period or more the integrator carries the previous velocity and
//! position through unchanged and counts the gap, since accelerating
//! blindly across missing samples would corrupt the whole history.

use nalgebra::Vector3;

use crate::core::math::{lerp_angle_unwrapped, quat_to_rpy, rotate_to_world};
use crate::core::types::ImuSample;
use crate::utils::constants::{GRAVITY, IMU_QUEUE_LENGTH, SCAN_PERIOD};

/// Configuration for the IMU tracker.
#[derive(Debug, Clone, Copy)]
pub struct ImuTrackerConfig {
    /// Ring capacity in samples
    pub queue_length: usize,
    /// Inter-sample gap at which integration pauses, seconds
    pub max_integration_gap: f64,
    /// Local gravity magnitude, m/s²
    pub gravity: f32,
}

impl Default for ImuTrackerConfig {
    fn default() -> Self {
        Self {
            queue_length: IMU_QUEUE_LENGTH,
            max_integration_gap: SCAN_PERIOD,
            gravity: GRAVITY,
        }
    }
}

/// One slot of the history ring.
#[derive(Debug, Clone, Copy)]
struct ImuSlot {
    time: f64,
    roll: f32,
    pitch: f32,
    yaw: f32,
    velo: Vector3<f32>,
    shift: Vector3<f32>,
}

impl ImuSlot {
    fn zeroed() -> Self {
        Self {
            time: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            velo: Vector3::zeros(),
            shift: Vector3::zeros(),
        }
    }
}

/// Kinematic state interpolated from the IMU history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuState {
    /// Attitude, canonical-frame rpy
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    /// World-frame velocity, m/s
    pub velo: Vector3<f32>,
    /// World-frame position, m
    pub shift: Vector3<f32>,
}

/// Bounded IMU history with constant-acceleration dead reckoning.
///
/// Two cursors index the ring: `last` points at the most recent sample,
/// `front` is a search hint advanced monotonically by [`state_at`]
/// queries (sweep queries arrive in time order, so the hint persists
/// across points and across sweeps).
///
/// [`state_at`]: ImuTracker::state_at
#[derive(Debug)]
pub struct ImuTracker {
    config: ImuTrackerConfig,
    slots: Vec<ImuSlot>,
    last: Option<usize>,
    front: usize,
    frozen_gaps: u64,
}

impl ImuTracker {
    /// Create an empty tracker.
    pub fn new(config: ImuTrackerConfig) -> Self {
        Self {
            slots: vec![ImuSlot::zeroed(); config.queue_length.max(2)],
            config,
            last: None,
            front: 0,
            frozen_gaps: 0,
        }
    }

    /// True once at least one sample has been ingested.
    #[inline]
    pub fn has_samples(&self) -> bool {
        self.last.is_some()
    }

    /// Number of samples across which integration was paused because the
    /// inter-sample gap reached a full sweep period.
    #[inline]
    pub fn frozen_gap_count(&self) -> u64 {
        self.frozen_gaps
    }

    /// Timestamp of the newest sample, if any.
    pub fn latest_time(&self) -> Option<f64> {
        self.last.map(|i| self.slots[i].time)
    }

    /// Ingest one sample: remove gravity, rotate the acceleration into
    /// the world frame and extend the velocity/position integration.
    pub fn ingest(&mut self, sample: &ImuSample) {
        let (roll, pitch, yaw) = quat_to_rpy(&sample.orientation);
        let a = sample.linear_acceleration;
        let g = self.config.gravity;

        // Gravity removal fused with the native→canonical axis
        // permutation: (x', y', z') = (y, z, x).
        let acc_body = Vector3::new(
            a.y - roll.sin() * pitch.cos() * g,
            a.z - roll.cos() * pitch.cos() * g,
            a.x + pitch.sin() * g,
        );
        let acc_world = rotate_to_world(acc_body, roll, pitch, yaw);

        let len = self.slots.len();
        let (next, integrated) = match self.last {
            Some(prev_idx) => {
                let prev = self.slots[prev_idx];
                let dt = sample.stamp - prev.time;
                if dt < self.config.max_integration_gap {
                    let dtf = dt as f32;
                    (
                        (prev_idx + 1) % len,
                        (
                            prev.velo + acc_world * dtf,
                            prev.shift + prev.velo * dtf + acc_world * (0.5 * dtf * dtf),
                        ),
                    )
                } else {
                    self.frozen_gaps += 1;
                    log::debug!(
                        "imu gap of {:.3}s reached the sweep period; integration paused",
                        dt
                    );
                    ((prev_idx + 1) % len, (prev.velo, prev.shift))
                }
            }
            None => (0, (Vector3::zeros(), Vector3::zeros())),
        };

        self.slots[next] = ImuSlot {
            time: sample.stamp,
            roll,
            pitch,
            yaw,
            velo: integrated.0,
            shift: integrated.1,
        };
        self.last = Some(next);
    }

    /// Kinematic state at `query_time`, linearly interpolated between
    /// the two samples straddling it.
    ///
    /// Advances the `front` hint forward (wrapping once) until it passes
    /// the query time. When the newest sample still predates the query
    /// the newest state is returned as-is — no extrapolation. Returns
    /// `None` until the first sample arrives.
    pub fn state_at(&mut self, query_time: f64) -> Option<ImuState> {
        let last = self.last?;
        let len = self.slots.len();

        while self.front != last {
            if query_time < self.slots[self.front].time {
                break;
            }
            self.front = (self.front + 1) % len;
        }

        let front = self.slots[self.front];
        if query_time > front.time {
            // History exhausted: the sweep is newer than the newest IMU
            // sample, so clamp to it.
            return Some(ImuState {
                roll: front.roll,
                pitch: front.pitch,
                yaw: front.yaw,
                velo: front.velo,
                shift: front.shift,
            });
        }

        let back = self.slots[(self.front + len - 1) % len];
        let span = front.time - back.time;
        if span <= 0.0 {
            return Some(ImuState {
                roll: front.roll,
                pitch: front.pitch,
                yaw: front.yaw,
                velo: front.velo,
                shift: front.shift,
            });
        }

        let ratio_front = ((query_time - back.time) / span) as f32;
        let ratio_back = 1.0 - ratio_front;

        Some(ImuState {
            roll: front.roll * ratio_front + back.roll * ratio_back,
            pitch: front.pitch * ratio_front + back.pitch * ratio_back,
            yaw: lerp_angle_unwrapped(back.yaw, front.yaw, ratio_front),
            velo: front.velo * ratio_front + back.velo * ratio_back,
            shift: front.shift * ratio_front + back.shift * ratio_back,
        })
    }
}

impl Default for ImuTracker {
    fn default() -> Self {
        Self::new(ImuTrackerConfig::default())
    }
}
