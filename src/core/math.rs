//! Rotation and angle primitives for the canonical sensor frame.
//!
//! The pipeline works in a right-handed frame with z forward, x left and
//! y up, obtained from the LiDAR-native frame by the axis permutation
//! `(x', y', z') = (y, z, x)`. In this frame the composed body orientation
//! is `R = R_y(yaw) · R_x(pitch) · R_z(roll)` — the Euler triple carried
//! around the pipeline denotes exactly that product, not the usual
//! aerospace convention. The helpers below apply that product and its
//! inverse axis by axis.

use std::f32::consts::PI;

use nalgebra::{UnitQuaternion, Vector3};

/// Rotate a canonical-frame vector from the body frame into the world
/// frame: `R_y(yaw) · R_x(pitch) · R_z(roll) · v`.
#[inline]
pub fn rotate_to_world(v: Vector3<f32>, roll: f32, pitch: f32, yaw: f32) -> Vector3<f32> {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    // R_z(roll)
    let x1 = cr * v.x - sr * v.y;
    let y1 = sr * v.x + cr * v.y;
    let z1 = v.z;

    // R_x(pitch)
    let x2 = x1;
    let y2 = cp * y1 - sp * z1;
    let z2 = sp * y1 + cp * z1;

    // R_y(yaw)
    Vector3::new(cy * x2 + sy * z2, y2, -sy * x2 + cy * z2)
}

/// Rotate a world-frame vector into the body frame:
/// `R_z(roll)⁻¹ · R_x(pitch)⁻¹ · R_y(yaw)⁻¹ · v`.
#[inline]
pub fn rotate_to_local(v: Vector3<f32>, roll: f32, pitch: f32, yaw: f32) -> Vector3<f32> {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    // R_y(yaw)⁻¹
    let x1 = cy * v.x - sy * v.z;
    let y1 = v.y;
    let z1 = sy * v.x + cy * v.z;

    // R_x(pitch)⁻¹
    let x2 = x1;
    let y2 = cp * y1 + sp * z1;
    let z2 = -sp * y1 + cp * z1;

    // R_z(roll)⁻¹
    Vector3::new(cr * x2 + sr * y2, -sr * x2 + cr * y2, z2)
}

/// Decompose an IMU orientation quaternion into roll/pitch/yaw about the
/// fixed X, Y, Z axes of the IMU-native frame, such that
/// `R = R_z(yaw) · R_y(pitch) · R_x(roll)`.
#[inline]
pub fn quat_to_rpy(q: &UnitQuaternion<f32>) -> (f32, f32, f32) {
    q.euler_angles()
}

/// Interpolate between two angles sampled close together in time,
/// unwrapping the back sample by ±2π when the jump exceeds π.
///
/// `ratio_front` is the blend weight of `front`; `back` receives
/// `1 − ratio_front`. Unlike a shortest-path slerp this reproduces the
/// raw linear blend used throughout the de-skew math, so the result can
/// land outside `[-π, π]` near the wrap.
///
/// # Example
/// ```
/// use megha_registration::math::lerp_angle_unwrapped;
/// use std::f32::consts::PI;
///
/// // Midway across the heading wrap the blend stays at the boundary.
/// let mid = lerp_angle_unwrapped(PI - 0.1, -PI + 0.1, 0.5);
/// assert!((mid.abs() - PI).abs() < 1e-6);
/// ```
#[inline]
pub fn lerp_angle_unwrapped(back: f32, front: f32, ratio_front: f32) -> f32 {
    let back = if front - back > PI {
        back + 2.0 * PI
    } else if front - back < -PI {
        back - 2.0 * PI
    } else {
        back
    };
    front * ratio_front + back * (1.0 - ratio_front)
}
