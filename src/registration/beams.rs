//! Beam demultiplexing and sweep-angle recovery.
//!
//! The device delivers one unordered cloud per revolution. Each point's
//! originating beam is recovered from its elevation angle (beams sit 2°
//! apart across ±15°), and its fractional time within the sweep from its
//! azimuth relative to the sweep's start and end orientations.

use std::f32::consts::PI;

use crate::core::types::{RawPoint, SweepPoint};

/// Recover the beam index of a canonical-frame point from its elevation.
///
/// Elevation is rounded to the nearest degree by biasing with ±0.5 and
/// truncating. Positive rounded angles map directly to the beam index;
/// zero and negative angles map to `r + (n_scans − 1)`, which places the
/// 0° boundary ray on the top beam. Returns `None` for points outside
/// the device's vertical field of view.
#[inline]
pub fn beam_index(point: &SweepPoint, n_scans: usize) -> Option<usize> {
    let elevation =
        (point.y / (point.x * point.x + point.z * point.z).sqrt()).atan() * 180.0 / PI;
    let rounded = (elevation + if elevation < 0.0 { -0.5 } else { 0.5 }) as i32;

    let scan_id = if rounded > 0 {
        rounded
    } else {
        rounded + n_scans as i32 - 1
    };

    if (0..n_scans as i32).contains(&scan_id) {
        Some(scan_id as usize)
    } else {
        None
    }
}

/// Azimuth anchors of one sweep.
///
/// Orientations are negated atan2 angles because the device rotates
/// clockwise. The end anchor carries an extra 2π so the span of a full
/// revolution is positive; the span is then normalized into `(π, 3π)`
/// since a sweep need not cover exactly one revolution.
#[derive(Debug, Clone, Copy)]
pub struct SweepBounds {
    /// Azimuth of the sweep's first point
    pub start_ori: f32,
    /// Azimuth of the sweep's last point, unwrapped past the start
    pub end_ori: f32,
}

impl SweepBounds {
    /// Derive the anchors from the first and last point of the raw cloud.
    pub fn from_endpoints(first: &RawPoint, last: &RawPoint) -> Self {
        let start_ori = -first.y.atan2(first.x);
        let mut end_ori = -last.y.atan2(last.x) + 2.0 * PI;

        if end_ori - start_ori > 3.0 * PI {
            end_ori -= 2.0 * PI;
        } else if end_ori - start_ori < PI {
            end_ori += 2.0 * PI;
        }

        Self { start_ori, end_ori }
    }

    /// Angular span of the sweep.
    #[inline]
    pub fn span(&self) -> f32 {
        self.end_ori - self.start_ori
    }
}

/// Unwraps per-point azimuths into the continuous `[start, end]` range
/// of a sweep.
///
/// Until the sweep passes its halfway mark, azimuths are clamped near
/// the start anchor; afterwards near the end anchor. The flag flips once
/// an azimuth exceeds the start by more than π and stays set for the
/// rest of the sweep.
#[derive(Debug, Default)]
pub struct AzimuthUnwrapper {
    half_passed: bool,
}

impl AzimuthUnwrapper {
    /// Create an unwrapper for a new sweep.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unwrap one azimuth sample.
    pub fn unwrap(&mut self, ori: f32, bounds: &SweepBounds) -> f32 {
        let mut ori = ori;
        if !self.half_passed {
            // Keep ori within [start − π/2, start + 3π/2].
            if ori < bounds.start_ori - PI / 2.0 {
                ori += 2.0 * PI;
            } else if ori > bounds.start_ori + PI * 3.0 / 2.0 {
                ori -= 2.0 * PI;
            }

            if ori - bounds.start_ori > PI {
                self.half_passed = true;
            }
        } else {
            ori += 2.0 * PI;

            // Keep ori within [end − 3π/2, end + π/2].
            if ori < bounds.end_ori - PI * 3.0 / 2.0 {
                ori += 2.0 * PI;
            } else if ori > bounds.end_ori + PI / 2.0 {
                ori -= 2.0 * PI;
            }
        }
        ori
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SweepPoint;
    use approx::assert_relative_eq;

    fn canonical(x: f32, y: f32, z: f32) -> SweepPoint {
        SweepPoint::new(x, y, z, 0.0)
    }

    #[test]
    fn test_beam_from_elevation() {
        // Level ray → rounded 0 → top beam via the r + 15 branch.
        assert_eq!(beam_index(&canonical(0.0, 0.0, 1.0), 16), Some(15));

        // +2° elevation → beam 2.
        let up2 = canonical(0.0, (2.0f32).to_radians().sin(), (2.0f32).to_radians().cos());
        assert_eq!(beam_index(&up2, 16), Some(2));

        // −2° elevation → −2 + 15 = beam 13.
        let down2 = canonical(0.0, -(2.0f32).to_radians().sin(), (2.0f32).to_radians().cos());
        assert_eq!(beam_index(&down2, 16), Some(13));
    }

    #[test]
    fn test_beam_out_of_range() {
        // +20° is above the device's field of view.
        let steep = canonical(
            0.0,
            (20.0f32).to_radians().sin(),
            (20.0f32).to_radians().cos(),
        );
        assert_eq!(beam_index(&steep, 16), None);

        // −20° rounds to −20 → −5 after the offset, also rejected.
        let plunge = canonical(
            0.0,
            -(20.0f32).to_radians().sin(),
            (20.0f32).to_radians().cos(),
        );
        assert_eq!(beam_index(&plunge, 16), None);
    }

    #[test]
    fn test_sweep_bounds_full_revolution() {
        // First point straight ahead, last point just shy of a full turn.
        let first = RawPoint::new(1.0, 0.0, 0.0);
        let last = RawPoint::new(1.0, 0.01, 0.0);
        let bounds = SweepBounds::from_endpoints(&first, &last);

        assert!(bounds.span() > PI);
        assert!(bounds.span() < 3.0 * PI);
        assert_relative_eq!(bounds.span(), 2.0 * PI, epsilon = 0.02);
    }

    #[test]
    fn test_unwrap_monotonic_over_revolution() {
        let first = RawPoint::new(1.0, 0.0, 0.0);
        let last = RawPoint::new(1.0, 0.01, 0.0);
        let bounds = SweepBounds::from_endpoints(&first, &last);
        let mut unwrapper = AzimuthUnwrapper::new();

        // Clockwise revolution sampled every degree: unwrapped azimuths
        // must be non-decreasing and land on the end anchor.
        let mut prev = bounds.start_ori;
        for i in 0..360 {
            let angle = -(i as f32).to_radians();
            let (x, y) = (angle.cos(), angle.sin());
            // Canonical azimuth of the native point (x, y): −atan2(y, x).
            let ori = unwrapper.unwrap(-y.atan2(x), &bounds);
            assert!(
                ori >= prev - 1e-4,
                "azimuth regressed at step {i}: {ori} < {prev}"
            );
            prev = ori;
        }
        assert!(prev <= bounds.end_ori + 0.1);
    }
}
