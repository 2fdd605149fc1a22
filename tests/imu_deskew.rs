//! IMU integration and motion de-skew against synthetic trajectories.
//!
//! Validates the inertial math without hardware:
//! - constant-acceleration integration over the ring buffer
//! - per-slot consistency of velocity and position
//! - de-skew of an accelerating sweep back to its start frame
//! - no-IMU and stale-IMU fallback policies
//!
//! Run with: `cargo test --test imu_deskew`

use std::f32::consts::TAU;

use approx::assert_relative_eq;
use nalgebra::{UnitQuaternion, Vector3};

use megha_registration::utils::constants::GRAVITY;
use megha_registration::{
    ImuSample, ImuTracker, ImuTrackerConfig, RawPoint, RegistrarConfig, ScanRegistrar,
};

/// Identity-attitude sample whose canonical world acceleration is `acc`.
///
/// With level attitude the gravity-removed canonical components reduce
/// to `accX = ay`, `accY = az − g`, `accZ = ax`.
fn sample_with_world_acc(stamp: f64, acc: Vector3<f32>) -> ImuSample {
    ImuSample::new(
        stamp,
        UnitQuaternion::identity(),
        Vector3::new(acc.z, acc.x, acc.y + GRAVITY),
    )
}

// ============================================================================
// S6: Integration round-trip
// ============================================================================

#[test]
fn test_two_sample_integration_round_trip() {
    let mut tracker = ImuTracker::new(ImuTrackerConfig::default());

    tracker.ingest(&sample_with_world_acc(100.0, Vector3::new(1.0, 0.0, 0.0)));
    tracker.ingest(&sample_with_world_acc(100.01, Vector3::new(1.0, 0.0, 0.0)));

    let state = tracker.state_at(100.01).unwrap();
    assert_relative_eq!(state.velo.x, 0.01, epsilon = 1e-6);
    assert_relative_eq!(state.velo.y, 0.0, epsilon = 1e-6);
    assert_relative_eq!(state.velo.z, 0.0, epsilon = 1e-6);
    assert_relative_eq!(state.shift.x, 5e-5, epsilon = 1e-8);
    assert_relative_eq!(state.shift.y, 0.0, epsilon = 1e-8);
    assert_relative_eq!(state.shift.z, 0.0, epsilon = 1e-8);
}

// ============================================================================
// Per-slot integration consistency
// ============================================================================

#[test]
fn test_slotwise_velocity_and_position_consistency() {
    let mut tracker = ImuTracker::new(ImuTrackerConfig::default());
    let dt = 0.01f64;

    // Varying acceleration profile; track the expected state alongside.
    let mut expected_v = 0.0f32;
    let mut expected_p = 0.0f32;
    let mut prev_state = None;

    for i in 0..50 {
        let a = 0.5 + 0.1 * i as f32;
        let stamp = 10.0 + i as f64 * dt;
        tracker.ingest(&sample_with_world_acc(stamp, Vector3::new(a, 0.0, 0.0)));

        if i > 0 {
            let dtf = dt as f32;
            expected_p += expected_v * dtf + 0.5 * a * dtf * dtf;
            expected_v += a * dtf;
        }

        let state = tracker.state_at(stamp).unwrap();
        assert_relative_eq!(state.velo.x, expected_v, epsilon = 1e-4);
        assert_relative_eq!(state.shift.x, expected_p, epsilon = 1e-4);

        if let Some((prev_v, prev_p)) = prev_state {
            let dtf = dt as f32;
            // v[i] − v[i−1] = a·Δt and p[i] − p[i−1] = v[i−1]·Δt + ½aΔt².
            assert_relative_eq!(state.velo.x - prev_v, a * dtf, epsilon = 1e-5);
            assert_relative_eq!(
                state.shift.x - prev_p,
                prev_v * dtf + 0.5 * a * dtf * dtf,
                epsilon = 1e-5
            );
        }
        prev_state = Some((state.velo.x, state.shift.x));
    }
}

// ============================================================================
// De-skew of an accelerating sweep
// ============================================================================

/// One level ring of points at radius 5, clockwise, all on the top beam.
fn ring_sweep(n: usize) -> Vec<RawPoint> {
    (0..n)
        .map(|i| {
            let theta = -(i as f32) * TAU / n as f32 * 0.98;
            RawPoint::new(5.0 * theta.cos(), 5.0 * theta.sin(), 0.0)
        })
        .collect()
}

#[test]
fn test_deskew_removes_acceleration_residual() {
    let mut registrar = ScanRegistrar::new(RegistrarConfig {
        system_delay: 0,
        ..Default::default()
    });

    // Canonical-frame acceleration along x, starting from rest well
    // before the sweep so the start state is known.
    let a = 10.0f32;
    let imu_start = 50.0;
    for i in 0..40 {
        registrar.handle_imu(&sample_with_world_acc(
            imu_start + i as f64 * 0.01,
            Vector3::new(a, 0.0, 0.0),
        ));
    }

    let sweep_stamp = imu_start + 0.15;
    let points = ring_sweep(360);
    let frame = registrar.handle_sweep(sweep_stamp, &points).unwrap();
    assert_eq!(frame.cloud.len(), points.len());

    // All points share beam 15, so concatenation preserves input order.
    // Each output point should be the raw canonical point displaced by
    // the ½aτ² residual accumulated since the sweep start.
    for (raw, out) in points.iter().zip(frame.cloud.iter()) {
        let tau = out.intensity - 15.0;
        assert!((0.0..=0.15).contains(&tau), "point time {tau} out of range");

        let expected_x = raw.y + 0.5 * a * tau * tau;
        // Linear interpolation of the quadratic shift between 10 ms IMU
        // samples leaves an O(a·dt²/8) error; stay above it.
        assert!(
            (out.x - expected_x).abs() < 1e-3,
            "residual not removed: got {}, expected {expected_x}",
            out.x
        );
        assert_relative_eq!(out.y, raw.z, epsilon = 1e-4);
    }

    // First valid point anchors the frame and is untouched.
    let first = &frame.cloud[0];
    assert_relative_eq!(first.x, points[0].y, epsilon = 1e-6);
    assert_relative_eq!(first.y, points[0].z, epsilon = 1e-6);
    assert_relative_eq!(first.z, points[0].x, epsilon = 1e-6);

    // The summary reports the end-of-sweep residual in the start frame.
    let trans = frame.imu_trans;
    assert!(trans.shift_from_start[0] > 0.0);
    assert_relative_eq!(trans.roll_start, 0.0, epsilon = 1e-6);
}

#[test]
fn test_stationary_imu_leaves_points_untouched() {
    let mut registrar = ScanRegistrar::new(RegistrarConfig {
        system_delay: 0,
        ..Default::default()
    });

    for i in 0..30 {
        registrar.handle_imu(&ImuSample::stationary(20.0 + i as f64 * 0.01, GRAVITY));
    }

    let points = ring_sweep(180);
    let frame = registrar.handle_sweep(20.1, &points).unwrap();

    for (raw, out) in points.iter().zip(frame.cloud.iter()) {
        assert_relative_eq!(out.x, raw.y, epsilon = 1e-5);
        assert_relative_eq!(out.y, raw.z, epsilon = 1e-5);
        assert_relative_eq!(out.z, raw.x, epsilon = 1e-5);
    }
}

// ============================================================================
// Fallback policies
// ============================================================================

#[test]
fn test_no_imu_skips_deskew() {
    let mut registrar = ScanRegistrar::new(RegistrarConfig {
        system_delay: 0,
        ..Default::default()
    });

    let points = ring_sweep(180);
    let frame = registrar.handle_sweep(0.0, &points).unwrap();

    // Raw canonical coordinates, zero transform summary.
    for (raw, out) in points.iter().zip(frame.cloud.iter()) {
        assert_relative_eq!(out.x, raw.y, epsilon = 1e-6);
        assert_relative_eq!(out.z, raw.x, epsilon = 1e-6);
    }
    assert_eq!(frame.imu_trans.shift_from_start, [0.0; 3]);
    assert_eq!(frame.imu_trans.velo_from_start, [0.0; 3]);
}

#[test]
fn test_stale_imu_uses_latest_sample() {
    let mut registrar = ScanRegistrar::new(RegistrarConfig {
        system_delay: 0,
        ..Default::default()
    });

    // IMU history ends long before the sweep; the platform was at rest,
    // so clamping to the newest sample must leave the points unchanged.
    registrar.handle_imu(&ImuSample::stationary(1.0, GRAVITY));
    registrar.handle_imu(&ImuSample::stationary(1.01, GRAVITY));

    let points = ring_sweep(180);
    let frame = registrar.handle_sweep(500.0, &points).unwrap();

    assert_eq!(frame.cloud.len(), points.len());
    for (raw, out) in points.iter().zip(frame.cloud.iter()) {
        assert_relative_eq!(out.x, raw.y, epsilon = 1e-5);
        assert_relative_eq!(out.y, raw.z, epsilon = 1e-5);
        assert_relative_eq!(out.z, raw.x, epsilon = 1e-5);
    }
}

#[test]
fn test_integration_gap_metric_surfaces() {
    let mut registrar = ScanRegistrar::new(RegistrarConfig::default());

    registrar.handle_imu(&ImuSample::stationary(1.0, GRAVITY));
    registrar.handle_imu(&ImuSample::stationary(1.01, GRAVITY));
    assert_eq!(registrar.imu_tracker().frozen_gap_count(), 0);

    // Two long dropouts.
    registrar.handle_imu(&ImuSample::stationary(2.0, GRAVITY));
    registrar.handle_imu(&ImuSample::stationary(3.0, GRAVITY));
    assert_eq!(registrar.imu_tracker().frozen_gap_count(), 2);
}
