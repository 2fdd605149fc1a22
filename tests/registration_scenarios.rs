//! End-to-end sweep registration scenarios.
//!
//! Synthetic clouds exercise the full pipeline without hardware:
//! - planar wall: all-flat features, exact per-segment pick counts
//! - rectangular room: corners found at wall junctions
//! - beam demultiplexing from elevation alone
//! - occlusion masking around depth steps
//! - warm-up frame dropping
//!
//! Run with: `cargo test --test registration_scenarios`

use std::f32::consts::TAU;

use megha_registration::registration::curvature::{
    FeatureScratch, RejectionThresholds, mark_unreliable,
};
use megha_registration::{
    PointCloud, RawPoint, RegistrarConfig, RegistrationFrame, ScanRegistrar, SweepPoint,
};

// ============================================================================
// Synthetic Clouds
// ============================================================================

/// Beam elevations of the simulated device, degrees.
fn beam_elevations() -> Vec<f32> {
    (0..16).map(|k| (-15 + 2 * k) as f32).collect()
}

/// A flat wall at native x = 5, sampled by all beams over a ±45°
/// azimuth fan, azimuth-major (device firing order), clockwise.
fn wall_sweep(points_per_beam: usize) -> Vec<RawPoint> {
    let elevations = beam_elevations();
    let mut points = Vec::with_capacity(points_per_beam * elevations.len());

    for i in 0..points_per_beam {
        // Clockwise: azimuth runs from +45° down to −45°.
        let azimuth = TAU / 8.0 - (i as f32 / (points_per_beam - 1) as f32) * TAU / 4.0;
        let y = 5.0 * azimuth.tan();
        let horizontal = (25.0f32 + y * y).sqrt();
        for &elevation in &elevations {
            points.push(RawPoint::new(5.0, y, horizontal * elevation.to_radians().tan()));
        }
    }
    points
}

/// A full revolution inside a rectangular room (half-widths 5 m × 4 m),
/// azimuth-major, clockwise.
fn room_sweep(azimuth_steps: usize) -> Vec<RawPoint> {
    let elevations = beam_elevations();
    let mut points = Vec::with_capacity(azimuth_steps * elevations.len());

    for step in 0..azimuth_steps {
        let theta = -(step as f32) * TAU / azimuth_steps as f32;
        let (sin_t, cos_t) = theta.sin_cos();
        let mut range = f32::INFINITY;
        if cos_t.abs() > 1e-6 {
            range = range.min(5.0 / cos_t.abs());
        }
        if sin_t.abs() > 1e-6 {
            range = range.min(4.0 / sin_t.abs());
        }
        let horizontal = range;
        for &elevation in &elevations {
            points.push(RawPoint::new(
                horizontal * cos_t,
                horizontal * sin_t,
                horizontal * elevation.to_radians().tan(),
            ));
        }
    }
    points
}

fn warmed_registrar() -> ScanRegistrar {
    ScanRegistrar::new(RegistrarConfig {
        system_delay: 0,
        ..Default::default()
    })
}

fn process(points: &[RawPoint]) -> RegistrationFrame {
    warmed_registrar()
        .handle_sweep(0.0, points)
        .expect("warmed registrar must emit a frame")
}

// ============================================================================
// S1: Static wall, no IMU
// ============================================================================

#[test]
fn test_wall_every_point_survives() {
    let points = wall_sweep(1800);
    let frame = process(&points);
    assert_eq!(frame.cloud.len(), points.len());
}

#[test]
fn test_wall_exact_flat_pick_count() {
    let frame = process(&wall_sweep(1800));
    // 4 planar picks × 6 segments × 16 beams.
    assert_eq!(frame.surf_flat.len(), 4 * 6 * 16);
}

#[test]
fn test_wall_no_corners() {
    let frame = process(&wall_sweep(1800));
    assert!(
        frame.corner_sharp.is_empty(),
        "a plane has no edges, got {} corner picks",
        frame.corner_sharp.len()
    );
}

#[test]
fn test_wall_deskew_bypassed_without_imu() {
    let points = wall_sweep(200);
    let frame = process(&points);

    // Without IMU history every output point is the raw canonical
    // permutation of some input point.
    let p = &frame.cloud[0];
    assert!(
        points
            .iter()
            .any(|r| (r.y - p.x).abs() < 1e-6 && (r.z - p.y).abs() < 1e-6 && (r.x - p.z).abs() < 1e-6),
        "output point does not match any raw input point"
    );

    let zeros = frame.imu_trans.to_point_rows();
    assert!(zeros.iter().all(|row| row.iter().all(|&v| v == 0.0)));
}

// ============================================================================
// S2: Beam demultiplexing
// ============================================================================

#[test]
fn test_beam_demultiplex_from_elevation() {
    let mut registrar = warmed_registrar();
    let deg2 = 2.0f32.to_radians();
    let points = vec![
        RawPoint::new(1.0, 0.0, 0.0),
        RawPoint::new(deg2.cos(), 0.0, deg2.sin()),
        RawPoint::new(deg2.cos(), 0.0, -deg2.sin()),
    ];

    let frame = registrar.handle_sweep(0.0, &points).unwrap();
    let beams: Vec<usize> = frame.cloud.iter().map(SweepPoint::beam).collect();

    // Beams come back in concatenation order (ascending beam index):
    // +2° → beam 2, −2° → beam 13, 0° → beam 15 (the 0° boundary ray
    // belongs to the top beam).
    assert_eq!(beams, vec![2, 13, 15]);
}

// ============================================================================
// S3: Occlusion rejection
// ============================================================================

#[test]
fn test_occlusion_masks_preceding_points() {
    // A far surface followed by a near one along almost the same ray:
    // the far points would vanish behind the near surface from a
    // slightly different viewpoint, so the step and the five points
    // before it are masked.
    let mut cloud = PointCloud::new();
    for i in 0..12 {
        cloud.push(SweepPoint::new(1.1 + 0.01 * i as f32, 0.0, 10.0, 0.0));
    }
    for i in 0..12 {
        cloud.push(SweepPoint::new(0.55 + 0.01 * i as f32, 0.0, 5.0, 0.0));
    }

    let mut scratch = FeatureScratch::new();
    scratch.reset(cloud.len());
    mark_unreliable(
        &cloud,
        &mut scratch,
        &RejectionThresholds {
            occlusion_gap_sq: 0.1,
            occlusion_ratio: 0.1,
            outlier_ratio: 2e-4,
        },
    );

    // The step sits between indices 11 and 12; the far side i−5..=i is
    // masked.
    for i in 6..=11 {
        assert!(scratch.neighbor_picked[i], "index {i} should be masked");
    }
    assert!(!scratch.neighbor_picked[5]);
    // Indices never exceed the cloud bounds.
    assert_eq!(scratch.neighbor_picked.len(), cloud.len());
}

// ============================================================================
// S4/S5: Curvature on lines and corners
// ============================================================================

#[test]
fn test_room_corners_found_at_wall_junctions() {
    let frame = process(&room_sweep(1800));

    assert!(
        !frame.corner_sharp.is_empty(),
        "a rectangular room must yield corner features"
    );

    // Every sharp corner pick must sit near a junction of two walls:
    // in native coordinates that is |x| ≈ 5 and |y| ≈ 4 simultaneously.
    // Canonical → native: x_n = z_c, y_n = x_c.
    for p in frame.corner_sharp.iter() {
        let (x_native, y_native) = (p.z, p.x);
        assert!(
            (x_native.abs() - 5.0).abs() < 0.3 && (y_native.abs() - 4.0).abs() < 0.3,
            "corner pick at native ({x_native:.2}, {y_native:.2}) is not on a room corner"
        );
    }
}

#[test]
fn test_room_flat_picks_on_walls() {
    let frame = process(&room_sweep(1800));

    assert!(!frame.surf_flat.is_empty());
    for p in frame.surf_flat.iter() {
        let (x_native, y_native) = (p.z, p.x);
        let on_x_wall = (x_native.abs() - 5.0).abs() < 0.05;
        let on_y_wall = (y_native.abs() - 4.0).abs() < 0.05;
        assert!(
            on_x_wall || on_y_wall,
            "flat pick at native ({x_native:.2}, {y_native:.2}) is not on a wall"
        );
    }
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_intensity_encodes_beam_and_bounded_time() {
    let frame = process(&room_sweep(900));

    let mut beams_seen = [false; 16];
    for p in frame.cloud.iter() {
        let beam = p.beam();
        assert!(beam < 16);
        beams_seen[beam] = true;

        // Fractional part is scan_period · rel_time; rel_time may run
        // slightly past 1.
        let frac = p.intensity - beam as f32;
        assert!(
            (0.0..=0.15).contains(&frac),
            "fractional intensity {frac} out of range"
        );
    }
    assert!(beams_seen.iter().all(|&b| b), "every beam must be populated");
}

#[test]
fn test_sharp_is_subset_of_less_sharp() {
    let frame = process(&room_sweep(1800));

    let mut less_sharp = frame.corner_less_sharp.points.clone();
    for p in frame.corner_sharp.iter() {
        let pos = less_sharp
            .iter()
            .position(|q| q == p)
            .expect("sharp pick missing from less-sharp cloud");
        // Multiset containment: consume the match.
        less_sharp.swap_remove(pos);
    }
}

#[test]
fn test_per_segment_pick_limits() {
    let frame = process(&room_sweep(1800));
    let segments = 6 * 16;

    assert!(frame.corner_sharp.len() <= 2 * segments);
    assert!(frame.corner_less_sharp.len() <= 20 * segments);
    assert!(frame.surf_flat.len() <= 4 * segments);
}

#[test]
fn test_flat_and_corner_clouds_disjoint() {
    let frame = process(&room_sweep(1800));

    for p in frame.surf_flat.iter() {
        assert!(
            !frame.corner_less_sharp.iter().any(|q| q == p),
            "a point was picked as both planar and edge"
        );
    }
}

// ============================================================================
// S7: Warm-up
// ============================================================================

#[test]
fn test_warm_up_drops_first_twenty_sweeps() {
    let mut registrar = ScanRegistrar::new(RegistrarConfig::default());
    let points = wall_sweep(50);

    for i in 0..20 {
        assert!(
            registrar.handle_sweep(i as f64 * 0.1, &points).is_none(),
            "sweep {i} should be dropped during warm-up"
        );
    }

    let frame = registrar
        .handle_sweep(2.1, &points)
        .expect("21st sweep must produce output");
    assert_eq!(frame.stamp, 2.1);
    assert_eq!(frame.frame_id, "camera");
    assert!(!frame.cloud.is_empty());
}

// ============================================================================
// Degenerate input
// ============================================================================

#[test]
fn test_degenerate_revolution_empty_features() {
    let mut registrar = warmed_registrar();
    // Far fewer than N_SCANS·11 valid points.
    let points: Vec<RawPoint> = (0..30)
        .map(|i| RawPoint::new(5.0, -0.01 * i as f32, 0.0))
        .collect();

    let frame = registrar.handle_sweep(0.0, &points).unwrap();
    assert_eq!(frame.cloud.len(), 30);
    assert!(frame.corner_sharp.is_empty());
    assert!(frame.corner_less_sharp.is_empty());
    assert!(frame.surf_flat.is_empty());
    assert!(frame.surf_less_flat.is_empty());
}
