//! Sweep registration: the front-end of the odometry pipeline.
//!
//! Two event handlers drive the stage. [`ScanRegistrar::handle_imu`]
//! feeds the inertial history; [`ScanRegistrar::handle_sweep`] takes one
//! raw revolution, demultiplexes it into beams, de-skews it against the
//! IMU history, extracts edge and planar features and packages the five
//! per-sweep outputs. The handlers never interleave — the transport
//! serializes message delivery — so the registrar holds plain mutable
//! state and no locks.

pub mod beams;
pub mod curvature;
pub mod deskew;
pub mod features;
pub mod voxel;

pub use beams::{AzimuthUnwrapper, SweepBounds, beam_index};
pub use curvature::{FeatureScratch, RejectionThresholds, beam_ranges};
pub use deskew::Deskewer;
pub use features::{SelectionConfig, SweepFeatures, select_features};
pub use voxel::{VoxelGridConfig, VoxelGridFilter};

use crate::core::types::{PointCloud, RawPoint, RegistrationFrame, SweepPoint};
use crate::core::types::ImuSample;
use crate::sensors::{ImuTracker, ImuTrackerConfig};
use crate::utils::constants::{
    CAMERA_FRAME_ID, MAX_SWEEP_POINTS, N_SCANS, OCCLUSION_GAP_SQ, OCCLUSION_RATIO, OUTLIER_RATIO,
    SCAN_PERIOD, SYSTEM_DELAY,
};

use self::curvature::{compute_curvature, mark_unreliable};

/// Configuration for the registration stage.
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// Duration of one revolution in seconds
    pub scan_period: f64,
    /// Number of vertical beams
    pub n_scans: usize,
    /// Sweeps dropped at startup
    pub system_delay: u32,
    /// IMU tracker configuration
    pub imu: ImuTrackerConfig,
    /// Feature selection limits and thresholds
    pub selection: SelectionConfig,
    /// Rejection mask thresholds
    pub rejection: RejectionThresholds,
    /// Voxel grid applied to the less-flat bulk
    pub voxel: VoxelGridConfig,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            scan_period: SCAN_PERIOD,
            n_scans: N_SCANS,
            system_delay: SYSTEM_DELAY,
            imu: ImuTrackerConfig::default(),
            selection: SelectionConfig::default(),
            rejection: RejectionThresholds {
                occlusion_gap_sq: OCCLUSION_GAP_SQ,
                occlusion_ratio: OCCLUSION_RATIO,
                outlier_ratio: OUTLIER_RATIO,
            },
            voxel: VoxelGridConfig::default(),
        }
    }
}

/// The owning registration core.
///
/// Holds the IMU history, the warm-up counter and the reusable feature
/// scratch. Unit-testable without any transport: feed samples and
/// sweeps, collect [`RegistrationFrame`]s.
pub struct ScanRegistrar {
    config: RegistrarConfig,
    imu: ImuTracker,
    voxel: VoxelGridFilter,
    scratch: FeatureScratch,
    sweeps_seen: u32,
    warmed_up: bool,
}

impl ScanRegistrar {
    /// Create a registrar at startup state (warm-up pending, no IMU
    /// history).
    pub fn new(config: RegistrarConfig) -> Self {
        Self {
            imu: ImuTracker::new(config.imu),
            voxel: VoxelGridFilter::new(config.voxel),
            scratch: FeatureScratch::new(),
            warmed_up: config.system_delay == 0,
            config,
            sweeps_seen: 0,
        }
    }

    /// Access the registrar's configuration.
    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    /// Access the IMU tracker (integration-gap metric, latest time).
    pub fn imu_tracker(&self) -> &ImuTracker {
        &self.imu
    }

    /// Ingest one inertial sample.
    pub fn handle_imu(&mut self, sample: &ImuSample) {
        self.imu.ingest(sample);
    }

    /// Process one revolution.
    ///
    /// Returns `None` during warm-up; afterwards always returns a frame,
    /// possibly with empty feature clouds for degenerate sweeps. Points
    /// with non-finite coordinates or outside the vertical field of view
    /// are dropped silently.
    pub fn handle_sweep(&mut self, stamp: f64, points: &[RawPoint]) -> Option<RegistrationFrame> {
        if !self.warmed_up {
            self.sweeps_seen += 1;
            if self.sweeps_seen >= self.config.system_delay {
                self.warmed_up = true;
                log::info!("warm-up complete after {} sweeps", self.sweeps_seen);
            }
            return None;
        }

        let mut finite: Vec<RawPoint> =
            points.iter().copied().filter(RawPoint::is_finite).collect();
        if finite.len() > MAX_SWEEP_POINTS {
            log::warn!(
                "sweep of {} points exceeds the {} cap; truncating",
                finite.len(),
                MAX_SWEEP_POINTS
            );
            finite.truncate(MAX_SWEEP_POINTS);
        }

        let Some((first, last)) = finite.first().zip(finite.last()) else {
            return Some(self.empty_frame(stamp));
        };

        let bounds = SweepBounds::from_endpoints(first, last);
        let mut unwrapper = AzimuthUnwrapper::new();
        let mut deskewer: Option<Deskewer> = None;
        let mut beam_clouds: Vec<PointCloud> = (0..self.config.n_scans)
            .map(|_| PointCloud::new())
            .collect();

        let scan_period = self.config.scan_period;
        for raw in &finite {
            let mut point = SweepPoint::from_native(*raw);
            let Some(scan_id) = beam_index(&point, self.config.n_scans) else {
                continue;
            };

            let ori = unwrapper.unwrap(-point.x.atan2(point.z), &bounds);
            let rel_time = (ori - bounds.start_ori) / bounds.span();
            point.intensity = scan_id as f32 + scan_period as f32 * rel_time;

            if self.imu.has_samples() {
                let point_time = rel_time as f64 * scan_period;
                if let Some(state) = self.imu.state_at(stamp + point_time) {
                    match deskewer.as_mut() {
                        // The first valid point anchors the sweep's
                        // reference frame and is not transformed.
                        None => deskewer = Some(Deskewer::begin(state)),
                        Some(d) => d.apply(state, point_time as f32, &mut point),
                    }
                }
            }

            beam_clouds[scan_id].push(point);
        }

        let beam_lens: Vec<usize> = beam_clouds.iter().map(PointCloud::len).collect();
        let total: usize = beam_lens.iter().sum();
        let mut cloud = PointCloud::with_capacity(total);
        for beam in &beam_clouds {
            cloud.append(beam);
        }

        self.scratch.reset(cloud.len());
        compute_curvature(&cloud, &mut self.scratch);
        mark_unreliable(&cloud, &mut self.scratch, &self.config.rejection);

        let ranges = beam_ranges(&beam_lens);
        let features = select_features(
            &cloud,
            &ranges,
            &mut self.scratch,
            &self.config.selection,
            &self.voxel,
        );

        let imu_trans = deskewer
            .map(|d| d.imu_trans())
            .unwrap_or_default();

        log::debug!(
            "sweep {:.3}: {} points, {} sharp, {} less-sharp, {} flat, {} less-flat",
            stamp,
            cloud.len(),
            features.corner_sharp.len(),
            features.corner_less_sharp.len(),
            features.surf_flat.len(),
            features.surf_less_flat.len(),
        );

        Some(RegistrationFrame {
            stamp,
            frame_id: CAMERA_FRAME_ID.to_string(),
            cloud,
            corner_sharp: features.corner_sharp,
            corner_less_sharp: features.corner_less_sharp,
            surf_flat: features.surf_flat,
            surf_less_flat: features.surf_less_flat,
            imu_trans,
        })
    }

    fn empty_frame(&self, stamp: f64) -> RegistrationFrame {
        RegistrationFrame {
            stamp,
            frame_id: CAMERA_FRAME_ID.to_string(),
            ..Default::default()
        }
    }
}

impl Default for ScanRegistrar {
    fn default() -> Self {
        Self::new(RegistrarConfig::default())
    }
}
