//! Generate a synthetic sensor bag for smoke-testing the node.
//!
//! Simulates a 16-beam sensor at the center of a rectangular room with
//! a 100 Hz IMU stream, and records both streams in timestamp order:
//!
//! ```bash
//! cargo run --release --bin sweep_synth -- --output room.mreg --sweeps 40
//! ```

use std::f64::consts::TAU;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use nalgebra::{UnitQuaternion, Vector3};

use megha_registration::io::{BagMessage, BagRecorder, SweepMessage};
use megha_registration::utils::constants::{GRAVITY, SCAN_PERIOD};
use megha_registration::{ImuSample, RawPoint, Result};

/// Synthetic sweep + IMU bag generator.
#[derive(Parser, Debug)]
#[command(name = "sweep_synth", version, about)]
struct Args {
    /// Output bag path
    #[arg(long, default_value = "room.mreg")]
    output: PathBuf,

    /// Number of sweeps to generate (10 Hz)
    #[arg(long, default_value_t = 40)]
    sweeps: u32,

    /// Azimuth steps per revolution
    #[arg(long, default_value_t = 900)]
    azimuth_steps: u32,

    /// Half-width of the room along native x, meters
    #[arg(long, default_value_t = 5.0)]
    room_x: f64,

    /// Half-width of the room along native y, meters
    #[arg(long, default_value_t = 4.0)]
    room_y: f64,

    /// Constant acceleration along the native y axis, m/s²
    #[arg(long, default_value_t = 0.0)]
    accel: f32,
}

/// Beam elevations of a VLP-16-class device: 2° apart across ±15°.
fn beam_elevations() -> Vec<f64> {
    (0..16).map(|k| (-15 + 2 * k) as f64).collect()
}

/// Range from the room center to the wall along a horizontal bearing.
fn wall_range(theta: f64, half_x: f64, half_y: f64) -> f64 {
    let (sin_t, cos_t) = theta.sin_cos();
    let mut range = f64::INFINITY;
    if cos_t.abs() > 1e-9 {
        range = range.min(half_x / cos_t.abs());
    }
    if sin_t.abs() > 1e-9 {
        range = range.min(half_y / sin_t.abs());
    }
    range
}

fn synthesize_sweep(args: &Args, stamp: f64) -> SweepMessage {
    let elevations = beam_elevations();
    let mut points = Vec::with_capacity(args.azimuth_steps as usize * elevations.len());

    // Azimuth-major ordering, clockwise rotation: this is how the
    // device interleaves its firings.
    for step in 0..args.azimuth_steps {
        let theta = -(step as f64) * TAU / args.azimuth_steps as f64;
        let horizontal = wall_range(theta, args.room_x, args.room_y);
        let (sin_t, cos_t) = theta.sin_cos();
        for &elevation in &elevations {
            let elev = elevation.to_radians();
            points.push(RawPoint::new(
                (horizontal * cos_t) as f32,
                (horizontal * sin_t) as f32,
                (horizontal * elev.tan()) as f32,
            ));
        }
    }

    SweepMessage { stamp, points }
}

fn run(args: &Args) -> Result<()> {
    let mut recorder = BagRecorder::create(&args.output)?;

    let start = 1000.0f64;
    let imu_period = 0.01;
    let duration = args.sweeps as f64 * SCAN_PERIOD;

    let mut imu_time = start;
    let mut sweep_time = start + SCAN_PERIOD / 2.0;

    // Interleave the two streams in timestamp order, IMU leading.
    while imu_time <= start + duration {
        recorder.record(&BagMessage::Imu(ImuSample::new(
            imu_time,
            UnitQuaternion::identity(),
            Vector3::new(0.0, args.accel, GRAVITY),
        )))?;

        if sweep_time <= imu_time && sweep_time <= start + duration {
            recorder.record(&BagMessage::Sweep(synthesize_sweep(args, sweep_time)))?;
            sweep_time += SCAN_PERIOD;
        }
        imu_time += imu_period;
    }

    let count = recorder.count();
    recorder.finish()?;
    log::info!(
        "wrote {} messages ({} sweeps) to {}",
        count,
        args.sweeps,
        args.output.display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("sweep_synth failed: {}", e);
        std::process::exit(1);
    }
}
