//! Registration node: replays a recorded sensor bag through the
//! registration pipeline and publishes per-sweep feature frames.
//!
//! ```bash
//! # Generate a synthetic bag, then run the node over it
//! cargo run --release --bin sweep_synth -- --output room.mreg
//! cargo run --release -- --bag room.mreg
//!
//! # With a config file
//! cargo run --release -- --config megha.toml
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use megha_registration::io::{BagMessage, BagPlayer, NodeHandles, RegistrationNode};
use megha_registration::registration::RegistrarConfig;
use megha_registration::utils::constants::{
    CURVATURE_THRESHOLD, N_SCANS, SCAN_PERIOD, SYSTEM_DELAY, VOXEL_LEAF_SIZE,
};
use megha_registration::{MeghaError, Result, VoxelGridConfig};

// ============================================================================
// CLI
// ============================================================================

/// Scan registration front-end for a LOAM-style odometry pipeline.
#[derive(Parser, Debug)]
#[command(name = "megha-registration", version, about)]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bag file to replay (overrides the config file)
    #[arg(long)]
    bag: Option<PathBuf>,

    /// Replay the bag in a loop until interrupted
    #[arg(long)]
    loop_playback: bool,

    /// Replay without timestamp pacing (stress mode; queues will shed)
    #[arg(long)]
    fast: bool,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    bag: BagConfig,
    #[serde(default)]
    registration: RegistrationConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BagConfig {
    /// Bag file path
    file: Option<String>,
    /// Loop bag playback
    loop_playback: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RegistrationConfig {
    scan_period: f64,
    n_scans: usize,
    system_delay: u32,
    curvature_threshold: f32,
    voxel_leaf_size: f32,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            scan_period: SCAN_PERIOD,
            n_scans: N_SCANS,
            system_delay: SYSTEM_DELAY,
            curvature_threshold: CURVATURE_THRESHOLD,
            voxel_leaf_size: VOXEL_LEAF_SIZE,
        }
    }
}

impl RegistrationConfig {
    fn to_registrar_config(&self) -> RegistrarConfig {
        let mut config = RegistrarConfig {
            scan_period: self.scan_period,
            n_scans: self.n_scans,
            system_delay: self.system_delay,
            voxel: VoxelGridConfig {
                leaf_size: self.voxel_leaf_size,
            },
            ..Default::default()
        };
        config.selection.curvature_threshold = self.curvature_threshold;
        config
    }
}

fn load_config(args: &Args) -> Config {
    let Some(path) = &args.config else {
        return Config::default();
    };

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to parse config {}: {}", path.display(), e);
                Config::default()
            }
        },
        Err(e) => {
            log::warn!("Failed to read config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

// ============================================================================
// Bag playback
// ============================================================================

/// Feed bag messages into the node queues, pacing by recorded
/// timestamps unless `fast` is set.
fn replay_bag(
    path: &PathBuf,
    handles: &NodeHandles,
    running: &AtomicBool,
    fast: bool,
) -> Result<u64> {
    let player = BagPlayer::open(path)?;
    let mut fed = 0u64;
    let mut prev_stamp: Option<f64> = None;

    for msg in player {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        let msg = msg?;

        let stamp = match &msg {
            BagMessage::Imu(sample) => sample.stamp,
            BagMessage::Sweep(sweep) => sweep.stamp,
        };
        if !fast && let Some(prev) = prev_stamp {
            let dt = (stamp - prev).clamp(0.0, 1.0);
            thread::sleep(Duration::from_secs_f64(dt));
        }
        prev_stamp = Some(stamp);

        match msg {
            BagMessage::Imu(sample) => handles.imu.send(sample),
            BagMessage::Sweep(sweep) => handles.sweeps.send(sweep),
        }
        fed += 1;
    }

    Ok(fed)
}

// ============================================================================
// Main Entry Point
// ============================================================================

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
    let config = load_config(&args);

    let bag_path = args
        .bag
        .clone()
        .or_else(|| config.bag.file.as_ref().map(PathBuf::from));
    let Some(bag_path) = bag_path else {
        log::error!("no bag file given (use --bag or [bag].file in the config)");
        std::process::exit(1);
    };
    let loop_playback = args.loop_playback || config.bag.loop_playback;

    log::info!("megha-registration starting");
    log::info!("  Input: bag file {}", bag_path.display());
    if loop_playback {
        log::info!("  Loop: enabled");
    }
    log::info!(
        "  Beams: {}, scan period: {}s, warm-up: {} sweeps",
        config.registration.n_scans,
        config.registration.scan_period,
        config.registration.system_delay
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    if let Err(e) = run_node(&bag_path, config, &args, running) {
        log::error!("Node error: {}", e);
        std::process::exit(1);
    }

    log::info!("megha-registration shutdown complete");
}

fn run_node(
    bag_path: &PathBuf,
    config: Config,
    args: &Args,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let (mut node, handles) = RegistrationNode::new(config.registration.to_registrar_config());
    let frames = handles.frames.clone();

    // Playback thread: feeds the input queues, then hangs up so the
    // node loop can observe the disconnect and stop.
    let playback_running = running.clone();
    let playback_path = bag_path.clone();
    let loop_playback = args.loop_playback || config.bag.loop_playback;
    let fast = args.fast;
    let playback = thread::spawn(move || -> Result<(u64, u64, u64)> {
        let mut fed_total = 0u64;
        loop {
            let fed = replay_bag(&playback_path, &handles, &playback_running, fast)?;
            fed_total += fed;
            log::info!("bag replay pass complete: {} messages", fed);
            if !loop_playback || !playback_running.load(Ordering::Relaxed) {
                return Ok((fed_total, handles.imu.dropped(), handles.sweeps.dropped()));
            }
        }
    });

    // Consumer thread: drains output frames until the node drops its
    // sending half.
    let consumer = thread::spawn(move || {
        let mut count = 0u64;
        while let Ok(frame) = frames.recv() {
            count += 1;
            log::debug!(
                "frame {:.3}: {} points, {}/{} corners, {}/{} surfs",
                frame.stamp,
                frame.cloud.len(),
                frame.corner_sharp.len(),
                frame.corner_less_sharp.len(),
                frame.surf_flat.len(),
                frame.surf_less_flat.len(),
            );
        }
        count
    });

    node.run(&running);

    let (fed, imu_dropped, sweep_dropped) = playback
        .join()
        .map_err(|_| MeghaError::Config("playback thread panicked".into()))??;

    drop(node);
    let consumed = consumer
        .join()
        .map_err(|_| MeghaError::Config("consumer thread panicked".into()))?;

    log::info!(
        "{} messages fed, {} frames published, {} imu / {} sweep messages shed",
        fed,
        consumed,
        imu_dropped,
        sweep_dropped
    );
    Ok(())
}
