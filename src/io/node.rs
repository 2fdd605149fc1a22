//! Bounded-queue event loop around the registrar.
//!
//! Stands in for the pub-sub transport: two small input queues (sweeps
//! and IMU samples) feed the single-threaded core, and finished frames
//! leave on an output channel. When a producer outpaces the core the
//! oldest queued input is shed, so the core always works on fresh data.
//!
//! Handler ordering matches the transport contract: messages of one
//! stream are processed in reception order, and a sweep is processed
//! against exactly the IMU samples that arrived before it was picked up.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded, unbounded};

use crate::core::types::{ImuSample, RegistrationFrame};
use crate::registration::{RegistrarConfig, ScanRegistrar};
use crate::utils::constants::{CLOUD_QUEUE_DEPTH, IMU_QUEUE_DEPTH};

use super::bag::SweepMessage;

/// Sending half of a lossy bounded queue.
///
/// `send` never blocks: when the queue is full the oldest queued
/// message is shed to make room, mirroring a transport with a small
/// subscriber queue.
#[derive(Clone)]
pub struct LossySender<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> LossySender<T> {
    /// Enqueue a message, shedding the oldest one on overflow.
    pub fn send(&self, msg: T) {
        let mut msg = msg;
        loop {
            match self.tx.try_send(msg) {
                Ok(()) => return,
                Err(TrySendError::Full(m)) => {
                    if self.rx.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    msg = m;
                }
                // Consumer is gone; nothing left to deliver to.
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Messages shed so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create a lossy bounded channel.
pub fn lossy_channel<T>(capacity: usize) -> (LossySender<T>, Receiver<T>) {
    let (tx, rx) = bounded(capacity);
    (
        LossySender {
            tx,
            rx: rx.clone(),
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

/// Producer-side handles of a running node.
pub struct NodeHandles {
    /// IMU input queue (depth 50)
    pub imu: LossySender<ImuSample>,
    /// Sweep input queue (depth 2)
    pub sweeps: LossySender<SweepMessage>,
    /// Finished frames, one per processed sweep
    pub frames: Receiver<RegistrationFrame>,
}

/// The registration node: registrar plus transport queues.
pub struct RegistrationNode {
    registrar: ScanRegistrar,
    imu_rx: Receiver<ImuSample>,
    sweep_rx: Receiver<SweepMessage>,
    frame_tx: Sender<RegistrationFrame>,
    frames_published: u64,
    sweeps_seen: u64,
}

impl RegistrationNode {
    /// Create a node and its producer handles.
    pub fn new(config: RegistrarConfig) -> (Self, NodeHandles) {
        let (imu_tx, imu_rx) = lossy_channel(IMU_QUEUE_DEPTH);
        let (sweep_tx, sweep_rx) = lossy_channel(CLOUD_QUEUE_DEPTH);
        let (frame_tx, frame_rx) = unbounded();

        (
            Self {
                registrar: ScanRegistrar::new(config),
                imu_rx,
                sweep_rx,
                frame_tx,
                frames_published: 0,
                sweeps_seen: 0,
            },
            NodeHandles {
                imu: imu_tx,
                sweeps: sweep_tx,
                frames: frame_rx,
            },
        )
    }

    /// Frames published since startup.
    pub fn frames_published(&self) -> u64 {
        self.frames_published
    }

    /// Run until the flag clears or both input queues disconnect.
    pub fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            if !self.spin_once(Duration::from_millis(100)) {
                break;
            }
        }

        log::info!(
            "registration node stopping: {} sweeps in, {} frames out, {} frozen imu gaps",
            self.sweeps_seen,
            self.frames_published,
            self.registrar.imu_tracker().frozen_gap_count(),
        );
    }

    /// Process at most one sweep (and any IMU backlog).
    ///
    /// Returns `false` once both input queues have disconnected and
    /// drained, `true` otherwise. Exposed separately from [`run`] so
    /// tests can drive the loop without a thread.
    ///
    /// [`run`]: RegistrationNode::run
    pub fn spin_once(&mut self, timeout: Duration) -> bool {
        // IMU backlog first: every sample that arrived before this
        // sweep was picked up must be in the history when it is used.
        self.drain_imu();

        match self.sweep_rx.recv_timeout(timeout) {
            Ok(sweep) => {
                self.drain_imu();
                self.sweeps_seen += 1;
                if let Some(frame) = self.registrar.handle_sweep(sweep.stamp, &sweep.points) {
                    self.frames_published += 1;
                    if self.frame_tx.send(frame).is_err() {
                        log::warn!("frame receiver disconnected; stopping");
                        return false;
                    }
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => {
                // Producers are gone; finish whatever IMU is left.
                self.drain_imu();
                false
            }
        }
    }

    fn drain_imu(&mut self) {
        while let Ok(sample) = self.imu_rx.try_recv() {
            self.registrar.handle_imu(&sample);
        }
    }
}
