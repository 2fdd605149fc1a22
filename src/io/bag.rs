//! Recording and playback of sweep + IMU streams.
//!
//! # File format
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ magic "MREG" │ version: u16 LE                   │
//! ├──────────────────────────────────────────────────┤
//! │ [len: u32 LE][postcard BagMessage] ...           │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Messages are stored in arrival order; playback re-delivers them in
//! the same order, preserving the interleaving of the two streams.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::{ImuSample, RawPoint};
use crate::error::{MeghaError, Result};

/// Magic bytes at the start of a bag file.
pub const BAG_MAGIC: [u8; 4] = *b"MREG";

/// Current bag format version.
pub const BAG_VERSION: u16 = 1;

/// One raw revolution as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepMessage {
    /// Wall-clock timestamp in seconds
    pub stamp: f64,
    /// Unordered returns in the LiDAR-native frame
    pub points: Vec<RawPoint>,
}

/// A recorded input message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BagMessage {
    /// Inertial sample
    Imu(ImuSample),
    /// Full-revolution point cloud
    Sweep(SweepMessage),
}

/// Appends messages to a bag file.
pub struct BagRecorder {
    writer: BufWriter<File>,
    count: u64,
}

impl BagRecorder {
    /// Create a new bag file, truncating any existing one.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&BAG_MAGIC)?;
        writer.write_all(&BAG_VERSION.to_le_bytes())?;
        Ok(Self { writer, count: 0 })
    }

    /// Append one message.
    pub fn record(&mut self, msg: &BagMessage) -> Result<()> {
        let bytes = postcard::to_allocvec(msg)?;
        self.writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
        self.writer.write_all(&bytes)?;
        self.count += 1;
        Ok(())
    }

    /// Number of messages recorded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Flush and close the bag.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads messages back from a bag file.
pub struct BagPlayer {
    reader: BufReader<File>,
}

impl BagPlayer {
    /// Open a bag file, validating magic and version.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != BAG_MAGIC {
            return Err(MeghaError::BagFormat("bad magic bytes".into()));
        }

        let mut version = [0u8; 2];
        reader.read_exact(&mut version)?;
        let version = u16::from_le_bytes(version);
        if version != BAG_VERSION {
            return Err(MeghaError::BagFormat(format!(
                "unsupported version {version}"
            )));
        }

        Ok(Self { reader })
    }

    /// Read the next message, or `None` at end of file.
    pub fn next_message(&mut self) -> Result<Option<BagMessage>> {
        let mut len = [0u8; 4];
        match self.reader.read_exact(&mut len) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len) as usize;
        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload)?;

        let msg: BagMessage = postcard::from_bytes(&payload)?;
        Ok(Some(msg))
    }
}

impl Iterator for BagPlayer {
    type Item = Result<BagMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_message().transpose()
    }
}
