//! I/O infrastructure: transport queues and bag record/playback.

pub mod bag;
pub mod node;

pub use bag::{BagMessage, BagPlayer, BagRecorder, SweepMessage};
pub use node::{LossySender, NodeHandles, RegistrationNode, lossy_channel};
