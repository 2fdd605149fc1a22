//! Foundation data types.

mod frame;
mod imu;
mod point;

pub use frame::RegistrationFrame;
pub use imu::{ImuSample, ImuTrans};
pub use point::{PointCloud, RawPoint, SweepPoint};
