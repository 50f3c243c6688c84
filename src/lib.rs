//! Certification harness for camera video stabilization.
//!
//! A motorized rig sweeps the device through a scripted rotation while a
//! clip is recorded and gyroscope events are captured. The clip is reduced
//! to per-frame rotation angles, the gyro stream is integrated into
//! cumulative rotation, and the two peak deflections decide whether the
//! stabilizer actually removed motion.

pub mod artifacts;
pub mod camera;
pub mod config;
pub mod correlate;
pub mod error;
pub mod gyro;
pub mod rig;
pub mod runner;
pub mod sensor_stream;
pub mod sim;
pub mod types;
pub mod verdict;
pub mod video_motion;

pub use config::RigConfig;
pub use error::{Result, RigError};
pub use runner::StabilizationHarness;
pub use verdict::{Outcome, QualityVerdict, RunReport};
