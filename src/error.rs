use thiserror::Error;

use crate::types::{LensFacing, VideoQuality};

/// Error taxonomy for a certification run.
///
/// Setup-level variants abort the whole run before (or during) measurement;
/// extraction-level variants are fatal to a single video quality only and the
/// run continues with the remaining qualities. Insufficient rig stimulus and
/// stabilization failure are verdict outcomes, not errors (see `verdict`).
#[derive(Debug, Error)]
pub enum RigError {
    #[error("actuator handshake failed after {attempts} attempts")]
    HandshakeFailed { attempts: u32 },

    #[error("actuator port: {0}")]
    Actuator(String),

    #[error("stabilization mode {mode} not available (device reports {available:?})")]
    UnsupportedStabilizationMode { mode: u8, available: Vec<u8> },

    #[error("camera must be front or rear facing, got {0:?}")]
    UnsupportedLensFacing(LensFacing),

    #[error("no qualifying video format (device supports {supported:?})")]
    NoQualifyingFormat { supported: Vec<VideoQuality> },

    #[error("{available} usable frames after {warm_up} warm-up frames, need at least 2")]
    InsufficientFrames { available: usize, warm_up: usize },

    #[error("reference frame has no correlatable content")]
    NoCorrelatableContent,

    #[error("recording failed: {0}")]
    Recording(String),

    #[error("sensor stream: {0}")]
    SensorStream(String),

    #[error("rig task: {0}")]
    RigTask(String),

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RigError {
    /// True for failures that invalidate the whole run, not just the quality
    /// currently under test. Extraction and recording failures are isolated
    /// to one configuration; everything touching the rig or the sensor
    /// stream desynchronizes the two signals and cannot be retried.
    pub fn aborts_run(&self) -> bool {
        !matches!(
            self,
            RigError::InsufficientFrames { .. }
                | RigError::NoCorrelatableContent
                | RigError::Recording(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RigError>;
