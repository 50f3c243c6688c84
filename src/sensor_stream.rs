//! Pass-through capture of the device's inertial sample stream.
//!
//! The reader is a thin state machine over the camera session's sensor
//! buffering: it must be started before the rig begins moving and stopped
//! only after the recording completes, so the sample window strictly covers
//! the recording window. It never reorders or downsamples; it only verifies
//! the ordering invariant the downstream integrator relies on.

use crate::camera::CameraSession;
use crate::error::{Result, RigError};
use crate::types::SensorSample;

#[derive(Debug, PartialEq)]
enum ReaderState {
    Idle,
    Streaming,
    Stopped,
}

pub struct SensorStreamReader {
    state: ReaderState,
}

impl SensorStreamReader {
    pub fn new() -> Self {
        Self {
            state: ReaderState::Idle,
        }
    }

    pub fn start(&mut self, camera: &mut dyn CameraSession) -> Result<()> {
        if self.state != ReaderState::Idle {
            return Err(RigError::SensorStream(format!(
                "start called in state {:?}",
                self.state
            )));
        }
        camera.start_sensor_collection()?;
        self.state = ReaderState::Streaming;
        log::debug!("sensor event collection started");
        Ok(())
    }

    /// Drain the buffered window. Samples come back exactly as captured;
    /// out-of-order timestamps mean the collaborator broke its contract and
    /// the whole run is invalid.
    pub fn stop(&mut self, camera: &mut dyn CameraSession) -> Result<Vec<SensorSample>> {
        if self.state != ReaderState::Streaming {
            return Err(RigError::SensorStream(format!(
                "stop called in state {:?}",
                self.state
            )));
        }
        let samples = camera.collect_sensor_events()?;
        self.state = ReaderState::Stopped;

        for pair in samples.windows(2) {
            if pair[1].timestamp_ns < pair[0].timestamp_ns {
                return Err(RigError::SensorStream(format!(
                    "out-of-order sensor timestamps: {} after {}",
                    pair[1].timestamp_ns, pair[0].timestamp_ns
                )));
            }
        }

        log::debug!("sensor event collection stopped, {} samples", samples.len());
        Ok(samples)
    }

    pub fn is_streaming(&self) -> bool {
        self.state == ReaderState::Streaming
    }
}

impl Default for SensorStreamReader {
    fn default() -> Self {
        Self::new()
    }
}
