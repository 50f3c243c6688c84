//! Narrow seams to the camera stack.
//!
//! Capture sessions, codec work and file pulls all live behind these traits;
//! the certification core only sees typed properties, typed capture metadata
//! and decoded luma frames.

use crate::error::{Result, RigError};
use crate::types::{CameraProperties, CaptureMetadata, Frame, SensorSample, VideoQuality};

pub trait CameraSession {
    fn properties(&self) -> Result<CameraProperties>;

    /// Begin buffering inertial sensor events on the device.
    fn start_sensor_collection(&mut self) -> Result<()>;

    /// Return every event buffered since `start_sensor_collection`, in
    /// capture order, and stop buffering.
    fn collect_sensor_events(&mut self) -> Result<Vec<SensorSample>>;

    /// Run a timed recording with the given stabilization mode and return
    /// typed metadata for the produced clip.
    fn record(
        &mut self,
        quality: VideoQuality,
        duration_secs: f64,
        stabilization_mode: u8,
    ) -> Result<CaptureMetadata>;
}

pub trait FrameSource {
    /// Decode the recorded clip into luma frames, in presentation order.
    fn extract_frames(&mut self, capture: &CaptureMetadata) -> Result<Vec<Frame>>;
}

/// Candidate qualities actually testable on this device: the certification
/// list intersected with device support, minus low-resolution sizes.
pub fn qualifying_qualities(props: &CameraProperties) -> Result<Vec<VideoQuality>> {
    let qualities: Vec<VideoQuality> = VideoQuality::CANDIDATES
        .iter()
        .copied()
        .filter(|q| props.supported_qualities.contains(q) && !q.is_low_resolution())
        .collect();

    if qualities.is_empty() {
        return Err(RigError::NoQualifyingFormat {
            supported: props.supported_qualities.clone(),
        });
    }
    Ok(qualities)
}
