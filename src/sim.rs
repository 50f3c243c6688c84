//! Simulated bench: actuator, camera session and frame source backed by a
//! shared analytic motion model instead of hardware. Lets the certification
//! binary run end to end on a desk, the same way the tracker falls back to
//! mock sensor data when no real sensors are reachable. Real deployments
//! implement the `ActuatorPort`, `CameraSession` and `FrameSource` traits
//! against the bench hardware instead.

use std::path::PathBuf;
use std::sync::Arc;

use ndarray::Array2;

use crate::camera::{CameraSession, FrameSource};
use crate::config::RigConfig;
use crate::error::{Result, RigError};
use crate::rig::ActuatorPort;
use crate::types::{
    CameraProperties, CaptureMetadata, Frame, LensFacing, SensorSample, VideoQuality,
};

const SIM_LUMA_WIDTH: usize = 320;
const SIM_LUMA_HEIGHT: usize = 240;
const GYRO_BASE_INTERVAL_SECS: f64 = 0.005;
const SIM_EPOCH_NS: i64 = 1_000_000_000_000;

/// Actuator that acknowledges every command, optionally swallowing the
/// first few pings to exercise the handshake retry path.
pub struct SimulatedActuator {
    flaky_pings: u32,
    pub command_log: Vec<String>,
}

impl SimulatedActuator {
    pub fn new(flaky_pings: u32) -> Self {
        Self {
            flaky_pings,
            command_log: Vec::new(),
        }
    }
}

impl ActuatorPort for SimulatedActuator {
    fn send(&mut self, command: &str) -> Result<String> {
        self.command_log.push(command.to_string());
        if command == "PING" && self.flaky_pings > 0 {
            self.flaky_pings -= 1;
            return Ok(String::new());
        }
        Ok("OK".to_string())
    }
}

/// Analytic stand-in for the physical scene: the device angle follows a
/// sinusoidal sweep while the rig runs, and the stabilized camera observes
/// that motion attenuated by a fixed factor.
pub struct SimScene {
    pub amplitude_deg: f64,
    pub frequency_hz: f64,
    pub motion_duration_secs: f64,
    /// Fraction of the physical motion still visible in the stabilized
    /// video. 0.3 models a healthy stabilizer.
    pub attenuation: f64,
}

impl SimScene {
    pub fn from_config(config: &RigConfig, attenuation: f64) -> Self {
        Self {
            amplitude_deg: 12.0,
            frequency_hz: 0.75,
            motion_duration_secs: config.settle_delay_secs + config.recording_duration_secs + 0.25,
            attenuation,
        }
    }

    fn device_angle_deg(&self, t_secs: f64) -> f64 {
        if t_secs < 0.0 || t_secs > self.motion_duration_secs {
            return 0.0;
        }
        self.amplitude_deg * (2.0 * std::f64::consts::PI * self.frequency_hz * t_secs).sin()
    }

    fn device_rate_rad(&self, t_secs: f64) -> f64 {
        if t_secs < 0.0 || t_secs > self.motion_duration_secs {
            return 0.0;
        }
        let omega = 2.0 * std::f64::consts::PI * self.frequency_hz;
        self.amplitude_deg.to_radians() * omega * (omega * t_secs).cos()
    }

    /// Deterministic high-frequency chart texture.
    fn chart_value(y: usize, x: usize) -> f64 {
        let h = (x.wrapping_mul(92_821) ^ y.wrapping_mul(68_917)) % 251;
        h as f64 / 251.0
    }

    /// Render the chart as seen through the stabilized camera at the given
    /// residual roll angle: left and right halves displaced vertically in
    /// opposite directions, consistent with the extractor's patch geometry.
    fn render_luma(&self, residual_deg: f64) -> Array2<f64> {
        let dy = (residual_deg.to_radians().tan() * SIM_LUMA_WIDTH as f64 / 4.0).round() as isize;
        Array2::from_shape_fn((SIM_LUMA_HEIGHT, SIM_LUMA_WIDTH), |(y, x)| {
            let shift = if x < SIM_LUMA_WIDTH / 2 { -dy } else { dy };
            let src_y = (y as isize - shift).rem_euclid(SIM_LUMA_HEIGHT as isize) as usize;
            Self::chart_value(src_y, x)
        })
    }
}

pub struct SimulatedCamera {
    scene: Arc<SimScene>,
    frame_rate: f64,
    supported_qualities: Vec<VideoQuality>,
    sensor_active: bool,
}

impl SimulatedCamera {
    pub fn new(config: &RigConfig, scene: Arc<SimScene>) -> Self {
        Self {
            scene,
            frame_rate: config.frame_rate,
            supported_qualities: vec![VideoQuality::Vga, VideoQuality::Qvga],
            sensor_active: false,
        }
    }
}

impl CameraSession for SimulatedCamera {
    fn properties(&self) -> Result<CameraProperties> {
        Ok(CameraProperties {
            lens_facing: LensFacing::Rear,
            available_stabilization_modes: vec![0, 1],
            supported_qualities: self.supported_qualities.clone(),
        })
    }

    fn start_sensor_collection(&mut self) -> Result<()> {
        self.sensor_active = true;
        Ok(())
    }

    fn collect_sensor_events(&mut self) -> Result<Vec<SensorSample>> {
        if !self.sensor_active {
            return Err(RigError::SensorStream("collection never started".into()));
        }
        self.sensor_active = false;

        // ~200 Hz with deterministic jitter so intervals are non-uniform.
        let mut samples = Vec::new();
        let mut t = 0.0;
        let mut i = 0usize;
        let window = self.scene.motion_duration_secs + 0.1;
        while t < window {
            let ts_ns = SIM_EPOCH_NS + (t * 1e9) as i64;
            samples.push(SensorSample::gyro(ts_ns, 0.0, 0.0, self.scene.device_rate_rad(t)));
            t += GYRO_BASE_INTERVAL_SECS + ((i * 37) % 7) as f64 * 1e-4;
            i += 1;
        }
        Ok(samples)
    }

    fn record(
        &mut self,
        quality: VideoQuality,
        duration_secs: f64,
        stabilization_mode: u8,
    ) -> Result<CaptureMetadata> {
        if !self.supported_qualities.contains(&quality) {
            return Err(RigError::Recording(format!(
                "quality {} not supported",
                quality.label()
            )));
        }
        let (width, height) = quality.size();
        Ok(CaptureMetadata {
            path: PathBuf::from(format!("sim://{}_{:.1}s.mp4", quality.label(), duration_secs)),
            quality,
            width,
            height,
            frame_rate: self.frame_rate,
            zoom_ratio: 1.0,
            focal_length_mm: 4.38,
            stabilization_mode,
        })
    }
}

/// Decodes "clips" recorded by [`SimulatedCamera`]. Luma is rendered at a
/// fixed reduced resolution; the capture metadata keeps the nominal size for
/// the aspect-ratio logic.
pub struct SimulatedFrameSource {
    scene: Arc<SimScene>,
    settle_delay_secs: f64,
    recording_duration_secs: f64,
}

impl SimulatedFrameSource {
    pub fn new(config: &RigConfig, scene: Arc<SimScene>) -> Self {
        Self {
            scene,
            settle_delay_secs: config.settle_delay_secs,
            recording_duration_secs: config.recording_duration_secs,
        }
    }
}

impl FrameSource for SimulatedFrameSource {
    fn extract_frames(&mut self, capture: &CaptureMetadata) -> Result<Vec<Frame>> {
        let count = (self.recording_duration_secs * capture.frame_rate).round() as usize;
        let mut frames = Vec::with_capacity(count);
        for index in 0..count {
            let t = self.settle_delay_secs + index as f64 / capture.frame_rate;
            let residual = self.scene.attenuation * self.scene.device_angle_deg(t);
            frames.push(Frame {
                index,
                timestamp_secs: index as f64 / capture.frame_rate,
                luma: self.scene.render_luma(residual),
            });
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::max_deflection;
    use crate::gyro::GyroIntegrator;
    use crate::types::Axis;

    fn scene() -> Arc<SimScene> {
        Arc::new(SimScene::from_config(&RigConfig::default(), 0.3))
    }

    #[test]
    fn test_gyro_integrates_back_to_sweep_amplitude() {
        let cfg = RigConfig::default();
        let mut cam = SimulatedCamera::new(&cfg, scene());
        cam.start_sensor_collection().unwrap();
        let samples = cam.collect_sensor_events().unwrap();
        assert!(samples.len() > 1000);

        let series = GyroIntegrator::new(Axis::Z).integrate(&samples, cfg.settle_delay_secs);
        let peak = max_deflection(&series);
        assert!(
            (peak - 12.0).abs() < 0.5,
            "integrated peak {peak} should recover the 12 deg sweep"
        );
    }

    #[test]
    fn test_collect_without_start_errors() {
        let cfg = RigConfig::default();
        let mut cam = SimulatedCamera::new(&cfg, scene());
        assert!(cam.collect_sensor_events().is_err());
    }

    #[test]
    fn test_unsupported_quality_rejected() {
        let cfg = RigConfig::default();
        let mut cam = SimulatedCamera::new(&cfg, scene());
        assert!(cam.record(VideoQuality::P1080, 1.0, 1).is_err());
    }

    #[test]
    fn test_rendered_motion_is_attenuated() {
        let cfg = RigConfig {
            recording_duration_secs: 2.0,
            ..RigConfig::default()
        };
        let s = Arc::new(SimScene::from_config(&cfg, 0.3));
        let mut cam = SimulatedCamera::new(&cfg, s.clone());
        let mut source = SimulatedFrameSource::new(&cfg, s.clone());
        let capture = cam.record(VideoQuality::Vga, 2.0, 1).unwrap();
        let frames = source.extract_frames(&capture).unwrap();
        assert_eq!(frames.len(), 60);
        assert_eq!(frames[0].luma.dim(), (SIM_LUMA_HEIGHT, SIM_LUMA_WIDTH));
    }
}
