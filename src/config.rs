use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, RigError};
use crate::types::{Axis, RotationProfile};

/// All certification constants in one injectable struct. Nothing in the
/// pipeline reads module-level globals; the verdict engine and the gyro
/// integrator receive these fields explicitly.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    // ── Pass/fail thresholds ──
    /// Minimum gyro peak (degrees) for the stimulus to count as valid.
    pub min_movement_angle_deg: f64,
    /// Fraction of gyro movement the camera is allowed to show.
    pub stabilization_factor: f64,
    /// Threshold widening applied to formats wider than `wide_aspect_ratio`.
    pub wide_aspect_factor_scale: f64,
    pub wide_aspect_ratio: f64,

    // ── Rig motion ──
    pub num_rotations: u32,
    pub servo_speed: u32,
    pub servo_speed_tablet: u32,
    pub move_time_secs: f64,
    pub sweep_low_deg: f64,
    pub sweep_high_deg: f64,
    pub handshake_attempts: u32,
    pub handshake_retry_secs: f64,
    pub actuator_channel: u8,
    pub tablet_rig: bool,

    // ── Capture timing ──
    /// Pause between starting motion/sensors and the measured recording.
    pub settle_delay_secs: f64,
    pub recording_duration_secs: f64,
    /// Initial frames discarded while 3A converges.
    pub warm_up_frames: usize,
    pub frame_rate: f64,
    pub stabilization_mode: u8,

    // ── Signal processing ──
    pub gyro_axis: Axis,

    // ── Vision correlation ──
    /// Patch half-size as a fraction of frame height.
    pub patch_fraction: f64,
    pub search_radius_px: usize,
    /// Reference patches flatter than this are rejected as untextured.
    pub min_patch_stddev: f64,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            min_movement_angle_deg: 5.0,
            stabilization_factor: 0.7,
            wide_aspect_factor_scale: 1.1,
            wide_aspect_ratio: 16.0 / 9.0,
            num_rotations: 24,
            servo_speed: 20,
            servo_speed_tablet: 10,
            move_time_secs: 0.3,
            sweep_low_deg: 10.0,
            sweep_high_deg: 25.0,
            handshake_attempts: 5,
            handshake_retry_secs: 1.0,
            actuator_channel: 1,
            tablet_rig: false,
            settle_delay_secs: 5.5,
            recording_duration_secs: 5.5,
            warm_up_frames: 30,
            frame_rate: 30.0,
            stabilization_mode: 1,
            gyro_axis: Axis::Z,
            patch_fraction: 0.125,
            search_radius_px: 12,
            min_patch_stddev: 0.01,
        }
    }
}

impl RigConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| RigError::Config(e.to_string()))
    }

    pub fn effective_servo_speed(&self) -> u32 {
        if self.tablet_rig {
            self.servo_speed_tablet
        } else {
            self.servo_speed
        }
    }

    pub fn sweep_profile(&self) -> RotationProfile {
        RotationProfile::stabilization_sweep(
            self.sweep_low_deg,
            self.sweep_high_deg,
            self.effective_servo_speed(),
            self.move_time_secs,
            self.num_rotations,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_certification_constants() {
        let cfg = RigConfig::default();
        assert_eq!(cfg.min_movement_angle_deg, 5.0);
        assert_eq!(cfg.stabilization_factor, 0.7);
        assert_eq!(cfg.wide_aspect_factor_scale, 1.1);
        assert_eq!(cfg.num_rotations, 24);
        assert_eq!(cfg.warm_up_frames, 30);
        assert!((cfg.settle_delay_secs - 5.5).abs() < 1e-9);
        assert!((cfg.recording_duration_secs - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_tablet_rig_uses_slower_servo() {
        let mut cfg = RigConfig::default();
        assert_eq!(cfg.effective_servo_speed(), cfg.servo_speed);
        cfg.tablet_rig = true;
        assert_eq!(cfg.effective_servo_speed(), cfg.servo_speed_tablet);
    }

    #[test]
    fn test_partial_json_overrides_defaults() {
        let cfg: RigConfig = serde_json::from_str(r#"{"stabilization_factor": 0.6}"#).unwrap();
        assert_eq!(cfg.stabilization_factor, 0.6);
        assert_eq!(cfg.num_rotations, 24);
    }
}
