use nalgebra::Vector3;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const NANOS_PER_SEC: f64 = 1e9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    Gyro,
    Accel,
}

/// One timestamped inertial sample. Timestamps are monotonic nanoseconds;
/// the interval between consecutive samples is NOT uniform and consumers
/// must compute it per pair.
#[derive(Clone, Debug)]
pub struct SensorSample {
    pub timestamp_ns: i64,
    pub axis: Vector3<f64>,
    pub kind: SensorKind,
}

impl SensorSample {
    pub fn gyro(timestamp_ns: i64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_ns,
            axis: Vector3::new(x, y, z),
            kind: SensorKind::Gyro,
        }
    }

    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ns as f64 / NANOS_PER_SEC
    }
}

/// Rotation axis the rig moves the device about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn component(&self, v: &Vector3<f64>) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// One decoded video frame, luma only. Timestamps assume constant FPS and
/// derive from the frame's position in the decoded sequence.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: usize,
    pub timestamp_secs: f64,
    pub luma: Array2<f64>,
}

impl Frame {
    pub fn height(&self) -> usize {
        self.luma.nrows()
    }

    pub fn width(&self) -> usize {
        self.luma.ncols()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AnglePoint {
    pub offset_secs: f64,
    pub angle_deg: f64,
}

/// Timestamped rotation-angle sequence. Offsets are seconds relative to
/// recording start and non-decreasing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AngleSeries {
    points: Vec<AnglePoint>,
}

impl AngleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, offset_secs: f64, angle_deg: f64) {
        debug_assert!(
            self.points
                .last()
                .map_or(true, |p| offset_secs >= p.offset_secs),
            "angle series offsets must be non-decreasing"
        );
        self.points.push(AnglePoint {
            offset_secs,
            angle_deg,
        });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[AnglePoint] {
        &self.points
    }

    pub fn first_offset(&self) -> Option<f64> {
        self.points.first().map(|p| p.offset_secs)
    }

    /// Pure time translation: every offset moves by `delta_secs`. The exact
    /// inverse is `shifted(-delta_secs)`.
    pub fn shifted(&self, delta_secs: f64) -> AngleSeries {
        AngleSeries {
            points: self
                .points
                .iter()
                .map(|p| AnglePoint {
                    offset_secs: p.offset_secs + delta_secs,
                    angle_deg: p.angle_deg,
                })
                .collect(),
        }
    }

    /// Drops points that precede offset zero (samples captured before the
    /// recording began).
    pub fn trimmed_to_start(&self) -> AngleSeries {
        AngleSeries {
            points: self
                .points
                .iter()
                .filter(|p| p.offset_secs >= 0.0)
                .copied()
                .collect(),
        }
    }

    pub fn is_monotonic(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[1].offset_secs >= w[0].offset_secs)
    }
}

/// One step of a rig rotation profile: target angle, servo speed setting,
/// and how long to hold before the next step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RotationStep {
    pub angle_deg: f64,
    pub speed: u32,
    pub hold_secs: f64,
}

/// Immutable scripted motion for the rig: the step sequence is repeated
/// `cycles` times.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RotationProfile {
    steps: Vec<RotationStep>,
    pub cycles: u32,
}

impl RotationProfile {
    pub fn new(steps: Vec<RotationStep>, cycles: u32) -> Self {
        Self { steps, cycles }
    }

    pub fn steps(&self) -> &[RotationStep] {
        &self.steps
    }

    /// The stabilization sweep: a gentle arc between two angles at a speed
    /// mimicking hand movement.
    pub fn stabilization_sweep(
        low_deg: f64,
        high_deg: f64,
        speed: u32,
        move_secs: f64,
        cycles: u32,
    ) -> Self {
        Self::new(
            vec![
                RotationStep {
                    angle_deg: high_deg,
                    speed,
                    hold_secs: move_secs,
                },
                RotationStep {
                    angle_deg: low_deg,
                    speed,
                    hold_secs: move_secs,
                },
            ],
            cycles,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LensFacing {
    Front,
    Rear,
    External,
}

/// Video qualities the certification may exercise, with their legacy
/// camcorder profile ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoQuality {
    Cif,
    P480,
    P720,
    P1080,
    Qvga,
    Vga,
}

impl VideoQuality {
    pub const CANDIDATES: [VideoQuality; 6] = [
        VideoQuality::Cif,
        VideoQuality::P480,
        VideoQuality::P720,
        VideoQuality::P1080,
        VideoQuality::Qvga,
        VideoQuality::Vga,
    ];

    pub fn profile_id(self) -> u8 {
        match self {
            VideoQuality::Cif => 3,
            VideoQuality::P480 => 4,
            VideoQuality::P720 => 5,
            VideoQuality::P1080 => 6,
            VideoQuality::Qvga => 7,
            VideoQuality::Vga => 9,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VideoQuality::Cif => "CIF",
            VideoQuality::P480 => "480P",
            VideoQuality::P720 => "720P",
            VideoQuality::P1080 => "1080P",
            VideoQuality::Qvga => "QVGA",
            VideoQuality::Vga => "VGA",
        }
    }

    /// (width, height) in pixels.
    pub fn size(self) -> (u32, u32) {
        match self {
            VideoQuality::Cif => (352, 288),
            VideoQuality::P480 => (720, 480),
            VideoQuality::P720 => (1280, 720),
            VideoQuality::P1080 => (1920, 1080),
            VideoQuality::Qvga => (320, 240),
            VideoQuality::Vga => (640, 480),
        }
    }

    /// Sizes too small for reliable frame correlation are excluded from
    /// certification.
    pub fn is_low_resolution(self) -> bool {
        matches!(self, VideoQuality::Cif | VideoQuality::Qvga)
    }
}

/// Typed capture result. The recording collaborator exposes exactly the
/// fields this core consumes; no string-keyed metadata access.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub path: PathBuf,
    pub quality: VideoQuality,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub zoom_ratio: f64,
    pub focal_length_mm: f64,
    pub stabilization_mode: u8,
}

impl CaptureMetadata {
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Static camera properties consulted before any measurement.
#[derive(Clone, Debug)]
pub struct CameraProperties {
    pub lens_facing: LensFacing,
    pub available_stabilization_modes: Vec<u8>,
    pub supported_qualities: Vec<VideoQuality>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_shift_round_trip() {
        let mut series = AngleSeries::new();
        series.push(0.0, 1.0);
        series.push(0.1, 2.5);
        series.push(0.25, -3.0);

        let shifted = series.shifted(-5.5);
        let restored = shifted.shifted(5.5);

        assert_eq!(restored.len(), series.len());
        for (a, b) in restored.points().iter().zip(series.points()) {
            assert!((a.offset_secs - b.offset_secs).abs() < 1e-12);
            assert!((a.angle_deg - b.angle_deg).abs() < 1e-12);
        }
    }

    #[test]
    fn test_series_trim_drops_pre_recording_points() {
        let mut series = AngleSeries::new();
        series.push(-0.2, 1.0);
        series.push(-0.1, 2.0);
        series.push(0.0, 3.0);
        series.push(0.1, 4.0);

        let trimmed = series.trimmed_to_start();
        assert_eq!(trimmed.len(), 2);
        assert!(trimmed.first_offset().unwrap() >= 0.0);
    }

    #[test]
    fn test_series_monotonic() {
        let mut series = AngleSeries::new();
        series.push(0.0, 0.0);
        series.push(0.033, 1.0);
        series.push(0.066, -1.0);
        assert!(series.is_monotonic());
    }

    #[test]
    fn test_quality_exclusions() {
        assert!(VideoQuality::Cif.is_low_resolution());
        assert!(VideoQuality::Qvga.is_low_resolution());
        assert!(!VideoQuality::P1080.is_low_resolution());
        assert_eq!(VideoQuality::P1080.profile_id(), 6);
    }

    #[test]
    fn test_sweep_profile_shape() {
        let profile = RotationProfile::stabilization_sweep(10.0, 25.0, 20, 0.3, 24);
        assert_eq!(profile.cycles, 24);
        assert_eq!(profile.steps().len(), 2);
        assert!(profile.steps()[0].angle_deg > profile.steps()[1].angle_deg);
    }

    #[test]
    fn test_axis_component() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(Axis::X.component(&v), 1.0);
        assert_eq!(Axis::Z.component(&v), 3.0);
    }
}
