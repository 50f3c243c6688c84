//! Certification orchestration.
//!
//! One spawned task drives the rig while the main flow starts the sensor
//! stream, waits out the settle delay and runs the timed recording; the rig
//! task is joined before teardown. Everything after capture is sequential
//! post-processing over immutable data. Per-quality failures are isolated
//! and aggregated; only rig-level and sensor-stream failures abort the run.

use std::time::Duration;

use crate::artifacts::ArtifactWriter;
use crate::camera::{qualifying_qualities, CameraSession, FrameSource};
use crate::config::RigConfig;
use crate::correlate::max_deflection;
use crate::error::{Result, RigError};
use crate::gyro::GyroIntegrator;
use crate::rig::RigController;
use crate::sensor_stream::SensorStreamReader;
use crate::types::{LensFacing, VideoQuality};
use crate::verdict::{Outcome, QualityVerdict, RunReport, VerdictEngine};
use crate::video_motion::VideoMotionExtractor;

pub struct StabilizationHarness<C, F>
where
    C: CameraSession,
    F: FrameSource,
{
    config: RigConfig,
    camera: C,
    frames: F,
    artifacts: ArtifactWriter,
    controller: Option<RigController>,
}

impl<C, F> StabilizationHarness<C, F>
where
    C: CameraSession,
    F: FrameSource,
{
    pub fn new(
        config: RigConfig,
        camera: C,
        frames: F,
        controller: RigController,
        artifacts: ArtifactWriter,
    ) -> Self {
        Self {
            config,
            camera,
            frames,
            artifacts,
            controller: Some(controller),
        }
    }

    /// Run the certification across every qualifying video quality and
    /// aggregate the verdicts. Setup problems surface as errors before any
    /// quality is measured.
    pub async fn run(&mut self) -> Result<RunReport> {
        let props = self.camera.properties()?;

        if !matches!(props.lens_facing, LensFacing::Front | LensFacing::Rear) {
            return Err(RigError::UnsupportedLensFacing(props.lens_facing));
        }
        if !props
            .available_stabilization_modes
            .contains(&self.config.stabilization_mode)
        {
            return Err(RigError::UnsupportedStabilizationMode {
                mode: self.config.stabilization_mode,
                available: props.available_stabilization_modes.clone(),
            });
        }

        let qualities = qualifying_qualities(&props)?;
        log::info!(
            "testing {} video qualities: {:?}",
            qualities.len(),
            qualities.iter().map(|q| q.label()).collect::<Vec<_>>()
        );

        let mut report = RunReport::new();
        for quality in qualities {
            match self.run_quality(quality, props.lens_facing).await {
                Ok(verdict) => report.push(verdict),
                Err(e) if e.aborts_run() => return Err(e),
                Err(e) => {
                    log::error!("{}: {e}", quality.label());
                    report.record_error(quality, e.to_string());
                }
            }
        }

        let path = self.artifacts.write_run_report(&report)?;
        log::info!("run report written to {}", path.display());
        Ok(report)
    }

    /// One full measurement cycle for a single video quality.
    async fn run_quality(
        &mut self,
        quality: VideoQuality,
        facing: LensFacing,
    ) -> Result<QualityVerdict> {
        log::info!("collecting data for {}", quality.label());

        // Ordering invariant: sensors streaming before the rig starts
        // moving, and streaming until the recording has finished.
        let mut reader = SensorStreamReader::new();
        reader.start(&mut self.camera)?;

        let controller = self
            .controller
            .take()
            .ok_or_else(|| RigError::RigTask("controller lost by earlier failure".into()))?;
        let rig_task = controller.execute(self.config.sweep_profile());

        tokio::time::sleep(Duration::from_secs_f64(self.config.settle_delay_secs)).await;
        let capture = self.camera.record(
            quality,
            self.config.recording_duration_secs,
            self.config.stabilization_mode,
        );

        // Join the rig and stop the stream before propagating any capture
        // error, so a failed configuration leaves nothing running.
        let (controller, rig_result) = rig_task
            .await
            .map_err(|e| RigError::RigTask(e.to_string()))?;
        self.controller = Some(controller);
        let samples = reader.stop(&mut self.camera)?;
        rig_result?;
        let capture = capture?;
        log::debug!("recorded {}", capture.path.display());

        let frames = self.frames.extract_frames(&capture)?;
        log::debug!("extracted {} frames", frames.len());

        let camera_series = VideoMotionExtractor::new(&self.config).estimate(
            &frames,
            self.config.warm_up_frames,
            capture.frame_rate,
            facing,
        )?;
        let gyro_series = GyroIntegrator::new(self.config.gyro_axis)
            .integrate(&samples, self.config.settle_delay_secs);

        self.artifacts
            .write_rotation_series(quality, "camera", &camera_series)?;
        self.artifacts
            .write_rotation_series(quality, "gyro", &gyro_series)?;

        let camera_peak = max_deflection(&camera_series);
        let gyro_peak = max_deflection(&gyro_series);
        log::debug!(
            "max deflection {}: video {:.3} deg, gyro {:.3} deg",
            quality.label(),
            camera_peak,
            gyro_peak
        );

        let verdict = VerdictEngine::new(&self.config).evaluate(
            quality,
            camera_peak,
            gyro_peak,
            capture.aspect_ratio(),
        );

        match verdict.outcome {
            Outcome::Pass => {
                // Frames carry no diagnostic value on a pass.
                self.artifacts.remove_preserved_frames(quality)?;
            }
            Outcome::Fail => {
                self.artifacts.write_failure_report(&verdict)?;
            }
            Outcome::Invalid => {}
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimScene, SimulatedActuator, SimulatedCamera, SimulatedFrameSource};
    use crate::types::CameraProperties;
    use std::sync::Arc;

    fn fast_config() -> RigConfig {
        RigConfig {
            settle_delay_secs: 0.05,
            recording_duration_secs: 1.0,
            frame_rate: 15.0,
            warm_up_frames: 2,
            num_rotations: 2,
            move_time_secs: 0.01,
            handshake_retry_secs: 0.001,
            search_radius_px: 24,
            ..RigConfig::default()
        }
    }

    fn temp_artifacts(tag: &str) -> ArtifactWriter {
        let dir = std::env::temp_dir().join(format!("stabrig_run_{}_{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        ArtifactWriter::new(dir).unwrap()
    }

    async fn harness_with(
        cfg: RigConfig,
        scene: SimScene,
        tag: &str,
    ) -> StabilizationHarness<SimulatedCamera, SimulatedFrameSource> {
        let scene = Arc::new(scene);
        let camera = SimulatedCamera::new(&cfg, scene.clone());
        let frames = SimulatedFrameSource::new(&cfg, scene);
        let controller = RigController::connect(Box::new(SimulatedActuator::new(1)), &cfg)
            .await
            .unwrap();
        let artifacts = temp_artifacts(tag);
        StabilizationHarness::new(cfg, camera, frames, controller, artifacts)
    }

    #[tokio::test]
    async fn test_well_stabilized_run_passes() {
        let cfg = fast_config();
        let scene = SimScene::from_config(&cfg, 0.3);
        let mut harness = harness_with(cfg, scene, "pass").await;

        let report = harness.run().await.unwrap();
        assert!(report.overall_passed());
        // Only VGA qualifies on the simulated camera (QVGA is excluded).
        assert_eq!(report.verdicts.len(), 1);
        let v = &report.verdicts[0];
        assert_eq!(v.quality, VideoQuality::Vga);
        assert_eq!(v.outcome, Outcome::Pass);
        assert!(v.gyro_peak_deg > 5.0);
        assert!(v.ratio < 0.7, "ratio {}", v.ratio);
    }

    #[tokio::test]
    async fn test_unstabilized_run_fails_with_diagnostics() {
        let cfg = fast_config();
        let mut scene = SimScene::from_config(&cfg, 0.9);
        // Keep the residual displacement inside the correlation search
        // window while staying well above the minimum movement angle.
        scene.amplitude_deg = 8.0;
        let mut harness = harness_with(cfg, scene, "fail").await;

        let report = harness.run().await.unwrap();
        assert!(!report.overall_passed());
        let v = &report.verdicts[0];
        assert_eq!(v.outcome, Outcome::Fail);
        assert!(v.ratio >= 0.7, "ratio {}", v.ratio);

        // Diagnostics preserved on failure.
        assert!(harness.artifacts.dir().join("VGA_failure.txt").exists());
        assert!(harness.artifacts.dir().join("VGA_camera_rotations.csv").exists());
        assert!(harness.artifacts.dir().join("VGA_gyro_rotations.csv").exists());
    }

    #[tokio::test]
    async fn test_insufficient_stimulus_is_invalid_not_pass() {
        let cfg = fast_config();
        let mut scene = SimScene::from_config(&cfg, 0.3);
        scene.amplitude_deg = 2.0; // below the 5 deg minimum movement
        let mut harness = harness_with(cfg, scene, "invalid").await;

        let report = harness.run().await.unwrap();
        assert!(!report.overall_passed());
        assert_eq!(report.verdicts[0].outcome, Outcome::Invalid);
    }

    #[tokio::test]
    async fn test_unsupported_stabilization_mode_aborts() {
        struct NoStabCamera(SimulatedCamera);
        impl CameraSession for NoStabCamera {
            fn properties(&self) -> Result<CameraProperties> {
                let mut p = self.0.properties()?;
                p.available_stabilization_modes = vec![0];
                Ok(p)
            }
            fn start_sensor_collection(&mut self) -> Result<()> {
                self.0.start_sensor_collection()
            }
            fn collect_sensor_events(&mut self) -> Result<Vec<crate::types::SensorSample>> {
                self.0.collect_sensor_events()
            }
            fn record(
                &mut self,
                q: VideoQuality,
                d: f64,
                m: u8,
            ) -> Result<crate::types::CaptureMetadata> {
                self.0.record(q, d, m)
            }
        }

        let cfg = fast_config();
        let scene = Arc::new(SimScene::from_config(&cfg, 0.3));
        let camera = NoStabCamera(SimulatedCamera::new(&cfg, scene.clone()));
        let frames = SimulatedFrameSource::new(&cfg, scene);
        let controller = RigController::connect(Box::new(SimulatedActuator::new(0)), &cfg)
            .await
            .unwrap();
        let mut harness =
            StabilizationHarness::new(cfg, camera, frames, controller, temp_artifacts("nostab"));

        let err = harness.run().await.unwrap_err();
        assert!(matches!(err, RigError::UnsupportedStabilizationMode { .. }));
    }
}
