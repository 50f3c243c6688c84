//! Pass/fail decision per tested video quality.
//!
//! Each quality walks Collecting -> ValidatingStimulus -> Scoring -> Decided.
//! A gyro peak below the minimum movement angle means the rig never moved the
//! device enough to judge stabilization at all; that is an `Invalid` outcome,
//! never a pass and never a stabilization failure.

use serde::{Deserialize, Serialize};

use crate::config::RigConfig;
use crate::correlate::stabilization_ratio;
use crate::types::VideoQuality;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Pass,
    Fail,
    /// Stimulus insufficient: the test could not judge stabilization.
    Invalid,
}

/// Full diagnostic detail for one tested quality, emitted on pass and fail
/// alike.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub quality: VideoQuality,
    pub camera_peak_deg: f64,
    pub gyro_peak_deg: f64,
    pub ratio: f64,
    pub threshold_factor: f64,
    pub wide_aspect_adjusted: bool,
    pub outcome: Outcome,
}

#[derive(Debug, PartialEq)]
enum State {
    Collecting,
    ValidatingStimulus,
    Scoring,
    Decided(Outcome),
}

pub struct VerdictEngine {
    min_movement_angle_deg: f64,
    base_factor: f64,
    wide_factor_scale: f64,
    wide_aspect_ratio: f64,
}

impl VerdictEngine {
    pub fn new(config: &RigConfig) -> Self {
        Self {
            min_movement_angle_deg: config.min_movement_angle_deg,
            base_factor: config.stabilization_factor,
            wide_factor_scale: config.wide_aspect_factor_scale,
            wide_aspect_ratio: config.wide_aspect_ratio,
        }
    }

    /// Threshold factor for a recording of the given aspect ratio. Formats
    /// wider than 16:9 crop more aggressively, so they get a widened factor
    /// to avoid failing on cropping artifacts rather than real instability.
    pub fn effective_factor(&self, aspect_ratio: f64) -> (f64, bool) {
        if aspect_ratio > self.wide_aspect_ratio {
            (self.base_factor * self.wide_factor_scale, true)
        } else {
            (self.base_factor, false)
        }
    }

    pub fn evaluate(
        &self,
        quality: VideoQuality,
        camera_peak_deg: f64,
        gyro_peak_deg: f64,
        aspect_ratio: f64,
    ) -> QualityVerdict {
        let mut state = State::Collecting;
        let ratio = stabilization_ratio(camera_peak_deg, gyro_peak_deg);
        let mut threshold_factor = self.base_factor;
        let mut wide_aspect_adjusted = false;

        loop {
            state = match state {
                State::Collecting => State::ValidatingStimulus,
                State::ValidatingStimulus => {
                    if gyro_peak_deg < self.min_movement_angle_deg {
                        log::warn!(
                            "{}: rig not moved enough, gyro peak {:.3} deg < {:.1} deg",
                            quality.label(),
                            gyro_peak_deg,
                            self.min_movement_angle_deg
                        );
                        State::Decided(Outcome::Invalid)
                    } else {
                        State::Scoring
                    }
                }
                State::Scoring => {
                    let (factor, adjusted) = self.effective_factor(aspect_ratio);
                    threshold_factor = factor;
                    wide_aspect_adjusted = adjusted;
                    if camera_peak_deg < gyro_peak_deg * factor {
                        State::Decided(Outcome::Pass)
                    } else {
                        State::Decided(Outcome::Fail)
                    }
                }
                State::Decided(outcome) => {
                    log::info!(
                        "{}: camera {:.3} deg, gyro {:.3} deg, ratio {:.4}, thresh {:.2} -> {:?}",
                        quality.label(),
                        camera_peak_deg,
                        gyro_peak_deg,
                        ratio,
                        threshold_factor,
                        outcome
                    );
                    return QualityVerdict {
                        quality,
                        camera_peak_deg,
                        gyro_peak_deg,
                        ratio,
                        threshold_factor,
                        wide_aspect_adjusted,
                        outcome,
                    };
                }
            };
        }
    }
}

/// Aggregated result over all tested qualities.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub verdicts: Vec<QualityVerdict>,
    /// Per-quality failures that prevented a verdict (e.g. extraction).
    pub errors: Vec<(VideoQuality, String)>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, verdict: QualityVerdict) {
        self.verdicts.push(verdict);
    }

    pub fn record_error(&mut self, quality: VideoQuality, message: String) {
        self.errors.push((quality, message));
    }

    /// The run passes only if every quality produced a Pass verdict and no
    /// quality errored out.
    pub fn overall_passed(&self) -> bool {
        self.errors.is_empty()
            && !self.verdicts.is_empty()
            && self.verdicts.iter().all(|v| v.outcome == Outcome::Pass)
    }

    pub fn failed_verdicts(&self) -> impl Iterator<Item = &QualityVerdict> {
        self.verdicts
            .iter()
            .filter(|v| v.outcome != Outcome::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> VerdictEngine {
        VerdictEngine::new(&RigConfig::default())
    }

    const STD_ASPECT: f64 = 4.0 / 3.0;

    #[test]
    fn test_scenario_a_pass() {
        // ratio 0.5 < 0.7
        let v = engine().evaluate(VideoQuality::P1080, 10.0, 20.0, STD_ASPECT);
        assert_eq!(v.outcome, Outcome::Pass);
        assert!((v.ratio - 0.5).abs() < 1e-12);
        assert!(!v.wide_aspect_adjusted);
    }

    #[test]
    fn test_scenario_b_fail() {
        // ratio 0.8 >= 0.7
        let v = engine().evaluate(VideoQuality::P1080, 16.0, 20.0, STD_ASPECT);
        assert_eq!(v.outcome, Outcome::Fail);
        assert!((v.ratio - 0.8).abs() < 1e-12);
        assert_eq!(v.threshold_factor, 0.7);
    }

    #[test]
    fn test_scenario_c_invalid_stimulus() {
        // gyro peak 3 deg below the 5 deg minimum, camera peak irrelevant
        let v = engine().evaluate(VideoQuality::P720, 0.1, 3.0, STD_ASPECT);
        assert_eq!(v.outcome, Outcome::Invalid);
        let v = engine().evaluate(VideoQuality::P720, 100.0, 3.0, STD_ASPECT);
        assert_eq!(v.outcome, Outcome::Invalid);
    }

    #[test]
    fn test_scenario_d_wide_aspect_rescue() {
        // 21:9 recording: factor widens to 0.77 and 0.75 squeaks through.
        let v = engine().evaluate(VideoQuality::P1080, 15.0, 20.0, 21.0 / 9.0);
        assert_eq!(v.outcome, Outcome::Pass);
        assert!(v.wide_aspect_adjusted);
        assert!((v.threshold_factor - 0.77).abs() < 1e-9);

        // Same peaks under the unadjusted factor would have failed.
        let v = engine().evaluate(VideoQuality::P1080, 15.0, 20.0, STD_ASPECT);
        assert_eq!(v.outcome, Outcome::Fail);
    }

    #[test]
    fn test_threshold_selection() {
        let e = engine();
        let (factor, adjusted) = e.effective_factor(16.0 / 9.0);
        assert_eq!(factor, 0.7);
        assert!(!adjusted);
        let (factor, adjusted) = e.effective_factor(16.0 / 9.0 + 0.01);
        assert!((factor - 0.7 * 1.1).abs() < 1e-12);
        assert!(adjusted);
    }

    #[test]
    fn test_boundary_equal_is_fail() {
        // camera == gyro * factor is not strictly below the threshold.
        let v = engine().evaluate(VideoQuality::Vga, 14.0, 20.0, STD_ASPECT);
        assert_eq!(v.outcome, Outcome::Fail);
    }

    #[test]
    fn test_run_report_aggregation() {
        let e = engine();
        let mut report = RunReport::new();
        report.push(e.evaluate(VideoQuality::P1080, 10.0, 20.0, STD_ASPECT));
        assert!(report.overall_passed());

        report.push(e.evaluate(VideoQuality::P720, 16.0, 20.0, STD_ASPECT));
        assert!(!report.overall_passed());
        assert_eq!(report.failed_verdicts().count(), 1);
    }

    #[test]
    fn test_run_report_error_blocks_pass() {
        let e = engine();
        let mut report = RunReport::new();
        report.push(e.evaluate(VideoQuality::P1080, 10.0, 20.0, STD_ASPECT));
        report.record_error(VideoQuality::Vga, "too few frames".into());
        assert!(!report.overall_passed());
    }

    #[test]
    fn test_empty_report_is_not_a_pass() {
        assert!(!RunReport::new().overall_passed());
    }
}
