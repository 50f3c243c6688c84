//! Peak comparison between the two motion signals.
//!
//! The camera series and the gyro series come from different measurement
//! modalities at different sampling densities, so they are compared only as
//! scalar peak magnitudes, never point by point. This mirrors the calibration
//! of the pass/fail thresholds and must not be tightened.

use crate::types::AngleSeries;

/// Maximum absolute angle reached anywhere in the series. Empty series
/// yields 0.
pub fn max_deflection(series: &AngleSeries) -> f64 {
    series
        .points()
        .iter()
        .map(|p| p.angle_deg.abs())
        .fold(0.0, f64::max)
}

/// Stabilization-effectiveness metric: observed camera motion over true
/// physical motion. Well below 1 for a working stabilizer.
pub fn stabilization_ratio(camera_peak_deg: f64, gyro_peak_deg: f64) -> f64 {
    camera_peak_deg / gyro_peak_deg
}
