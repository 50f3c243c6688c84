//! Gyroscope integration into cumulative rotation angle.
//!
//! Samples are not uniformly spaced; every interval is computed from the
//! actual timestamp pair. The output is re-zeroed so that offset 0 is the
//! moment the camera recording began, not the moment sensor streaming began.
//! Comparing series without that shift silently invalidates the whole test.

use crate::types::{AngleSeries, Axis, SensorKind, SensorSample};

pub struct GyroIntegrator {
    axis: Axis,
}

impl GyroIntegrator {
    pub fn new(axis: Axis) -> Self {
        Self { axis }
    }

    /// Trapezoidal integration of angular velocity (rad/s) over the gyro
    /// samples in `samples`, shifted so the recording start (sensor stream
    /// start plus `start_delay_secs`) lands at offset 0, with pre-recording
    /// points dropped.
    pub fn integrate(&self, samples: &[SensorSample], start_delay_secs: f64) -> AngleSeries {
        let gyro: Vec<&SensorSample> = samples
            .iter()
            .filter(|s| s.kind == SensorKind::Gyro)
            .collect();

        let mut series = AngleSeries::new();
        let first = match gyro.first() {
            Some(s) => *s,
            None => return series,
        };

        let t0 = first.timestamp_secs();
        let mut cumulative_rad = 0.0;
        series.push(0.0, 0.0);

        for pair in gyro.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            let dt = cur.timestamp_secs() - prev.timestamp_secs();
            let w_prev = self.axis.component(&prev.axis);
            let w_cur = self.axis.component(&cur.axis);
            cumulative_rad += 0.5 * (w_prev + w_cur) * dt;
            series.push(cur.timestamp_secs() - t0, cumulative_rad.to_degrees());
        }

        series.shifted(-start_delay_secs).trimmed_to_start()
    }
}
