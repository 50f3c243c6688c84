//! Diagnostic artifacts for one certification run: rotation-series plot data
//! per quality, a textual report for each failing quality, and the JSON run
//! summary. Frame images themselves are written by the frame-extraction
//! collaborator; on a pass this module deletes them, on a fail it leaves
//! them in place for inspection.

use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::types::{AngleSeries, VideoQuality};
use crate::verdict::{QualityVerdict, RunReport};

pub struct ArtifactWriter {
    out_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        Ok(Self { out_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.out_dir
    }

    /// CSV plot data for one angle series, e.g. `720P_camera_rotations.csv`.
    pub fn write_rotation_series(
        &self,
        quality: VideoQuality,
        signal: &str,
        series: &AngleSeries,
    ) -> io::Result<PathBuf> {
        let path = self
            .out_dir
            .join(format!("{}_{}_rotations.csv", quality.label(), signal));
        let mut body = String::from("offset_secs,angle_deg\n");
        for p in series.points() {
            body.push_str(&format!("{:.6},{:.6}\n", p.offset_secs, p.angle_deg));
        }
        fs::write(&path, body)?;
        log::debug!("wrote {} points to {}", series.len(), path.display());
        Ok(path)
    }

    pub fn write_failure_report(&self, verdict: &QualityVerdict) -> io::Result<PathBuf> {
        let path = self
            .out_dir
            .join(format!("{}_failure.txt", verdict.quality.label()));
        let body = format!(
            "{} video not stabilized enough!\n\
             max camera angle: {:.3} deg\n\
             max gyro angle:   {:.3} deg\n\
             ratio:            {:.4}\n\
             threshold factor: {:.2} (wide-aspect adjusted: {})\n",
            verdict.quality.label(),
            verdict.camera_peak_deg,
            verdict.gyro_peak_deg,
            verdict.ratio,
            verdict.threshold_factor,
            verdict.wide_aspect_adjusted,
        );
        fs::write(&path, body)?;
        Ok(path)
    }

    pub fn write_run_report(&self, report: &RunReport) -> io::Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self.out_dir.join(format!("run_report_{stamp}.json"));
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Delete the frame images preserved for this quality. Called on a pass,
    /// where the frames carry no diagnostic value.
    pub fn remove_preserved_frames(&self, quality: VideoQuality) -> io::Result<usize> {
        let prefix = format!("{}_frame_", quality.label());
        let mut removed = 0;
        for entry in fs::read_dir(&self.out_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(".png") {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        if removed > 0 {
            log::debug!("removed {removed} preserved frames for {}", quality.label());
        }
        Ok(removed)
    }
}
