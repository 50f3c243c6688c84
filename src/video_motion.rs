//! Vision half of the motion-correlation core.
//!
//! Every retained frame gets one rotation-angle estimate relative to the
//! first retained frame (the reference). Two laterally separated patches are
//! cut from the reference; for each later frame, each patch is relocated by
//! exhaustive normalized-cross-correlation search, and the differential
//! vertical displacement of the two patches gives the roll angle about the
//! optical axis.
//!
//! The recording's frame rate is an explicit input; frame timestamps are
//! derived from sequence position and never inferred from the container.

use ndarray::{s, Array2, ArrayView2};

use crate::config::RigConfig;
use crate::error::{Result, RigError};
use crate::types::{AngleSeries, Frame, LensFacing};

pub struct VideoMotionExtractor {
    patch_fraction: f64,
    search_radius: usize,
    min_patch_stddev: f64,
}

struct PatchSite {
    cy: usize,
    cx: usize,
    half: usize,
}

impl VideoMotionExtractor {
    pub fn new(config: &RigConfig) -> Self {
        Self {
            patch_fraction: config.patch_fraction,
            search_radius: config.search_radius_px,
            min_patch_stddev: config.min_patch_stddev,
        }
    }

    /// Estimate per-frame rotation angles for everything after the warm-up
    /// cutoff. Offsets are seconds from recording start (`index / fps`).
    pub fn estimate(
        &self,
        frames: &[Frame],
        warm_up_count: usize,
        fps: f64,
        facing: LensFacing,
    ) -> Result<AngleSeries> {
        let usable = frames.get(warm_up_count..).unwrap_or(&[]);
        if usable.len() < 2 {
            return Err(RigError::InsufficientFrames {
                available: usable.len(),
                warm_up: warm_up_count,
            });
        }

        let reference = &usable[0];
        let (left, right) = self.patch_sites(reference)?;
        let ref_left = patch_view(&reference.luma, &left, 0, 0);
        let ref_right = patch_view(&reference.luma, &right, 0, 0);

        // Flat patches match everywhere equally; refuse to correlate them.
        if patch_stddev(&ref_left) < self.min_patch_stddev
            || patch_stddev(&ref_right) < self.min_patch_stddev
        {
            return Err(RigError::NoCorrelatableContent);
        }

        // Front cameras mirror the scene, which flips the apparent rotation.
        let sign = if facing == LensFacing::Front { -1.0 } else { 1.0 };
        let baseline_px = (right.cx - left.cx) as f64;

        let mut series = AngleSeries::new();
        series.push(reference.index as f64 / fps, 0.0);

        for frame in &usable[1..] {
            let dy_left = best_vertical_shift(&ref_left, &frame.luma, &left, self.search_radius);
            let dy_right = best_vertical_shift(&ref_right, &frame.luma, &right, self.search_radius);
            let angle_rad = (dy_right - dy_left).atan2(baseline_px);
            series.push(frame.index as f64 / fps, sign * angle_rad.to_degrees());
        }

        log::debug!(
            "estimated {} camera rotation samples ({} warm-up frames discarded)",
            series.len(),
            warm_up_count
        );
        Ok(series)
    }

    fn patch_sites(&self, reference: &Frame) -> Result<(PatchSite, PatchSite)> {
        let h = reference.height();
        let w = reference.width();
        let half = ((h as f64 * self.patch_fraction) as usize).max(4);
        let margin = half + self.search_radius;

        let cy = h / 2;
        let cx_left = w / 4;
        let cx_right = 3 * w / 4;

        // The search window around either patch must stay inside the frame.
        if cy < margin || cy + margin > h || cx_left < margin || cx_right + margin > w {
            return Err(RigError::NoCorrelatableContent);
        }

        Ok((
            PatchSite { cy, cx: cx_left, half },
            PatchSite { cy, cx: cx_right, half },
        ))
    }
}

fn patch_view<'a>(
    luma: &'a Array2<f64>,
    site: &PatchSite,
    dy: isize,
    dx: isize,
) -> ArrayView2<'a, f64> {
    let y = (site.cy as isize + dy) as usize;
    let x = (site.cx as isize + dx) as usize;
    luma.slice(s![y - site.half..y + site.half, x - site.half..x + site.half])
}

fn patch_stddev(view: &ArrayView2<f64>) -> f64 {
    let n = view.len() as f64;
    let mean = view.sum() / n;
    let var = view.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    var.sqrt()
}

fn ncc(a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom < 1e-12 {
        return 0.0;
    }
    cov / denom
}

/// Locate the reference patch inside `frame` by exhaustive NCC search over a
/// square displacement window; returns the vertical displacement of the best
/// match in pixels.
fn best_vertical_shift(
    reference: &ArrayView2<f64>,
    frame: &Array2<f64>,
    site: &PatchSite,
    radius: usize,
) -> f64 {
    let r = radius as isize;
    let mut best_score = f64::NEG_INFINITY;
    let mut best_dy = 0.0;
    for dy in -r..=r {
        for dx in -r..=r {
            let candidate = patch_view(frame, site, dy, dx);
            let score = ncc(reference, &candidate);
            if score > best_score {
                best_score = score;
                best_dy = dy as f64;
            }
        }
    }
    best_dy
}
