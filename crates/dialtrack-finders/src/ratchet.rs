//! Discrete ratchet angle finder.
//!
//! Samples a multi-track arc profile on the ratchet dot track, replicated
//! three times end-to-end so peak search never meets a wrap edge. Two
//! device-family algorithms share the sampling: the four-gap multi-dot
//! pattern (injection/manta) and the one/two-dot pattern (mvp/inhouse).

use log::debug;
use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

use dialtrack_calib::{reconstruct_center, DeviceCalibration, DeviceFamily};
use dialtrack_core::{
    circular_mean, forward_gap, get_pixel, local_extrema, moving_average, refine_center,
    sample_arc, signed_delta, windowed_centroid, wrap_deg, Channel, Circle, FrameView, PlaneView,
    Profile, Region,
};

use crate::error::FinderError;
use crate::measure::{AngleFinder, AngleMeasurement};

/// Cumulative pattern angles of the four ratchet dots; consecutive gaps
/// read 45°, 67.5°, 112.5° and 135°.
const DOT_PATTERN: [f32; 4] = [0.0, 45.0, 112.5, 225.0];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RatchetParams {
    /// Angular sampling step along the dot track, degrees.
    pub step_deg: f32,
    pub tracks: usize,
    /// Radial spacing between tracks, pixels.
    pub track_step: f32,
    pub smoothing_half_width: usize,
    /// Dots must rise this far above the local minimum.
    pub noise_threshold: f32,
    /// Half width of the per-dot centroid window, samples.
    pub refine_half_width: usize,
    /// Expected angular gaps between consecutive pattern dots.
    pub expected_gaps: [f32; 4],
    /// A gap matches an expected spacing within this tolerance.
    pub gap_tolerance: f32,
    /// The best match must still be within this tighter bound.
    pub gap_outlier: f32,
    pub forward_tolerance: f32,
    pub backward_tolerance: f32,
    /// Smoothing buffer resets when the raw angle jumps this far.
    pub reset_tolerance: f32,
    pub smoothing_window: usize,
    pub calibration_offset_deg: f32,
    /// Accepted gap bands for the two-dot pattern.
    pub pair_gap_tolerance: f32,
    /// Use satellite light metering instead of the centre sanity check.
    pub photometric: bool,
    pub center_drift_tolerance: f32,
    /// Occluded image zone; dot detections inside it are discarded.
    pub blackout: Option<Region>,
}

impl Default for RatchetParams {
    fn default() -> Self {
        Self {
            step_deg: 0.5,
            tracks: 3,
            track_step: 1.5,
            smoothing_half_width: 2,
            noise_threshold: 60.0,
            refine_half_width: 6,
            expected_gaps: [45.0, 67.5, 112.5, 135.0],
            gap_tolerance: 10.0,
            gap_outlier: 6.0,
            forward_tolerance: 25.0,
            backward_tolerance: 8.0,
            reset_tolerance: 30.0,
            smoothing_window: 8,
            calibration_offset_deg: 0.0,
            pair_gap_tolerance: 12.0,
            photometric: false,
            center_drift_tolerance: 4.0,
            blackout: None,
        }
    }
}

/// Stateful discrete angle finder; one instance per tracking session.
pub struct RatchetAngleFinder {
    params: RatchetParams,
    calibration: Option<DeviceCalibration>,
    /// Last anchored raw angle, recorded even for rejected frames so a
    /// stuck frame cannot cause runaway drift.
    last_raw: Option<f32>,
    window: Vec<f32>,
}

impl RatchetAngleFinder {
    pub fn new(params: RatchetParams) -> Self {
        Self {
            params,
            calibration: None,
            last_raw: None,
            window: Vec::new(),
        }
    }

    #[inline]
    pub fn params(&self) -> &RatchetParams {
        &self.params
    }

    fn find_multi_dot(
        &mut self,
        luma: &PlaneView<'_>,
        circle: &Circle,
        calib: &DeviceCalibration,
    ) -> Result<AngleMeasurement, FinderError> {
        let (profile, mut values) = self.sample_track(luma, circle);

        if let Some(points) = calib.satellite_points() {
            if self.params.photometric {
                let gains = photometric_gains(luma, points, circle.center, &profile.points)?;
                for (v, g) in values.iter_mut().zip(&gains) {
                    if *v > 0.0 {
                        *v /= g;
                    }
                }
            } else {
                self.check_center_drift(luma, points, circle)?;
            }
        }

        let dots = self.detect_dots(&profile, &values)?;
        let count = dots.len();
        match count {
            0 => return Err(FinderError::NoDots),
            1 => return Err(FinderError::SingleDot),
            2..=4 => {}
            _ => return Err(FinderError::TooManyDots { count }),
        }

        // anchor an absolute angle from the best-matching pairwise gap
        let mut best: Option<(f32, f32)> = None;
        for (i, &a) in dots.iter().enumerate() {
            let b = dots[(i + 1) % count];
            let gap = forward_gap(a, b);
            for (j, &expected) in self.params.expected_gaps.iter().enumerate() {
                let deviation = (gap - expected).abs();
                if deviation <= self.params.gap_tolerance
                    && best.map(|(d, _)| deviation < d).unwrap_or(true)
                {
                    best = Some((deviation, wrap_deg(a - DOT_PATTERN[j])));
                }
            }
        }
        let (deviation, raw) = best.ok_or(FinderError::NoGapMatch)?;
        if deviation > self.params.gap_outlier {
            return Err(FinderError::GapOutlier { deviation });
        }

        self.accept(raw, count)
    }

    fn find_few_dot(
        &mut self,
        luma: &PlaneView<'_>,
        circle: &Circle,
    ) -> Result<AngleMeasurement, FinderError> {
        let (profile, values) = self.sample_track(luma, circle);
        let dots = self.detect_dots(&profile, &values)?;

        let raw = match dots.len() {
            0 => return Err(FinderError::NoDots),
            1 => {
                // single dot: the pattern mate is 90° away, so the wheel
                // angle sits a fixed 45° off, toward the missing mate
                let a = dots[0];
                if a < 180.0 {
                    wrap_deg(a + 45.0)
                } else {
                    wrap_deg(a - 45.0)
                }
            }
            2 => {
                let gap = forward_gap(dots[0], dots[1]);
                if (gap - 90.0).abs() <= self.params.pair_gap_tolerance {
                    wrap_deg(dots[0] + 0.5 * gap)
                } else if (gap - 270.0).abs() <= self.params.pair_gap_tolerance {
                    wrap_deg(dots[1] + 0.5 * (360.0 - gap))
                } else {
                    return Err(FinderError::DotPairMismatch { gap });
                }
            }
            count => return Err(FinderError::TooManyDots { count }),
        };

        let angle = wrap_deg(-(raw + self.params.calibration_offset_deg));
        Ok(AngleMeasurement {
            angle_deg: angle,
            raw_deg: raw,
            dots: dots.len(),
        })
    }

    /// Arc profile on the dot track plus its tripled raw values.
    fn sample_track(&self, luma: &PlaneView<'_>, circle: &Circle) -> (Profile, Vec<f32>) {
        let n = (360.0 / self.params.step_deg).round() as usize;
        let profile = sample_arc(
            luma,
            circle.center,
            circle.radius,
            0.0,
            360.0 - self.params.step_deg,
            n,
            self.params.tracks,
            self.params.track_step,
        );
        let mut tripled = Vec::with_capacity(3 * profile.len());
        for _ in 0..3 {
            tripled.extend_from_slice(&profile.values);
        }
        (profile, tripled)
    }

    /// Smooth the tripled profile, pick maxima away from the replica ends,
    /// refine each by windowed centroid, fold back into one turn and apply
    /// the blackout filter. Returns sorted dot angles in `[0, 360)`.
    ///
    /// Every physical dot shows up in exactly two replicas of the window,
    /// so the wrap-aware dedup below always keeps one detection per dot and
    /// a dot sitting right on the 0°/360° seam is never lost.
    fn detect_dots(&self, profile: &Profile, values: &[f32]) -> Result<Vec<f32>, FinderError> {
        let n = profile.len();
        if n == 0 {
            return Err(FinderError::NoDots);
        }
        let smoothed = moving_average(values, self.params.smoothing_half_width, 1);
        let extrema = local_extrema(&smoothed, self.params.noise_threshold);

        let mut dots = Vec::new();
        for &idx in &extrema.maxima {
            if idx < n / 2 || idx >= 5 * n / 2 || smoothed[idx] < self.params.noise_threshold {
                continue;
            }
            let Some(refined) = windowed_centroid(&smoothed, idx, self.params.refine_half_width)
            else {
                continue;
            };
            let mid = refined.rem_euclid(n as f32);
            if let Some(blackout) = self.params.blackout {
                if let Some(pos) = profile.point_at(mid) {
                    if blackout.contains(pos) {
                        debug!("dot at {:.1} deg inside blackout zone", mid * self.params.step_deg);
                        continue;
                    }
                }
            }
            dots.push(wrap_deg(mid * self.params.step_deg));
        }
        dots.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        dots.dedup_by(|a, b| (*a - *b).abs() < 1.0);
        if dots.len() >= 2 {
            let first = dots[0];
            let last = dots[dots.len() - 1];
            if 360.0 - (last - first) < 1.0 {
                dots.pop();
            }
        }
        Ok(dots)
    }

    fn check_center_drift(
        &self,
        luma: &PlaneView<'_>,
        points: [Point2<f32>; 2],
        circle: &Circle,
    ) -> Result<(), FinderError> {
        let d0 = refine_center(luma, points[0], 4, 2, 0).ok_or(FinderError::LightMeterFailed)?;
        let d1 = refine_center(luma, points[1], 4, 2, 0).ok_or(FinderError::LightMeterFailed)?;
        let reconstructed = reconstruct_center(d0, d1);
        let deviation = (reconstructed - circle.center).norm();
        if deviation > self.params.center_drift_tolerance {
            return Err(FinderError::CenterDrifted { deviation });
        }
        Ok(())
    }

    /// Jump rejection, smoothing, offset, direction inversion.
    fn accept(&mut self, raw: f32, dots: usize) -> Result<AngleMeasurement, FinderError> {
        let last = self.last_raw;
        // record even when rejecting, so drift cannot accumulate
        self.last_raw = Some(raw);
        if let Some(last) = last {
            let delta = signed_delta(last, raw);
            if delta > self.params.forward_tolerance {
                return Err(FinderError::TooMuchMotion { delta });
            }
            if delta < -self.params.backward_tolerance {
                return Err(FinderError::BackwardMotion { delta });
            }
        }

        if let Some(mean) = circular_mean(&self.window) {
            if signed_delta(mean, raw).abs() > self.params.reset_tolerance {
                self.window.clear();
            }
        }
        self.window.push(raw);
        if self.window.len() > self.params.smoothing_window {
            self.window.remove(0);
        }
        let smoothed = circular_mean(&self.window).unwrap_or(raw);

        let angle = wrap_deg(-(smoothed + self.params.calibration_offset_deg));
        Ok(AngleMeasurement {
            angle_deg: angle,
            raw_deg: raw,
            dots,
        })
    }
}

impl AngleFinder for RatchetAngleFinder {
    fn configure(&mut self, calibration: &DeviceCalibration) {
        self.calibration = Some(calibration.clone());
        self.last_raw = None;
        self.window.clear();
    }

    fn find(&mut self, frame: &FrameView<'_>) -> Result<AngleMeasurement, FinderError> {
        let calib = self
            .calibration
            .clone()
            .ok_or(FinderError::NotConfigured)?;
        let circle = calib.ratchet.ok_or(FinderError::NotConfigured)?;
        let luma = frame.plane(Channel::Luma);

        match calib.family {
            DeviceFamily::Injection | DeviceFamily::Manta => {
                self.find_multi_dot(&luma, &circle, &calib)
            }
            DeviceFamily::Mvp | DeviceFamily::Inhouse => self.find_few_dot(&luma, &circle),
            family @ DeviceFamily::Legacy => Err(FinderError::DeviceNotSupported(family)),
        }
    }
}

/// Average intensity of a 5×5 patch; `None` near the frame border.
fn meter(plane: &PlaneView<'_>, p: Point2<f32>) -> Option<f32> {
    let x = p.x.round() as i32;
    let y = p.y.round() as i32;
    if x < 2 || y < 2 || x + 2 >= plane.width as i32 || y + 2 >= plane.height as i32 {
        return None;
    }
    let mut sum = 0u32;
    for dy in -2..=2 {
        for dx in -2..=2 {
            sum += get_pixel(plane, x + dx, y + dy) as u32;
        }
    }
    Some(sum as f32 / 25.0)
}

/// Fit an intensity plane through the two metered satellite points plus a
/// synthetic third point at the wheel centre, then express every profile
/// point as a gain against the plane mean.
fn photometric_gains(
    luma: &PlaneView<'_>,
    satellites: [Point2<f32>; 2],
    center: Point2<f32>,
    points: &[Point2<f32>],
) -> Result<Vec<f32>, FinderError> {
    let v0 = meter(luma, satellites[0]).ok_or(FinderError::LightMeterFailed)?;
    let v1 = meter(luma, satellites[1]).ok_or(FinderError::LightMeterFailed)?;
    let v2 = 0.5 * (v0 + v1);

    let m = Matrix3::new(
        satellites[0].x,
        satellites[0].y,
        1.0,
        satellites[1].x,
        satellites[1].y,
        1.0,
        center.x,
        center.y,
        1.0,
    );
    let sol = m
        .lu()
        .solve(&Vector3::new(v0, v1, v2))
        .ok_or(FinderError::LightMeterFailed)?;

    let mean = (v0 + v1 + v2) / 3.0;
    if mean <= f32::EPSILON {
        return Err(FinderError::LightMeterFailed);
    }

    let mut gains = Vec::with_capacity(3 * points.len());
    for _ in 0..3 {
        for p in points {
            let plane_v = sol.x * p.x + sol.y * p.y + sol.z;
            let g = plane_v / mean;
            gains.push(if g.abs() < 0.1 { 1.0 } else { g });
        }
    }
    Ok(gains)
}
