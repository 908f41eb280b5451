use log::{debug, info, warn};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use dialtrack_barcode::{decode, BarcodeConfig};
use dialtrack_circle::{bubble_fit, BubbleFitParams};
use dialtrack_core::{
    center_of_mass, local_extrema, moving_average, project, refine_center, sample_segment,
    single_pole_highpass, stretch_min_max, stretch_percentile, Axis, Channel, Circle, FrameView,
    PlaneView, Reducer, Region,
};

use crate::calibration::DeviceCalibration;
use crate::device::DeviceGeometry;
use crate::error::CalibError;
use crate::satellite::reconstruct_center;

/// Tunables of the static calibration locator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocatorParams {
    pub barcode: BarcodeConfig,
    pub bubble: BubbleFitParams,
    /// How many projection bump columns to try, best first.
    pub column_candidates: usize,
    /// Bump amplitude on the high-passed column projection.
    pub column_bump_amplitude: f32,
    /// Pole of the projection high-pass filter.
    pub highpass_pole: f32,
    /// Bump amplitude for strip dots and top markers.
    pub dot_amplitude: f32,
    /// Intensity floor for centroid refinement.
    pub dot_floor: u8,
    pub refine_half_width: i32,
    pub refine_iterations: usize,
    /// Horizontal inset and vertical extent of the slider region, pixels.
    pub slider_inset: i32,
    pub slider_half_height: i32,
    /// Half width of the calibration strip region.
    pub strip_half_width: i32,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            barcode: BarcodeConfig::default(),
            bubble: BubbleFitParams::default(),
            column_candidates: 5,
            column_bump_amplitude: 4.0,
            highpass_pole: 0.9,
            dot_amplitude: 60.0,
            dot_floor: 40,
            refine_half_width: 4,
            refine_iterations: 3,
            slider_inset: 8,
            slider_half_height: 8,
            strip_half_width: 6,
        }
    }
}

/// One-shot locator for the static device geometry.
pub struct CalibrationLocator {
    geometry: DeviceGeometry,
    params: LocatorParams,
}

struct StripScan {
    column: i32,
    dots: Vec<Point2<f32>>,
    device_id: u32,
}

impl CalibrationLocator {
    pub fn new(geometry: DeviceGeometry) -> Self {
        Self {
            geometry,
            params: LocatorParams::default(),
        }
    }

    pub fn with_params(mut self, params: LocatorParams) -> Self {
        self.params = params;
        self
    }

    #[inline]
    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    /// Run all stages; the calibration is returned only when complete.
    pub fn locate(&self, frame: &FrameView<'_>) -> Result<DeviceCalibration, CalibError> {
        let (calib, result) = self.locate_partial(frame);
        result.map(|_| calib)
    }

    /// Run all stages, returning whatever was located before the first
    /// failure. `completed` is set only when every stage succeeded.
    pub fn locate_partial(
        &self,
        frame: &FrameView<'_>,
    ) -> (DeviceCalibration, Result<(), CalibError>) {
        let mut calib = DeviceCalibration::new(self.geometry.family);
        let result = self.run(frame, &mut calib);
        match &result {
            Ok(()) => {
                calib.completed = true;
                info!(
                    "calibration complete: device id {:?}, {:.2} px/mm",
                    calib.device_id, calib.px_per_mm.unwrap_or(0.0)
                );
            }
            Err(e) => warn!("calibration aborted: {e}"),
        }
        (calib, result)
    }

    fn run(&self, frame: &FrameView<'_>, calib: &mut DeviceCalibration) -> Result<(), CalibError> {
        // stage 1: plane normalization; the red channel gets a percentile
        // clip to suppress saturated outliers
        let luma = stretch_min_max(&frame.plane(Channel::Luma));
        let _blue = stretch_min_max(&frame.plane(Channel::ChromaBlue));
        let red = stretch_percentile(&frame.plane(Channel::ChromaRed), 0.02, 0.98);
        let luma = luma.view();
        let red = red.view();

        // stage 2: calibration strip, device id, pixel scale
        let scan = self.locate_strip(&luma)?;
        let (top, bottom) = (scan.dots[0], scan.dots[scan.dots.len() - 1]);
        calib.calibration_box = Some(
            Region::new(
                scan.column - self.params.strip_half_width,
                top.y as i32 - self.params.refine_half_width,
                scan.column + self.params.strip_half_width + 1,
                bottom.y as i32 + self.params.refine_half_width + 1,
            )
            .clip(luma.width, luma.height),
        );
        calib.device_id = Some(scan.device_id);
        let spacing = (scan.dots[1].y - scan.dots[0].y).abs();
        if spacing <= f32::EPSILON {
            return Err(CalibError::DotSpacingDegenerate);
        }
        calib.px_per_mm = Some(spacing / self.geometry.dot_spacing_mm);
        debug!(
            "strip at column {}, id {}, {:.2} px/mm",
            scan.column,
            scan.device_id,
            spacing / self.geometry.dot_spacing_mm
        );

        // stage 3: ratchet reference circle on the red channel
        let ratchet = self.locate_ratchet(&red)?;
        calib.ratchet = Some(ratchet);

        // stage 4: three top markers relative to the ratchet ring
        let markers = self.locate_top_markers(&luma, &ratchet)?;
        calib.top_markers = markers.to_vec();

        // stage 5: scrolly reference circle from marker 3
        let scrolly_center = refine_center(
            &luma,
            markers[2],
            self.params.refine_half_width,
            self.params.refine_iterations,
            self.params.dot_floor,
        )
        .ok_or(CalibError::ScrollyRefineFailed)?;
        calib.scrolly = Some(Circle::new(
            scrolly_center,
            self.geometry.scrolly_radius,
            self.geometry.scrolly_thickness,
        ));

        // stage 6: slider region spanned by markers 1 and 2
        let slider_region = self.locate_slider_region(&luma, markers[0], markers[1])?;
        calib.slider_region = Some(slider_region);

        // stage 7: initial slider dot
        let slider_start = self.locate_slider_start(&luma, slider_region)?;
        calib.slider_start = Some(slider_start);

        // stage 8: signed slider/ratchet offset
        calib.slider_ratchet_offset = Some(slider_start.x - ratchet.center.x);

        // stage 9: satellite reference dots (injection devices)
        if let Some(angles) = self.geometry.satellite_angles_deg {
            let offsets = self.locate_satellites(&luma, &ratchet, angles)?;
            calib.satellite_offsets = Some(offsets);
        }

        Ok(())
    }

    /// Reversed, summed, weight-normalized column projection; high-pass;
    /// then try the strongest bump columns until one carries both a valid
    /// barcode and the device-appropriate dot count.
    fn locate_strip(&self, luma: &PlaneView<'_>) -> Result<StripScan, CalibError> {
        let full = Region::new(0, 0, luma.width as i32, luma.height as i32);
        let mut projection = project(luma, full, Axis::Horizontal, Reducer::Sum);
        for v in &mut projection {
            *v /= luma.height as f32;
        }
        projection.reverse();
        let filtered = single_pole_highpass(&projection, self.params.highpass_pole);
        let extrema = local_extrema(&filtered, self.params.column_bump_amplitude);
        if extrema.maxima.is_empty() {
            return Err(CalibError::NoColumnCandidates);
        }

        let mut candidates = extrema.maxima;
        candidates.sort_by(|a, b| {
            filtered[*b]
                .partial_cmp(&filtered[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let tried = candidates.len().min(self.params.column_candidates);
        let mut first_err = CalibError::ColumnScanExhausted { tried };
        let mut have_err = false;
        for &bump in candidates.iter().take(self.params.column_candidates) {
            let column = (projection.len() - 1 - bump) as i32;
            match self.scan_strip_column(luma, column) {
                Ok(scan) => return Ok(scan),
                Err(e) => {
                    debug!("strip candidate column {column} rejected: {e}");
                    // report the failure of the best-ranked candidate
                    if !have_err {
                        first_err = e;
                        have_err = true;
                    }
                }
            }
        }
        Err(first_err)
    }

    /// One strip attempt: barcode on the lower half of the column, dot scan
    /// with iterative centre refinement on the upper half.
    fn scan_strip_column(
        &self,
        luma: &PlaneView<'_>,
        column: i32,
    ) -> Result<StripScan, CalibError> {
        let h = luma.height as i32;
        let x = column as f32;

        let code_profile = sample_segment(
            luma,
            Point2::new(x, (h / 2) as f32),
            Point2::new(x, (h - 1) as f32),
            (h - h / 2) as usize,
        );
        let device_id = decode(&code_profile.values, &self.params.barcode)?;

        let dot_profile = sample_segment(
            luma,
            Point2::new(x, 0.0),
            Point2::new(x, (h / 2 - 1) as f32),
            (h / 2) as usize,
        );
        let smoothed = moving_average(&dot_profile.values, 2, 1);
        let extrema = local_extrema(&smoothed, self.params.dot_amplitude);

        let mut dots = Vec::new();
        for &idx in &extrema.maxima {
            let Some(seed) = dot_profile.point_at(idx as f32) else {
                continue;
            };
            if let Some(dot) = refine_center(
                luma,
                seed,
                self.params.refine_half_width,
                self.params.refine_iterations,
                self.params.dot_floor,
            ) {
                dots.push(dot);
            }
        }
        dots.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal));
        dots.dedup_by(|a, b| (a.y - b.y).abs() < 2.0);

        let found = dots.len();
        if found < self.geometry.min_calibration_dots || found > self.geometry.max_calibration_dots
        {
            return Err(CalibError::DotCountMismatch {
                found,
                min: self.geometry.min_calibration_dots,
                max: self.geometry.max_calibration_dots,
            });
        }

        Ok(StripScan {
            column,
            dots,
            device_id,
        })
    }

    fn locate_ratchet(&self, red: &PlaneView<'_>) -> Result<Circle, CalibError> {
        let [fl, ft, fr, fb] = self.geometry.ratchet_search;
        let search = Region::new(
            (fl * red.width as f32) as i32,
            (ft * red.height as f32) as i32,
            (fr * red.width as f32) as i32,
            (fb * red.height as f32) as i32,
        )
        .clip(red.width, red.height);

        let seed = center_of_mass(red, search, self.params.dot_floor)
            .ok_or(CalibError::RatchetSeedNotFound)?;
        let (center, radius) = bubble_fit(red, seed, &self.params.bubble)?;
        debug!(
            "ratchet ring at ({:.1}, {:.1}), fitted r={radius:.1}",
            center.x, center.y
        );
        Ok(Circle::new(
            center,
            radius + self.geometry.ratchet_radius_offset,
            self.geometry.ratchet_thickness,
        ))
    }

    /// Horizontal-projection bump search in a band above the ratchet ring,
    /// then per-marker vertical centre-of-mass refinement.
    fn locate_top_markers(
        &self,
        luma: &PlaneView<'_>,
        ratchet: &Circle,
    ) -> Result<[Point2<f32>; 3], CalibError> {
        let top = ratchet.center.y - ratchet.radius - self.geometry.marker_band_offset;
        let band = Region::new(
            (ratchet.center.x - 2.2 * ratchet.radius) as i32,
            (top - self.geometry.marker_band_height as f32) as i32,
            (ratchet.center.x + 2.5 * ratchet.radius) as i32,
            top as i32,
        )
        .clip(luma.width, luma.height);
        if band.is_empty() {
            return Err(CalibError::TopMarkersNotFound { found: 0 });
        }

        let projection = project(luma, band, Axis::Horizontal, Reducer::Max);
        let smoothed = moving_average(&projection, 2, 1);
        let extrema = local_extrema(&smoothed, self.params.dot_amplitude);
        if extrema.maxima.len() < 3 {
            return Err(CalibError::TopMarkersNotFound {
                found: extrema.maxima.len(),
            });
        }

        // three strongest bumps, restored to left-to-right order
        let mut bumps = extrema.maxima;
        bumps.sort_by(|a, b| {
            smoothed[*b]
                .partial_cmp(&smoothed[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        bumps.truncate(3);
        bumps.sort_unstable();

        let mut markers = [Point2::origin(); 3];
        for (i, &bump) in bumps.iter().enumerate() {
            let x = band.left + bump as i32;
            let line = Region::new(x - 2, band.top, x + 3, band.bottom);
            let marker = center_of_mass(luma, line, self.params.dot_floor)
                .ok_or(CalibError::MarkerRefineFailed { index: i })?;
            markers[i] = marker;
        }
        Ok(markers)
    }

    fn locate_slider_region(
        &self,
        luma: &PlaneView<'_>,
        left_marker: Point2<f32>,
        right_marker: Point2<f32>,
    ) -> Result<Region, CalibError> {
        let left = refine_center(
            luma,
            left_marker,
            self.params.refine_half_width,
            self.params.refine_iterations,
            self.params.dot_floor,
        )
        .ok_or(CalibError::MarkerRefineFailed { index: 0 })?;
        let right = refine_center(
            luma,
            right_marker,
            self.params.refine_half_width,
            self.params.refine_iterations,
            self.params.dot_floor,
        )
        .ok_or(CalibError::MarkerRefineFailed { index: 1 })?;

        let y = 0.5 * (left.y + right.y);
        let region = Region::new(
            left.x as i32 + self.params.slider_inset,
            y as i32 - self.params.slider_half_height,
            right.x as i32 - self.params.slider_inset + 1,
            y as i32 + self.params.slider_half_height + 1,
        )
        .clip(luma.width, luma.height);
        if region.is_empty() || region.width() < 4 * self.params.slider_inset {
            return Err(CalibError::SliderRegionInvalid);
        }

        // the strip must actually contain a bright feature
        let projection = project(luma, region, Axis::Horizontal, Reducer::Max);
        let smoothed = moving_average(&projection, 2, 1);
        let extrema = local_extrema(&smoothed, self.params.dot_amplitude);
        if extrema.maxima.is_empty() {
            return Err(CalibError::SliderBrightnessMissing);
        }

        Ok(region)
    }

    /// Threshold + centre-of-mass, then two refinement passes.
    fn locate_slider_start(
        &self,
        luma: &PlaneView<'_>,
        region: Region,
    ) -> Result<Point2<f32>, CalibError> {
        let seed = center_of_mass(luma, region, self.params.dot_floor)
            .ok_or(CalibError::SliderDotNotFound)?;
        refine_center(luma, seed, self.params.refine_half_width, 2, self.params.dot_floor)
            .ok_or(CalibError::SliderDotNotFound)
    }

    /// Scan two fixed-angle rays outward from the ratchet ring, refine each
    /// peak, then cross-validate via the reconstructed theoretical centre.
    fn locate_satellites(
        &self,
        luma: &PlaneView<'_>,
        ratchet: &Circle,
        angles: [f32; 2],
    ) -> Result<[Vector2<f32>; 2], CalibError> {
        let mut dots = [Point2::origin(); 2];
        for (i, angle) in angles.iter().enumerate() {
            let (sin_a, cos_a) = angle.to_radians().sin_cos();
            let dir = Vector2::new(cos_a, sin_a);
            let from = ratchet.center + dir * (ratchet.radius + 2.0);
            let to = ratchet.center + dir * (ratchet.radius + 2.0 * self.geometry.satellite_reach);
            let samples = ((2.0 * self.geometry.satellite_reach) as usize).max(8);
            let ray = sample_segment(luma, from, to, samples);

            let peak = ray
                .values
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx)
                .ok_or(CalibError::SatelliteDotMissing { index: i })?;
            if ray.values[peak] < self.params.dot_floor as f32 {
                return Err(CalibError::SatelliteDotMissing { index: i });
            }
            let seed = ray
                .point_at(peak as f32)
                .ok_or(CalibError::SatelliteDotMissing { index: i })?;
            dots[i] = refine_center(
                luma,
                seed,
                self.params.refine_half_width,
                self.params.refine_iterations,
                self.params.dot_floor,
            )
            .ok_or(CalibError::SatelliteDotMissing { index: i })?;
        }

        let reconstructed = reconstruct_center(dots[0], dots[1]);
        let deviation = (reconstructed - ratchet.center).norm();
        if deviation > self.geometry.satellite_center_tolerance {
            return Err(CalibError::SatelliteCenterMismatch { deviation });
        }

        Ok([dots[0] - ratchet.center, dots[1] - ratchet.center])
    }
}
