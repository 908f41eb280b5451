//! Linear slider position finder.
//!
//! Samples a multi-track straight profile across the calibrated slider
//! region and takes a windowed centre-of-mass around the previous frame's
//! peak. Total strip energy gates the measurement before any geometry is
//! attempted.

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use dialtrack_calib::DeviceCalibration;
use dialtrack_core::{moving_average, sample_multitrack, Channel, FrameView, Profile};

use crate::error::FinderError;
use crate::measure::SliderMeasurement;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SliderParams {
    pub tracks: usize,
    pub track_step: f32,
    pub smoothing_half_width: usize,
    /// Minimum total strip energy; below it the frame is too dark to trust.
    pub energy_threshold: f32,
    /// Half width of the centre-of-mass window around the last peak.
    pub com_half_width: usize,
    /// Subtract a heavily smoothed baseline before the peak search.
    pub flat_field: bool,
}

impl Default for SliderParams {
    fn default() -> Self {
        Self {
            tracks: 3,
            track_step: 1.5,
            smoothing_half_width: 2,
            energy_threshold: 500.0,
            com_half_width: 15,
            flat_field: false,
        }
    }
}

/// Stateful slider finder; one instance per tracking session.
pub struct SliderFinder {
    params: SliderParams,
    calibration: Option<DeviceCalibration>,
    /// Peak sample index of the previous frame.
    last_peak: Option<usize>,
}

impl SliderFinder {
    pub fn new(params: SliderParams) -> Self {
        Self {
            params,
            calibration: None,
            last_peak: None,
        }
    }

    #[inline]
    pub fn params(&self) -> &SliderParams {
        &self.params
    }

    /// Attach a calibration and reset the peak memory to the
    /// calibration-time slider position.
    pub fn configure(&mut self, calibration: &DeviceCalibration) {
        self.last_peak = calibration
            .slider_region
            .zip(calibration.slider_start)
            .map(|(region, start)| (start.x - region.left as f32).max(0.0).round() as usize);
        self.calibration = Some(calibration.clone());
    }

    /// Process one frame, updating the finder state exactly once.
    pub fn find(&mut self, frame: &FrameView<'_>) -> Result<SliderMeasurement, FinderError> {
        let calib = self.calibration.as_ref().ok_or(FinderError::NotConfigured)?;
        let region = calib.slider_region.ok_or(FinderError::NotConfigured)?;
        let luma = frame.plane(Channel::Luma);

        let samples = region.width().max(2) as usize;
        let y = 0.5 * (region.top + region.bottom) as f32;
        let raw = sample_multitrack(
            &luma,
            Point2::new(region.left as f32, y),
            Point2::new((region.right - 1) as f32, y),
            samples,
            self.params.tracks,
            self.params.track_step,
        );

        let mut values = moving_average(&raw.values, self.params.smoothing_half_width, 1);
        if self.params.flat_field {
            let baseline = moving_average(&values, samples / 4, 1);
            for (v, b) in values.iter_mut().zip(&baseline) {
                *v = (*v - b).max(0.0);
            }
        }
        let profile = Profile {
            values,
            points: raw.points,
        };

        let energy = profile.energy();
        if energy < self.params.energy_threshold {
            return Err(FinderError::NotEnoughLight { energy });
        }

        let anchor = self.last_peak.unwrap_or(samples / 2);
        let com = profile
            .windowed_com(anchor, self.params.com_half_width)
            .ok_or(FinderError::NoDotFound)?;
        let position = profile.point_at(com).ok_or(FinderError::NoDotFound)?;
        self.last_peak = Some(com.round().max(0.0) as usize);

        let offset_px = calib
            .slider_start
            .map(|start| position.x - start.x)
            .unwrap_or(0.0);
        let offset_mm = calib.px_per_mm.map(|s| offset_px / s);
        debug!("slider at x={:.2} (offset {offset_px:.2}px)", position.x);

        Ok(SliderMeasurement {
            position,
            offset_px,
            offset_mm,
        })
    }
}
