//! Continuous scrolly angle finder.
//!
//! The scrolly wheel carries a single continuous marker, so the finder
//! simply reports the global maximum of a bumper-padded arc profile. The
//! signal is assumed smooth; there is no dot counting and no jump
//! rejection. Successive frames are blended 50/50 to damp sensor noise.

use serde::{Deserialize, Serialize};

use dialtrack_calib::DeviceCalibration;
use dialtrack_core::{
    blend_half, moving_average, sample_arc, wrap_deg, Channel, FrameView,
};

use crate::error::FinderError;
use crate::measure::{AngleFinder, AngleMeasurement};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrollyParams {
    pub step_deg: f32,
    pub tracks: usize,
    pub track_step: f32,
    /// Angular padding on each side of the full turn; peaks inside the
    /// bumpers are wrap artifacts and never reported.
    pub bumper_deg: f32,
    pub smoothing_half_width: usize,
    pub calibration_offset_deg: f32,
}

impl Default for ScrollyParams {
    fn default() -> Self {
        Self {
            step_deg: 0.5,
            tracks: 2,
            track_step: 1.5,
            bumper_deg: 8.0,
            smoothing_half_width: 2,
            calibration_offset_deg: 0.0,
        }
    }
}

/// Stateful continuous angle finder; one instance per tracking session.
pub struct ScrollyAngleFinder {
    params: ScrollyParams,
    calibration: Option<DeviceCalibration>,
    /// Previous frame's smoothed profile for the 50/50 temporal blend.
    previous: Option<Vec<f32>>,
}

impl ScrollyAngleFinder {
    pub fn new(params: ScrollyParams) -> Self {
        Self {
            params,
            calibration: None,
            previous: None,
        }
    }

    #[inline]
    pub fn params(&self) -> &ScrollyParams {
        &self.params
    }
}

impl AngleFinder for ScrollyAngleFinder {
    fn configure(&mut self, calibration: &DeviceCalibration) {
        self.calibration = Some(calibration.clone());
        self.previous = None;
    }

    fn find(&mut self, frame: &FrameView<'_>) -> Result<AngleMeasurement, FinderError> {
        let calib = self.calibration.as_ref().ok_or(FinderError::NotConfigured)?;
        let circle = calib.scrolly.ok_or(FinderError::NotConfigured)?;
        let luma = frame.plane(Channel::Luma);

        let bumper = self.params.bumper_deg;
        let step = self.params.step_deg;
        let sweep = 360.0 + 2.0 * bumper;
        let samples = (sweep / step).round() as usize + 1;

        let profile = sample_arc(
            &luma,
            circle.center,
            circle.radius,
            -bumper,
            sweep,
            samples,
            self.params.tracks,
            self.params.track_step,
        );
        if profile.is_empty() {
            return Err(FinderError::NoPeak);
        }

        let smoothed = moving_average(&profile.values, self.params.smoothing_half_width, 1);
        let blended = match &self.previous {
            Some(prev) => blend_half(prev, &smoothed),
            None => smoothed.clone(),
        };
        self.previous = Some(smoothed);

        // bumper-excluded valid zone
        let guard = (bumper / step).round() as usize;
        let hi = blended.len().saturating_sub(guard);
        if guard >= hi {
            return Err(FinderError::NoPeak);
        }
        let (peak, &value) = blended[guard..hi]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, v)| (i + guard, v))
            .ok_or(FinderError::NoPeak)?;
        if value <= 0.0 {
            return Err(FinderError::NoPeak);
        }

        let raw = wrap_deg(-bumper + peak as f32 * step);
        let angle = wrap_deg(-(raw + self.params.calibration_offset_deg));
        Ok(AngleMeasurement {
            angle_deg: angle,
            raw_deg: raw,
            dots: 1,
        })
    }
}
