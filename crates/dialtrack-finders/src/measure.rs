use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use dialtrack_calib::DeviceCalibration;
use dialtrack_core::FrameView;

use crate::error::FinderError;

/// One wheel angle measurement.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AngleMeasurement {
    /// Smoothed, offset-corrected angle in `[0, 360)`.
    pub angle_deg: f32,
    /// Raw anchored angle before smoothing and offset.
    pub raw_deg: f32,
    /// Number of dot detections behind this measurement.
    pub dots: usize,
}

/// One slider position measurement.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SliderMeasurement {
    /// Sub-pixel dot position in frame coordinates.
    pub position: Point2<f32>,
    /// Signed offset from the calibration-time slider position, pixels.
    pub offset_px: f32,
    /// Same offset in millimetres when the pixel scale is known.
    pub offset_mm: Option<f32>,
}

/// Common face of the continuous and discrete angle finders.
///
/// Device-family branching happens behind this trait via explicit enum
/// dispatch on [`DeviceCalibration::family`]; there is no inheritance.
pub trait AngleFinder {
    /// Attach a calibration and reset all cross-frame state.
    fn configure(&mut self, calibration: &DeviceCalibration);

    /// Process one frame, updating the finder state exactly once.
    fn find(&mut self, frame: &FrameView<'_>) -> Result<AngleMeasurement, FinderError>;
}
