use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use dialtrack_core::{Circle, Region};

use crate::device::DeviceFamily;

/// Static geometry of one physical device, produced by the calibration
/// locator and read-only afterwards.
///
/// Fields are filled stage by stage; on a failed run the struct still
/// carries everything located before the failing stage, with `completed`
/// left false. One calibration is owned by one tracking session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceCalibration {
    pub family: DeviceFamily,
    /// Strip region holding the calibration dots and the id barcode.
    pub calibration_box: Option<Region>,
    /// Device id decoded from the strip barcode.
    pub device_id: Option<u32>,
    /// Scale derived from the top two calibration dots.
    pub px_per_mm: Option<f32>,
    pub ratchet: Option<Circle>,
    /// Slider-left, slider-right and scrolly markers, in that order.
    pub top_markers: Vec<Point2<f32>>,
    pub scrolly: Option<Circle>,
    pub slider_region: Option<Region>,
    /// Slider dot position at calibration time.
    pub slider_start: Option<Point2<f32>>,
    /// Signed pixel offset between the slider start and the ratchet centre.
    pub slider_ratchet_offset: Option<f32>,
    /// Satellite dot offsets relative to the ratchet centre.
    pub satellite_offsets: Option<[Vector2<f32>; 2]>,
    pub completed: bool,
}

impl DeviceCalibration {
    pub fn new(family: DeviceFamily) -> Self {
        Self {
            family,
            calibration_box: None,
            device_id: None,
            px_per_mm: None,
            ratchet: None,
            top_markers: Vec::new(),
            scrolly: None,
            slider_region: None,
            slider_start: None,
            slider_ratchet_offset: None,
            satellite_offsets: None,
            completed: false,
        }
    }

    /// Absolute satellite dot positions, when the device carries them.
    pub fn satellite_points(&self) -> Option<[Point2<f32>; 2]> {
        let ratchet = self.ratchet.as_ref()?;
        let offsets = self.satellite_offsets.as_ref()?;
        Some([ratchet.center + offsets[0], ratchet.center + offsets[1]])
    }
}
