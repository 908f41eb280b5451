//! Device families and the static calibration locator.
//!
//! The locator runs once per tracking session (or on demand). It finds the
//! fixed calibration strip, decodes the device id barcode, derives the
//! pixel-per-millimetre scale, and locates the ratchet and scrolly reference
//! circles plus the slider region. The resulting [`DeviceCalibration`] is
//! read-only afterwards and consumed by every per-frame finder.

mod calibration;
mod device;
mod error;
mod locator;
mod satellite;
pub mod synthetic;

pub use calibration::DeviceCalibration;
pub use device::{DeviceFamily, DeviceGeometry};
pub use error::CalibError;
pub use locator::{CalibrationLocator, LocatorParams};
pub use satellite::reconstruct_center;
