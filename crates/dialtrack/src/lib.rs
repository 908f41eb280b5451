//! High-level facade crate for the `dialtrack-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying crates
//! - a [`TrackingSession`] that wires calibration and all per-frame
//!   finders together for the common one-device-one-session case
//! - (feature `cli`) a small binary that calibrates against an image file
//!   and prints a JSON report
//!
//! ## Quickstart
//!
//! ```
//! use dialtrack::calib::synthetic::SyntheticDevice;
//! use dialtrack::{DeviceFamily, TrackingSession};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scene = SyntheticDevice::new(DeviceFamily::Manta);
//! let frame = scene.render();
//!
//! let mut session = TrackingSession::new(DeviceFamily::Manta);
//! session.calibrate(&frame.view())?;
//!
//! let report = session.process(&frame.view());
//! println!("ratchet: {:?}", report.ratchet);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`core`]: frame/region/profile types and the signal kernel.
//! - [`barcode`]: device id barcode decoding.
//! - [`circle`]: bubble fit and the Hough accumulator.
//! - [`calib`]: device families and the static calibration locator.
//! - [`finders`]: per-frame ratchet/scrolly/slider finders and clicks.

pub use dialtrack_barcode as barcode;
pub use dialtrack_calib as calib;
pub use dialtrack_circle as circle;
pub use dialtrack_core as core;
pub use dialtrack_finders as finders;

pub use dialtrack_calib::{CalibError, DeviceCalibration, DeviceFamily, DeviceGeometry};
pub use dialtrack_core::{Channel, Circle, FrameView, Region};
pub use dialtrack_finders::{
    AngleFinder, AngleMeasurement, FinderError, SliderMeasurement,
};

mod session;

pub use session::{FrameReport, TrackingSession};
