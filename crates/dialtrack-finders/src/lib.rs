//! Per-frame stateful finders.
//!
//! Each finder owns its cross-frame state (smoothing FIFO, previous
//! profile, click latch) and mutates it exactly once per processed frame,
//! so the caller must deliver frames in arrival order, one finder instance
//! per tracking session. The shared [`DeviceCalibration`] is read-only.

mod click;
mod error;
mod measure;
mod ratchet;
mod scrolly;
mod slider;

pub use click::{ClickDetector, ClickParams};
pub use error::FinderError;
pub use measure::{AngleFinder, AngleMeasurement, SliderMeasurement};
pub use ratchet::{RatchetAngleFinder, RatchetParams};
pub use scrolly::{ScrollyAngleFinder, ScrollyParams};
pub use slider::{SliderFinder, SliderParams};
