//! 1-D identification barcode decoding.
//!
//! The calibration strip carries a short horizontal barcode encoding the
//! device id. Bars are read from a single scan-line profile; the decoder
//! makes exactly one attempt per profile and the caller retries on the next
//! candidate scan line.

mod decode;

pub use decode::{decode, BarcodeConfig, BarcodeError};
