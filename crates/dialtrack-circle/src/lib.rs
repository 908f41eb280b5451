//! Circle locating strategies.
//!
//! Two independent, swappable ways to find a ring-shaped mechanical feature:
//! the radius-growing [`bubble_fit`] used by the calibration locator, and a
//! classic parametric [`hough_circles`] accumulator.

mod bubble;
mod hough;

pub use bubble::{bubble_fit, BubbleFitParams, CircleFitError};
pub use hough::{hough_circles, HoughCircle, HoughParams};
