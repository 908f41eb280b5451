//! Core types and the signal kernel for camera-based dial tracking.
//!
//! This crate is intentionally small and purely geometric. It owns the frame
//! and region types, the 1-D profile samplers, and the pixel/signal kernel
//! (projections, centroids, extrema, filters) that every detector above it
//! builds on. It does *not* know about devices, calibration or finder state.

mod angle;
mod circle;
mod frame;
mod kernel;
mod logger;
mod normalize;
mod profile;
mod region;

pub use angle::{circular_mean, forward_gap, signed_delta, wrap_deg};
pub use circle::Circle;
pub use frame::{get_pixel, sample_bilinear, Channel, FrameView, PlaneBuf, PlaneView};
pub use kernel::{
    blend_half, center_of_mass, local_extrema, moving_average, project, refine_center,
    single_pole_highpass, windowed_centroid, Axis, Extrema, Reducer,
};
pub use normalize::{stretch_min_max, stretch_percentile};
pub use profile::{sample_arc, sample_multitrack, sample_segment, Profile, UNSET};
pub use region::Region;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
