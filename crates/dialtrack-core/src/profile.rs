//! 1-D intensity profiles sampled along geometric paths.
//!
//! A profile owns the index→pixel mapping of the path that generated it, so
//! detector code can carry a sub-pixel index back into frame coordinates.
//! Profiles are finite and regenerated every frame; they are never resumed.

use nalgebra::{Point2, Vector2};

use crate::frame::{sample_bilinear, PlaneView};

/// Sentinel for samples whose path point fell outside the plane.
pub const UNSET: f32 = -1.0;

#[derive(Clone, Debug, Default)]
pub struct Profile {
    /// Sampled intensities, 0–255, or [`UNSET`].
    pub values: Vec<f32>,
    /// Pixel position of each sample on the base path.
    pub points: Vec<Point2<f32>>,
}

impl Profile {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total energy of the set samples.
    pub fn energy(&self) -> f32 {
        self.values.iter().filter(|v| **v >= 0.0).sum()
    }

    /// Index-space centroid of the window `center ± half_width`.
    ///
    /// Unset samples carry no mass. `None` when the windowed mass is zero.
    pub fn windowed_com(&self, center: usize, half_width: usize) -> Option<f32> {
        crate::kernel::windowed_centroid(&self.values, center, half_width)
    }

    /// Pixel position for a fractional index, linearly interpolated between
    /// neighbouring path points.
    pub fn point_at(&self, index: f32) -> Option<Point2<f32>> {
        if self.points.is_empty() || index < 0.0 {
            return None;
        }
        let i0 = index.floor() as usize;
        if i0 + 1 >= self.points.len() {
            return self.points.last().copied();
        }
        let t = index - i0 as f32;
        let a = self.points[i0];
        let b = self.points[i0 + 1];
        Some(Point2::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y)))
    }
}

/// Sample a straight segment from `a` to `b` with `samples` points.
pub fn sample_segment(
    plane: &PlaneView<'_>,
    a: Point2<f32>,
    b: Point2<f32>,
    samples: usize,
) -> Profile {
    sample_multitrack(plane, a, b, samples, 1, 0.0)
}

/// Sample `tracks` parallel segments offset along the path normal and average
/// them per index. Tracks falling outside the plane are excluded; a sample
/// with no in-bounds track at all is [`UNSET`].
pub fn sample_multitrack(
    plane: &PlaneView<'_>,
    a: Point2<f32>,
    b: Point2<f32>,
    samples: usize,
    tracks: usize,
    track_spacing: f32,
) -> Profile {
    let mut profile = Profile::default();
    if samples == 0 || tracks == 0 {
        return profile;
    }

    let dir = Vector2::new(b.x - a.x, b.y - a.y);
    let len = (dir.x * dir.x + dir.y * dir.y).sqrt();
    if len <= f32::EPSILON {
        return profile;
    }
    let normal = Vector2::new(-dir.y / len, dir.x / len);
    let denom = (samples - 1).max(1) as f32;
    let center_track = 0.5 * (tracks as f32 - 1.0);

    profile.values.reserve(samples);
    profile.points.reserve(samples);

    for k in 0..samples {
        let t = k as f32 / denom;
        let base = Point2::new(a.x + t * dir.x, a.y + t * dir.y);
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for track in 0..tracks {
            let off = (track as f32 - center_track) * track_spacing;
            let p = Point2::new(base.x + off * normal.x, base.y + off * normal.y);
            if in_bounds(plane, p) {
                sum += sample_bilinear(plane, p.x, p.y);
                count += 1;
            }
        }
        profile.points.push(base);
        profile
            .values
            .push(if count == 0 { UNSET } else { sum / count as f32 });
    }
    profile
}

/// Sample a circular arc, optionally averaging several concentric tracks.
///
/// `start_deg`/`sweep_deg` are in degrees; a sweep beyond 360° is how
/// callers implement a wrap bumper. `track_step` is the radial distance
/// between tracks, centred on `radius`. The index→angle mapping is uniform:
/// `angle(i) = start_deg + i * sweep_deg / (samples - 1)`.
#[allow(clippy::too_many_arguments)]
pub fn sample_arc(
    plane: &PlaneView<'_>,
    center: Point2<f32>,
    radius: f32,
    start_deg: f32,
    sweep_deg: f32,
    samples: usize,
    tracks: usize,
    track_step: f32,
) -> Profile {
    let mut profile = Profile::default();
    if samples == 0 || tracks == 0 || radius <= 0.0 {
        return profile;
    }

    let denom = (samples - 1).max(1) as f32;
    let center_track = 0.5 * (tracks as f32 - 1.0);

    profile.values.reserve(samples);
    profile.points.reserve(samples);

    for k in 0..samples {
        let angle = (start_deg + sweep_deg * k as f32 / denom).to_radians();
        let (sin_a, cos_a) = angle.sin_cos();
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for track in 0..tracks {
            let r = radius + (track as f32 - center_track) * track_step;
            let p = Point2::new(center.x + r * cos_a, center.y + r * sin_a);
            if r > 0.0 && in_bounds(plane, p) {
                sum += sample_bilinear(plane, p.x, p.y);
                count += 1;
            }
        }
        profile
            .points
            .push(Point2::new(center.x + radius * cos_a, center.y + radius * sin_a));
        profile
            .values
            .push(if count == 0 { UNSET } else { sum / count as f32 });
    }
    profile
}

#[inline]
fn in_bounds(plane: &PlaneView<'_>, p: Point2<f32>) -> bool {
    p.x >= 0.0 && p.y >= 0.0 && p.x < plane.width as f32 && p.y < plane.height as f32
}
