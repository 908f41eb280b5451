//! Radius-growing circle fit ("bubble fit").
//!
//! The seed sits in the dark interior of a bright ring. A test radius grows
//! outward; the intensity balance of the sampled ring both detects edge
//! contact and steers the centre. The fixed radius offsets applied by the
//! calibration locator were tuned against the exact stop policy implemented
//! here (return the second-to-last growth step), so that policy must not
//! change.

use log::debug;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dialtrack_core::{sample_bilinear, PlaneView};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CircleFitError {
    #[error("ring edge never crossed the lighting threshold")]
    EdgeNotFound,
    #[error("not enough growth iterations (steps={steps})")]
    NotEnoughIterations { steps: usize },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BubbleFitParams {
    /// First test radius in pixels.
    pub min_radius: f32,
    /// Abort bound; reaching it without a stable edge fails the fit.
    pub max_radius: f32,
    /// Radius growth per step.
    pub radius_step: f32,
    /// Angular sampling step along the test ring, degrees.
    pub angular_step_deg: f32,
    /// Integrated ring intensity marking edge contact.
    pub mass_threshold: f32,
    /// Balance magnitude (0..1) below which the ring counts as centred.
    pub balance_cutoff: f32,
    /// Minimum recorded growth steps for a trustworthy fit.
    pub min_steps: usize,
    /// Intensity floor subtracted before mass accumulation.
    pub floor: u8,
}

impl Default for BubbleFitParams {
    fn default() -> Self {
        Self {
            min_radius: 3.0,
            max_radius: 150.0,
            radius_step: 1.0,
            angular_step_deg: 5.0,
            mass_threshold: 1500.0,
            balance_cutoff: 0.25,
            min_steps: 5,
            floor: 0,
        }
    }
}

/// Grow a ring from `seed` until it sits centred on a bright edge.
///
/// While the ring mass stays below `mass_threshold` the radius grows with
/// the centre pinned (edge not reached yet). After contact, an asymmetric
/// ring nudges the centre one pixel away from the brighter side and keeps
/// growing; a balanced ring stops the search. The returned pair is the
/// second-to-last recorded step, because the final growth step typically
/// overshoots past the edge.
pub fn bubble_fit(
    plane: &PlaneView<'_>,
    seed: Point2<f32>,
    params: &BubbleFitParams,
) -> Result<(Point2<f32>, f32), CircleFitError> {
    let mut center = seed;
    let mut radius = params.min_radius;
    let mut history: Vec<(Point2<f32>, f32)> = Vec::new();

    while radius <= params.max_radius {
        history.push((center, radius));
        let (mass, balance) = ring_stats(plane, center, radius, params);

        if mass < params.mass_threshold {
            radius += params.radius_step;
            continue;
        }

        let magnitude = balance.norm();
        if magnitude > params.balance_cutoff {
            // ring straddles the edge unevenly: step away from the bright side
            center -= balance / magnitude;
            radius += params.radius_step;
            continue;
        }

        if history.len() < params.min_steps {
            return Err(CircleFitError::NotEnoughIterations {
                steps: history.len(),
            });
        }
        let (c, r) = history[history.len() - 2];
        debug!(
            "bubble fit converged at ({:.1}, {:.1}) r={:.1} after {} steps",
            c.x,
            c.y,
            r,
            history.len()
        );
        return Ok((c, r));
    }

    Err(CircleFitError::EdgeNotFound)
}

/// Ring mass and the mass-normalized polar centroid of the sampled ring.
/// The balance vector points toward the brighter side; its magnitude is the
/// asymmetry of the ring (0 for a uniformly lit ring).
fn ring_stats(
    plane: &PlaneView<'_>,
    center: Point2<f32>,
    radius: f32,
    params: &BubbleFitParams,
) -> (f32, Vector2<f32>) {
    let samples = (360.0 / params.angular_step_deg).ceil().max(1.0) as usize;
    let mut mass = 0.0f32;
    let mut bx = 0.0f32;
    let mut by = 0.0f32;

    for k in 0..samples {
        let a = (k as f32 * params.angular_step_deg).to_radians();
        let (sin_a, cos_a) = a.sin_cos();
        let x = center.x + radius * cos_a;
        let y = center.y + radius * sin_a;
        if x < 0.0 || y < 0.0 || x >= plane.width as f32 || y >= plane.height as f32 {
            continue;
        }
        let v = (sample_bilinear(plane, x, y) - params.floor as f32).max(0.0);
        mass += v;
        bx += v * cos_a;
        by += v * sin_a;
    }

    if mass <= 0.0 {
        return (0.0, Vector2::zeros());
    }
    (mass, Vector2::new(bx / mass, by / mass))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialtrack_core::PlaneBuf;

    /// Bright ring with inner radius `r0` and the given radial thickness.
    fn render_ring(width: usize, height: usize, cx: f32, cy: f32, r0: f32, th: f32) -> PlaneBuf {
        let mut buf = PlaneBuf::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                if d >= r0 && d <= r0 + th {
                    buf.put(x as i32, y as i32, 255);
                }
            }
        }
        buf
    }

    #[test]
    fn fits_centered_seed() {
        let buf = render_ring(128, 128, 64.0, 60.0, 30.0, 4.0);
        let (c, r) = bubble_fit(
            &buf.view(),
            Point2::new(64.0, 60.0),
            &BubbleFitParams::default(),
        )
        .unwrap();
        assert!((c.x - 64.0).abs() < 1.5, "cx={}", c.x);
        assert!((c.y - 60.0).abs() < 1.5, "cy={}", c.y);
        assert!((r - 30.0).abs() < 3.0, "r={r}");
    }

    #[test]
    fn recovers_from_offset_seed() {
        let buf = render_ring(128, 128, 64.0, 60.0, 30.0, 4.0);
        let (c, r) = bubble_fit(
            &buf.view(),
            Point2::new(60.0, 57.0),
            &BubbleFitParams::default(),
        )
        .unwrap();
        assert!((c.x - 64.0).abs() < 2.5, "cx={}", c.x);
        assert!((c.y - 60.0).abs() < 2.5, "cy={}", c.y);
        assert!((r - 30.0).abs() < 3.5, "r={r}");
    }

    #[test]
    fn empty_plane_fails_with_edge_not_found() {
        let buf = PlaneBuf::new(64, 64);
        let err = bubble_fit(
            &buf.view(),
            Point2::new(32.0, 32.0),
            &BubbleFitParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, CircleFitError::EdgeNotFound);
    }

    #[test]
    fn immediate_contact_is_not_enough_iterations() {
        // ring hugging the seed: contact on the very first steps
        let buf = render_ring(64, 64, 32.0, 32.0, 3.0, 4.0);
        let params = BubbleFitParams {
            min_radius: 3.0,
            min_steps: 5,
            ..BubbleFitParams::default()
        };
        let err = bubble_fit(&buf.view(), Point2::new(32.0, 32.0), &params).unwrap_err();
        assert!(matches!(err, CircleFitError::NotEnoughIterations { .. }));
    }
}
