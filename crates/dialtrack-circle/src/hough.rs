//! Parametric Hough circle accumulator.
//!
//! Independent, swappable alternative to the bubble fit. Votes are absolute
//! counts; callers must not treat them as a comparable quality metric across
//! images.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use dialtrack_core::PlaneView;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HoughParams {
    pub min_radius: usize,
    pub max_radius: usize,
    /// Pixels at or above this intensity vote as edge pixels.
    pub edge_threshold: u8,
    /// Number of circles to extract.
    pub max_circles: usize,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            min_radius: 8,
            max_radius: 64,
            edge_threshold: 128,
            max_circles: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HoughCircle {
    pub center: Point2<f32>,
    pub radius: f32,
    pub votes: u32,
}

/// Accumulate centre votes per radius band from every edge pixel, then
/// extract the strongest circles with half-radius non-maximum suppression.
pub fn hough_circles(plane: &PlaneView<'_>, params: &HoughParams) -> Vec<HoughCircle> {
    let (w, h) = (plane.width, plane.height);
    if w == 0 || h == 0 || params.min_radius == 0 || params.max_radius < params.min_radius {
        return Vec::new();
    }

    let luts = build_offset_luts(params.min_radius, params.max_radius);

    let mut edges = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if plane.data[y * w + x] >= params.edge_threshold {
                edges.push((x as i32, y as i32));
            }
        }
    }
    if edges.is_empty() {
        return Vec::new();
    }

    let mut bands: Vec<Vec<u32>> = vec![vec![0u32; w * h]; luts.len()];
    for &(ex, ey) in &edges {
        for (band, lut) in bands.iter_mut().zip(&luts) {
            for &(dx, dy) in lut {
                let cx = ex + dx;
                let cy = ey + dy;
                if cx >= 0 && cy >= 0 && (cx as usize) < w && (cy as usize) < h {
                    band[cy as usize * w + cx as usize] += 1;
                }
            }
        }
    }

    let mut out = Vec::with_capacity(params.max_circles);
    for _ in 0..params.max_circles {
        let mut best_votes = 0u32;
        let mut best = None;
        for (ri, band) in bands.iter().enumerate() {
            for (idx, &v) in band.iter().enumerate() {
                if v > best_votes {
                    best_votes = v;
                    best = Some((ri, idx));
                }
            }
        }
        let Some((ri, idx)) = best else {
            break;
        };

        let cx = (idx % w) as i32;
        let cy = (idx / w) as i32;
        let radius = (params.min_radius + ri) as f32;

        // suppress everything within half a radius before the next search
        let half2 = (radius * 0.5).max(1.0).powi(2);
        for band in &mut bands {
            for y in 0..h as i32 {
                for x in 0..w as i32 {
                    let dx = (x - cx) as f32;
                    let dy = (y - cy) as f32;
                    if dx * dx + dy * dy <= half2 {
                        band[y as usize * w + x as usize] = 0;
                    }
                }
            }
        }

        out.push(HoughCircle {
            center: Point2::new(cx as f32, cy as f32),
            radius,
            votes: best_votes,
        });
    }

    out
}

/// One offset table per radius band; the angular step shrinks with the
/// configured minimum radius (∝ 1 / (8 · min_radius)) so that votes stay
/// connected along the ring.
fn build_offset_luts(min_radius: usize, max_radius: usize) -> Vec<Vec<(i32, i32)>> {
    let step = 1.0 / (8.0 * min_radius as f32);
    let count = (std::f32::consts::TAU / step).ceil() as usize;

    let mut luts = Vec::with_capacity(max_radius - min_radius + 1);
    for r in min_radius..=max_radius {
        let mut offsets = Vec::with_capacity(count);
        for k in 0..count {
            let a = k as f32 * step;
            let (sin_a, cos_a) = a.sin_cos();
            offsets.push((
                (r as f32 * cos_a).round() as i32,
                (r as f32 * sin_a).round() as i32,
            ));
        }
        offsets.sort_unstable();
        offsets.dedup();
        luts.push(offsets);
    }
    luts
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialtrack_core::PlaneBuf;

    fn draw_circle_outline(buf: &mut PlaneBuf, cx: f32, cy: f32, r: f32) {
        for k in 0..720 {
            let a = (k as f32 * 0.5).to_radians();
            let (sin_a, cos_a) = a.sin_cos();
            buf.put(
                (cx + r * cos_a).round() as i32,
                (cy + r * sin_a).round() as i32,
                255,
            );
        }
    }

    #[test]
    fn finds_single_circle() {
        let mut buf = PlaneBuf::new(100, 100);
        draw_circle_outline(&mut buf, 44.0, 52.0, 20.0);
        let params = HoughParams {
            min_radius: 15,
            max_radius: 25,
            edge_threshold: 128,
            max_circles: 1,
        };
        let circles = hough_circles(&buf.view(), &params);
        assert_eq!(circles.len(), 1);
        let c = circles[0];
        assert!((c.center.x - 44.0).abs() <= 2.0, "cx={}", c.center.x);
        assert!((c.center.y - 52.0).abs() <= 2.0, "cy={}", c.center.y);
        assert!((c.radius - 20.0).abs() <= 1.5, "r={}", c.radius);
        assert!(c.votes > 0);
    }

    #[test]
    fn suppression_separates_two_circles() {
        let mut buf = PlaneBuf::new(160, 90);
        draw_circle_outline(&mut buf, 40.0, 45.0, 18.0);
        draw_circle_outline(&mut buf, 115.0, 45.0, 22.0);
        let params = HoughParams {
            min_radius: 15,
            max_radius: 25,
            edge_threshold: 128,
            max_circles: 2,
        };
        let circles = hough_circles(&buf.view(), &params);
        assert_eq!(circles.len(), 2);
        let mut found: Vec<(f32, f32)> = circles.iter().map(|c| (c.center.x, c.radius)).collect();
        found.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        assert!((found[0].0 - 40.0).abs() <= 2.0);
        assert!((found[0].1 - 18.0).abs() <= 1.5);
        assert!((found[1].0 - 115.0).abs() <= 2.0);
        assert!((found[1].1 - 22.0).abs() <= 1.5);
    }

    #[test]
    fn empty_plane_yields_nothing() {
        let buf = PlaneBuf::new(64, 64);
        assert!(hough_circles(&buf.view(), &HoughParams::default()).is_empty());
    }
}
