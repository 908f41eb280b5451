//! Pixel and 1-D signal kernel.
//!
//! Everything here is pure given its inputs. The not-found case of the
//! centroid operations is `None`; named failure reasons belong to the
//! detector layers above.

use nalgebra::Point2;

use crate::frame::PlaneView;
use crate::region::Region;

/// Projection direction. `Horizontal` reduces each column into one value
/// (the output is indexed by x), `Vertical` reduces each row (indexed by y).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reducer {
    Max,
    Sum,
}

/// Reduce a clipped region into a 1-D intensity sequence.
pub fn project(plane: &PlaneView<'_>, region: Region, axis: Axis, reducer: Reducer) -> Vec<f32> {
    let r = region.clip(plane.width, plane.height);
    if r.is_empty() {
        return Vec::new();
    }

    let (out_len, inner_len) = match axis {
        Axis::Horizontal => (r.width() as usize, r.height() as usize),
        Axis::Vertical => (r.height() as usize, r.width() as usize),
    };

    let mut out = vec![0.0f32; out_len];
    for (o, slot) in out.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        let mut max = 0.0f32;
        for i in 0..inner_len {
            let (x, y) = match axis {
                Axis::Horizontal => (r.left + o as i32, r.top + i as i32),
                Axis::Vertical => (r.left + i as i32, r.top + o as i32),
            };
            let v = plane.data[y as usize * plane.width + x as usize] as f32;
            acc += v;
            if v > max {
                max = v;
            }
        }
        *slot = match reducer {
            Reducer::Sum => acc,
            Reducer::Max => max,
        };
    }
    out
}

/// Intensity-weighted centroid over a clipped region.
///
/// Pixels contribute `max(v - floor, 0)`. Returns `None` when the integrated
/// mass is zero; the division is never performed in that case.
pub fn center_of_mass(plane: &PlaneView<'_>, region: Region, floor: u8) -> Option<Point2<f32>> {
    let r = region.clip(plane.width, plane.height);
    if r.is_empty() {
        return None;
    }

    let mut mass = 0.0f64;
    let mut sx = 0.0f64;
    let mut sy = 0.0f64;
    for y in r.top..r.bottom {
        let row = y as usize * plane.width;
        for x in r.left..r.right {
            let w = plane.data[row + x as usize].saturating_sub(floor) as f64;
            mass += w;
            sx += w * x as f64;
            sy += w * y as f64;
        }
    }

    if mass <= 0.0 {
        return None;
    }
    Some(Point2::new((sx / mass) as f32, (sy / mass) as f32))
}

/// Iterated centroid: recompute [`center_of_mass`] over a square window
/// centred on the previous estimate. Any failed iteration fails the whole
/// refinement.
pub fn refine_center(
    plane: &PlaneView<'_>,
    seed: Point2<f32>,
    half_width: i32,
    iterations: usize,
    floor: u8,
) -> Option<Point2<f32>> {
    let mut current = seed;
    for _ in 0..iterations {
        let window = Region::around(current, half_width);
        current = center_of_mass(plane, window, floor)?;
    }
    Some(current)
}

/// Ordered extrema indices found by [`local_extrema`]. Maxima and minima
/// alternate, so the counts never differ by more than one.
#[derive(Clone, Debug, Default)]
pub struct Extrema {
    pub maxima: Vec<usize>,
    pub minima: Vec<usize>,
}

enum Search {
    First,
    Max,
    Min,
}

/// Single-pass hysteresis extrema detection.
///
/// A maximum candidate is confirmed once the signal has risen at least
/// `amplitude` above the last confirmed minimum and stops extending the
/// candidate; the rule for minima is symmetric. A strictly monotonic
/// sequence therefore yields no extrema at all.
pub fn local_extrema(seq: &[f32], amplitude: f32) -> Extrema {
    let mut out = Extrema::default();
    if seq.len() < 2 {
        return out;
    }

    let mut search = Search::First;
    let mut cand_max = seq[0];
    let mut cand_max_i = 0usize;
    let mut cand_min = seq[0];
    let mut cand_min_i = 0usize;

    for (i, &v) in seq.iter().enumerate().skip(1) {
        let rose = v > cand_max;
        let fell = v < cand_min;
        if rose {
            cand_max = v;
            cand_max_i = i;
        }
        if fell {
            cand_min = v;
            cand_min_i = i;
        }

        match search {
            Search::First => {
                if !rose && cand_max - cand_min >= amplitude && cand_max_i > cand_min_i {
                    out.maxima.push(cand_max_i);
                    search = Search::Min;
                    cand_min = v;
                    cand_min_i = i;
                } else if !fell && cand_max - cand_min >= amplitude && cand_min_i > cand_max_i {
                    out.minima.push(cand_min_i);
                    search = Search::Max;
                    cand_max = v;
                    cand_max_i = i;
                }
            }
            Search::Max => {
                if !rose && cand_max - cand_min >= amplitude {
                    out.maxima.push(cand_max_i);
                    search = Search::Min;
                    cand_min = v;
                    cand_min_i = i;
                }
            }
            Search::Min => {
                if !fell && cand_max - cand_min >= amplitude {
                    out.minima.push(cand_min_i);
                    search = Search::Max;
                    cand_max = v;
                    cand_max_i = i;
                }
            }
        }
    }

    out
}

/// Index-space centroid of `seq` over the window `center ± half_width`.
/// Negative (unset) samples carry no mass; `None` when the windowed mass
/// is zero.
pub fn windowed_centroid(seq: &[f32], center: usize, half_width: usize) -> Option<f32> {
    if seq.is_empty() {
        return None;
    }
    let lo = center.saturating_sub(half_width);
    let hi = (center + half_width + 1).min(seq.len());
    let mut mass = 0.0f64;
    let mut sum = 0.0f64;
    for (i, &v) in seq[lo..hi].iter().enumerate() {
        if v > 0.0 {
            mass += v as f64;
            sum += v as f64 * (lo + i) as f64;
        }
    }
    if mass <= 0.0 {
        return None;
    }
    Some((sum / mass) as f32)
}

/// Box-car smoothing. Unset samples (negative values) are excluded from the
/// window; `base` is a lower bound on the divisor so that short windows at
/// the sequence edges do not inflate sub-threshold values.
pub fn moving_average(seq: &[f32], half_width: usize, base: usize) -> Vec<f32> {
    let n = seq.len();
    let mut out = vec![0.0f32; n];
    for (i, slot) in out.iter_mut().enumerate() {
        let lo = i.saturating_sub(half_width);
        let hi = (i + half_width + 1).min(n);
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for &v in &seq[lo..hi] {
            if v >= 0.0 {
                sum += v;
                count += 1;
            }
        }
        let div = count.max(base);
        *slot = if div == 0 { 0.0 } else { sum / div as f32 };
    }
    out
}

/// One-pole IIR high-pass. Negative results are clamped to zero so that the
/// output stays a valid intensity sequence.
pub fn single_pole_highpass(seq: &[f32], pole: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(seq.len());
    let Some(&first) = seq.first() else {
        return out;
    };
    let mut lp = first.max(0.0);
    for &v in seq {
        let v = v.max(0.0);
        lp = pole * lp + (1.0 - pole) * v;
        out.push((v - lp).max(0.0));
    }
    out
}

/// 50/50 temporal mix of the previous and current profile values.
///
/// Falls back to `cur` when the lengths disagree (profile geometry changed
/// between frames).
pub fn blend_half(prev: &[f32], cur: &[f32]) -> Vec<f32> {
    if prev.len() != cur.len() {
        return cur.to_vec();
    }
    prev.iter()
        .zip(cur)
        .map(|(&a, &b)| {
            if a < 0.0 {
                b
            } else if b < 0.0 {
                a
            } else {
                0.5 * (a + b)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PlaneBuf;
    use approx::assert_relative_eq;

    fn blob_plane(cx: i32, cy: i32) -> PlaneBuf {
        let mut buf = PlaneBuf::new(32, 32);
        for dy in -2..=2 {
            for dx in -2..=2 {
                buf.put(cx + dx, cy + dy, 200);
            }
        }
        buf
    }

    #[test]
    fn center_of_mass_finds_square_blob() {
        let buf = blob_plane(12, 9);
        let c = center_of_mass(&buf.view(), Region::new(0, 0, 32, 32), 10).unwrap();
        assert_relative_eq!(c.x, 12.0, epsilon = 1e-4);
        assert_relative_eq!(c.y, 9.0, epsilon = 1e-4);
    }

    #[test]
    fn center_of_mass_zero_mass_is_none() {
        let buf = PlaneBuf::new(16, 16);
        assert!(center_of_mass(&buf.view(), Region::new(0, 0, 16, 16), 0).is_none());
    }

    #[test]
    fn refine_center_walks_to_blob() {
        let buf = blob_plane(20, 20);
        let c = refine_center(&buf.view(), Point2::new(17.0, 18.0), 5, 4, 10).unwrap();
        assert_relative_eq!(c.x, 20.0, epsilon = 1e-3);
        assert_relative_eq!(c.y, 20.0, epsilon = 1e-3);
    }

    #[test]
    fn refine_center_fails_on_empty_plane() {
        let buf = PlaneBuf::new(16, 16);
        assert!(refine_center(&buf.view(), Point2::new(8.0, 8.0), 3, 2, 0).is_none());
    }

    #[test]
    fn project_sum_and_max() {
        let mut buf = PlaneBuf::new(4, 3);
        buf.put(1, 0, 10);
        buf.put(1, 1, 30);
        let r = Region::new(0, 0, 4, 3);
        let sums = project(&buf.view(), r, Axis::Horizontal, Reducer::Sum);
        assert_eq!(sums, vec![0.0, 40.0, 0.0, 0.0]);
        let maxs = project(&buf.view(), r, Axis::Horizontal, Reducer::Max);
        assert_eq!(maxs[1], 30.0);
        let rows = project(&buf.view(), r, Axis::Vertical, Reducer::Sum);
        assert_eq!(rows, vec![10.0, 30.0, 0.0]);
    }

    #[test]
    fn extrema_on_monotonic_ramp_is_empty() {
        let ramp: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let e = local_extrema(&ramp, 0.5);
        assert!(e.maxima.is_empty());
        assert!(e.minima.is_empty());
    }

    #[test]
    fn extrema_on_step_is_single_maximum() {
        let mut step = vec![0.0f32; 10];
        step.extend(std::iter::repeat(8.0).take(10));
        let e = local_extrema(&step, 8.0);
        assert_eq!(e.maxima, vec![10]);
        assert!(e.minima.is_empty());

        let e = local_extrema(&step, 8.5);
        assert!(e.maxima.is_empty() && e.minima.is_empty());
    }

    #[test]
    fn extrema_alternate_on_triangle_wave() {
        let mut wave = Vec::new();
        for _ in 0..4 {
            wave.extend((0..10).map(|i| i as f32));
            wave.extend((0..10).rev().map(|i| i as f32));
        }
        let e = local_extrema(&wave, 3.0);
        assert!(!e.maxima.is_empty());
        assert!((e.maxima.len() as i64 - e.minima.len() as i64).abs() <= 1);
        // maxima sit on the peaks (value 9), minima in the valleys
        for &i in &e.maxima {
            assert_eq!(wave[i], 9.0);
        }
        for &i in &e.minima {
            assert_eq!(wave[i], 0.0);
        }
    }

    #[test]
    fn moving_average_skips_unset() {
        let seq = [10.0, -1.0, 20.0];
        let out = moving_average(&seq, 1, 0);
        assert_relative_eq!(out[1], 15.0, epsilon = 1e-5);
    }

    #[test]
    fn highpass_removes_dc() {
        let seq = vec![50.0f32; 200];
        let out = single_pole_highpass(&seq, 0.9);
        assert!(out[199] < 1.0);
    }

    #[test]
    fn blend_half_mixes_and_falls_back() {
        assert_eq!(blend_half(&[0.0, 10.0], &[10.0, 30.0]), vec![5.0, 20.0]);
        assert_eq!(blend_half(&[1.0], &[10.0, 30.0]), vec![10.0, 30.0]);
    }
}
