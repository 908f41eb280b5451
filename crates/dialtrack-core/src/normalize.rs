//! Whole-plane intensity normalization used once per calibration pass.

use crate::frame::{PlaneBuf, PlaneView};

/// Min–max contrast stretch to the full 8-bit range.
pub fn stretch_min_max(plane: &PlaneView<'_>) -> PlaneBuf {
    let mut out = PlaneBuf::new(plane.width, plane.height);
    let Some((&min, &max)) = min_max(plane.data) else {
        return out;
    };
    if min == max {
        out.data.copy_from_slice(plane.data);
        return out;
    }
    let scale = 255.0 / (max - min) as f32;
    for (dst, &src) in out.data.iter_mut().zip(plane.data) {
        *dst = ((src.saturating_sub(min)) as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Percentile-clipped stretch via cumulative histogram.
///
/// Values below the `lo` quantile map to 0, above the `hi` quantile to 255.
/// The 2nd/98th pair suppresses saturated specular outliers that would
/// otherwise dominate a plain min–max stretch.
pub fn stretch_percentile(plane: &PlaneView<'_>, lo: f32, hi: f32) -> PlaneBuf {
    let mut out = PlaneBuf::new(plane.width, plane.height);
    if plane.data.is_empty() {
        return out;
    }

    let mut hist = [0u32; 256];
    for &v in plane.data {
        hist[v as usize] += 1;
    }

    let total = plane.data.len() as u64;
    let lo_count = (lo.clamp(0.0, 1.0) as f64 * total as f64) as u64;
    let hi_count = (hi.clamp(0.0, 1.0) as f64 * total as f64) as u64;

    let mut cum = 0u64;
    let mut lo_v = 0u8;
    let mut hi_v = 255u8;
    let mut lo_set = false;
    for (value, &count) in hist.iter().enumerate() {
        cum += count as u64;
        if !lo_set && cum >= lo_count {
            lo_v = value as u8;
            lo_set = true;
        }
        if cum >= hi_count {
            hi_v = value as u8;
            break;
        }
    }

    if hi_v <= lo_v {
        out.data.copy_from_slice(plane.data);
        return out;
    }

    let scale = 255.0 / (hi_v - lo_v) as f32;
    for (dst, &src) in out.data.iter_mut().zip(plane.data) {
        let clipped = src.clamp(lo_v, hi_v);
        *dst = ((clipped - lo_v) as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn min_max(data: &[u8]) -> Option<(&u8, &u8)> {
    Some((data.iter().min()?, data.iter().max()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PlaneBuf;

    #[test]
    fn min_max_stretch_spans_full_range() {
        let mut buf = PlaneBuf::new(4, 1);
        buf.data.copy_from_slice(&[50, 100, 150, 200]);
        let out = stretch_min_max(&buf.view());
        assert_eq!(out.data[0], 0);
        assert_eq!(out.data[3], 255);
    }

    #[test]
    fn flat_plane_is_unchanged() {
        let mut buf = PlaneBuf::new(3, 1);
        buf.data.copy_from_slice(&[7, 7, 7]);
        let out = stretch_min_max(&buf.view());
        assert_eq!(out.data, vec![7, 7, 7]);
    }

    #[test]
    fn percentile_stretch_ignores_outliers() {
        // 98 mid-gray pixels with one black and one saturated outlier
        let mut data = vec![128u8; 98];
        data.push(0);
        data.push(255);
        let mut buf = PlaneBuf::new(10, 10);
        buf.data.copy_from_slice(&data);
        let out = stretch_percentile(&buf.view(), 0.02, 0.98);
        // outliers clamp to the quantile values instead of stretching the bulk
        assert_eq!(out.data[0], out.data[1]);
    }
}
