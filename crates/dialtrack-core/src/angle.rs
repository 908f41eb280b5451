//! Degree arithmetic on the `[0, 360)` circle.

/// Wrap an angle into `[0, 360)`.
#[inline]
pub fn wrap_deg(a: f32) -> f32 {
    let mut a = a % 360.0;
    if a < 0.0 {
        a += 360.0;
    }
    // f32 rounding can land a tiny negative input on exactly 360.0
    if a >= 360.0 {
        a = 0.0;
    }
    a
}

/// Forward (counter-clockwise) gap from `from` to `to`, in `[0, 360)`.
#[inline]
pub fn forward_gap(from: f32, to: f32) -> f32 {
    wrap_deg(to - from)
}

/// Shortest signed difference `to - from`, in `(-180, 180]`.
#[inline]
pub fn signed_delta(from: f32, to: f32) -> f32 {
    let d = wrap_deg(to - from);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Wrap-aware mean of a set of angles. `None` for an empty slice or when the
/// angles cancel out (resultant vector of zero length).
pub fn circular_mean(angles: &[f32]) -> Option<f32> {
    if angles.is_empty() {
        return None;
    }
    let mut sx = 0.0f64;
    let mut sy = 0.0f64;
    for &a in angles {
        let r = (a as f64).to_radians();
        sx += r.cos();
        sy += r.sin();
    }
    if sx * sx + sy * sy < 1e-12 {
        return None;
    }
    Some(wrap_deg(sy.atan2(sx).to_degrees() as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wrap_into_range() {
        assert_relative_eq!(wrap_deg(725.0), 5.0);
        assert_relative_eq!(wrap_deg(-10.0), 350.0);
        assert_eq!(wrap_deg(360.0), 0.0);
    }

    #[test]
    fn signed_delta_takes_short_way() {
        assert_relative_eq!(signed_delta(350.0, 10.0), 20.0);
        assert_relative_eq!(signed_delta(10.0, 350.0), -20.0);
    }

    #[test]
    fn circular_mean_handles_wrap() {
        let m = circular_mean(&[350.0, 10.0]).unwrap();
        assert_relative_eq!(m, 0.0, epsilon = 1e-3);
        assert!(circular_mean(&[]).is_none());
        assert!(circular_mean(&[0.0, 180.0]).is_none());
    }
}
