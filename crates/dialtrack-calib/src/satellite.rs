use nalgebra::{Point2, Vector2};

/// Reconstruct the theoretical ratchet centre from the two satellite dots.
///
/// The satellites subtend 90° at the centre, so the centre sits half the
/// dot-to-dot distance away from their midpoint, along the rotated
/// connecting vector.
pub fn reconstruct_center(d1: Point2<f32>, d2: Point2<f32>) -> Point2<f32> {
    let mid = Point2::new(0.5 * (d1.x + d2.x), 0.5 * (d1.y + d2.y));
    let v = Vector2::new(d2.x - d1.x, d2.y - d1.y);
    mid + 0.5 * Vector2::new(-v.y, v.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_center_from_90_degree_satellites() {
        let c = Point2::new(120.0, 90.0);
        let rho = 40.0f32;
        for base in [0.0f32, 30.0, 200.0] {
            let a1 = (45.0f32 + base).to_radians();
            let a2 = (135.0f32 + base).to_radians();
            let d1 = Point2::new(c.x + rho * a1.cos(), c.y + rho * a1.sin());
            let d2 = Point2::new(c.x + rho * a2.cos(), c.y + rho * a2.sin());
            let rec = reconstruct_center(d1, d2);
            assert_relative_eq!(rec.x, c.x, epsilon = 1e-3);
            assert_relative_eq!(rec.y, c.y, epsilon = 1e-3);
        }
    }
}
