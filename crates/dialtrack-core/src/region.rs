use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Integer rectangle in pixel space. `right` and `bottom` are exclusive.
///
/// A region is only valid for pixel access after [`Region::clip`]; clipping
/// guarantees non-negative bounds inside the plane extent.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Square window of side `2 * half_width + 1` centred on `center`.
    pub fn around(center: Point2<f32>, half_width: i32) -> Self {
        let cx = center.x.round() as i32;
        let cy = center.y.round() as i32;
        Self {
            left: cx - half_width,
            top: cy - half_width,
            right: cx + half_width + 1,
            bottom: cy + half_width + 1,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    #[inline]
    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub fn clip(&self, width: usize, height: usize) -> Region {
        Region {
            left: self.left.clamp(0, width as i32),
            top: self.top.clamp(0, height as i32),
            right: self.right.clamp(0, width as i32),
            bottom: self.bottom.clamp(0, height as i32),
        }
    }

    pub fn contains(&self, p: Point2<f32>) -> bool {
        p.x >= self.left as f32
            && p.x < self.right as f32
            && p.y >= self.top as f32
            && p.y < self.bottom as f32
    }

    pub fn expand(&self, dx: i32, dy: i32) -> Region {
        Region {
            left: self.left - dx,
            top: self.top - dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    pub fn center(&self) -> Point2<f32> {
        Point2::new(
            0.5 * (self.left + self.right) as f32,
            0.5 * (self.top + self.bottom) as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_clamps_into_plane() {
        let r = Region::new(-5, -5, 20, 20).clip(10, 8);
        assert_eq!(r, Region::new(0, 0, 10, 8));
    }

    #[test]
    fn clip_can_produce_empty() {
        let r = Region::new(12, 0, 20, 4).clip(10, 10);
        assert!(r.is_empty());
        assert_eq!(r.width(), 0);
    }

    #[test]
    fn around_is_symmetric() {
        let r = Region::around(Point2::new(5.0, 5.0), 2);
        assert_eq!(r, Region::new(3, 3, 8, 8));
        assert_eq!(r.width(), 5);
    }

    #[test]
    fn contains_respects_exclusive_bounds() {
        let r = Region::new(0, 0, 4, 4);
        assert!(r.contains(Point2::new(3.9, 0.0)));
        assert!(!r.contains(Point2::new(4.0, 0.0)));
    }
}
