use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A physical ring feature: centre in frame pixels, nominal radius and the
/// radial thickness of the painted ring.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2<f32>,
    pub radius: f32,
    pub thickness: f32,
}

impl Circle {
    pub fn new(center: Point2<f32>, radius: f32, thickness: f32) -> Self {
        Self {
            center,
            radius,
            thickness,
        }
    }
}
