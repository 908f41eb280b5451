//! Synthetic device frames.
//!
//! Renders an idealized device face (calibration strip, barcode, ratchet
//! ring and dots, top markers, scrolly, slider) into the three frame planes.
//! Used by the integration tests of this workspace; the layout constants
//! mirror [`DeviceGeometry::for_family`] so a rendered frame is locatable
//! with default parameters.

use nalgebra::Point2;

use dialtrack_core::{FrameView, PlaneBuf};

use crate::device::DeviceFamily;
use crate::DeviceGeometry;

/// Cumulative multi-dot pattern angles; gaps read 45°, 67.5°, 112.5°, 135°.
pub const MULTI_DOT_PATTERN: [f32; 4] = [0.0, 45.0, 112.5, 225.0];

/// Layout description of one synthetic frame.
#[derive(Clone, Debug)]
pub struct SyntheticDevice {
    pub family: DeviceFamily,
    pub width: usize,
    pub height: usize,
    pub ratchet_center: Point2<f32>,
    /// Inner radius of the red reference ring.
    pub ring_radius: f32,
    /// Wheel rotation added to every ratchet dot angle.
    pub ratchet_angle_deg: f32,
    pub scrolly_angle_deg: f32,
    /// Horizontal position of the slider dot.
    pub slider_x: f32,
    pub device_id: u32,
}

impl SyntheticDevice {
    pub fn new(family: DeviceFamily) -> Self {
        Self {
            family,
            width: 320,
            height: 240,
            ratchet_center: Point2::new(130.0, 130.0),
            ring_radius: 45.0,
            ratchet_angle_deg: 0.0,
            scrolly_angle_deg: 90.0,
            slider_x: 126.0,
            device_id: 714,
        }
    }

    fn geometry(&self) -> DeviceGeometry {
        DeviceGeometry::for_family(self.family)
    }

    /// Radius of the dot track the angle finder samples.
    pub fn dot_track_radius(&self) -> f32 {
        self.ring_radius + self.geometry().ratchet_radius_offset
    }

    /// Vertical position of the three top markers.
    pub fn marker_y(&self) -> f32 {
        let g = self.geometry();
        self.ratchet_center.y
            - self.dot_track_radius()
            - g.marker_band_offset
            - 0.5 * g.marker_band_height as f32
    }

    pub fn scrolly_center(&self) -> Point2<f32> {
        Point2::new(self.ratchet_center.x + 100.0, self.marker_y())
    }

    /// Image-space angles of the rendered ratchet dots.
    pub fn ratchet_dot_angles(&self) -> Vec<f32> {
        let dots: &[f32] = if self.family.is_multi_dot() {
            &MULTI_DOT_PATTERN
        } else {
            &[0.0, 90.0]
        };
        dots.iter()
            .map(|a| (a + self.ratchet_angle_deg).rem_euclid(360.0))
            .collect()
    }

    pub fn render(&self) -> SyntheticFrame {
        let g = self.geometry();
        let mut luma = PlaneBuf::new(self.width, self.height);
        let chroma_blue = PlaneBuf::new(self.width, self.height);
        let mut chroma_red = PlaneBuf::new(self.width, self.height);

        // calibration strip: dots in the upper half, barcode in the lower
        let strip_x = self.width as i32 - 30;
        for i in 0..g.min_calibration_dots {
            fill_disk(&mut luma, strip_x as f32, 18.0 + 20.0 * i as f32, 3.0, 255);
        }
        render_barcode(&mut luma, strip_x, self.height as i32, self.device_id);

        // red reference ring around the ratchet
        fill_ring(
            &mut chroma_red,
            self.ratchet_center.x,
            self.ratchet_center.y,
            self.ring_radius,
            self.ring_radius + g.ratchet_thickness,
            255,
        );

        // ratchet dots on the dot track
        let track = self.dot_track_radius();
        for a in self.ratchet_dot_angles() {
            let (sin_a, cos_a) = a.to_radians().sin_cos();
            fill_disk(
                &mut luma,
                self.ratchet_center.x + track * cos_a,
                self.ratchet_center.y + track * sin_a,
                3.0,
                230,
            );
        }

        // top markers: slider-left, slider-right, scrolly
        let my = self.marker_y();
        let scrolly = self.scrolly_center();
        fill_disk(&mut luma, self.ratchet_center.x - 40.0, my, 3.0, 255);
        fill_disk(&mut luma, self.ratchet_center.x + 40.0, my, 3.0, 255);
        fill_disk(&mut luma, scrolly.x, scrolly.y, 3.0, 255);

        // slider dot, dimmer than the markers flanking it
        fill_disk(&mut luma, self.slider_x, my, 3.0, 200);

        // scrolly rim dot
        let (sin_s, cos_s) = self.scrolly_angle_deg.to_radians().sin_cos();
        fill_disk(
            &mut luma,
            scrolly.x + g.scrolly_radius * cos_s,
            scrolly.y + g.scrolly_radius * sin_s,
            2.5,
            220,
        );

        // satellite reference dots
        if let Some(angles) = g.satellite_angles_deg {
            let rho = track + g.satellite_reach;
            for a in angles {
                let (sin_a, cos_a) = a.to_radians().sin_cos();
                fill_disk(
                    &mut luma,
                    self.ratchet_center.x + rho * cos_a,
                    self.ratchet_center.y + rho * sin_a,
                    3.0,
                    240,
                );
            }
        }

        SyntheticFrame {
            width: self.width,
            height: self.height,
            luma: luma.data,
            chroma_blue: chroma_blue.data,
            chroma_red: chroma_red.data,
        }
    }
}

/// Owned planes of one rendered frame.
#[derive(Clone, Debug)]
pub struct SyntheticFrame {
    pub width: usize,
    pub height: usize,
    pub luma: Vec<u8>,
    pub chroma_blue: Vec<u8>,
    pub chroma_red: Vec<u8>,
}

impl SyntheticFrame {
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            luma: &self.luma,
            chroma_blue: &self.chroma_blue,
            chroma_red: &self.chroma_red,
        }
    }
}

/// Bit layout matching `BarcodeConfig::default()`: `101` borders, 10 data
/// bits, 5 checksum bits with `value mod 31`.
pub fn barcode_bits(value: u32) -> Vec<bool> {
    let checksum = value % 31;
    let mut bits = vec![true, false, true];
    for i in (0..10).rev() {
        bits.push((value >> i) & 1 == 1);
    }
    for i in (0..5).rev() {
        bits.push((checksum >> i) & 1 == 1);
    }
    bits.extend([true, false, true]);
    bits
}

fn render_barcode(luma: &mut PlaneBuf, strip_x: i32, height: i32, value: u32) {
    let bits = barcode_bits(value);
    let slot = 5i32;
    let y0 = height / 2 + 5;
    for (k, &bit) in bits.iter().enumerate() {
        if !bit {
            continue;
        }
        let top = y0 + k as i32 * slot;
        for y in top..top + slot {
            for x in strip_x - 2..=strip_x + 2 {
                luma.put(x, y, 255);
            }
        }
    }
}

fn fill_disk(buf: &mut PlaneBuf, cx: f32, cy: f32, r: f32, value: u8) {
    let r2 = r * r;
    let (x0, x1) = ((cx - r).floor() as i32, (cx + r).ceil() as i32);
    let (y0, y1) = ((cy - r).floor() as i32, (cy + r).ceil() as i32);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= r2 {
                buf.put(x, y, value);
            }
        }
    }
}

fn fill_ring(buf: &mut PlaneBuf, cx: f32, cy: f32, r0: f32, r1: f32, value: u8) {
    let (x0, x1) = ((cx - r1).floor() as i32, (cx + r1).ceil() as i32);
    let (y0, y1) = ((cy - r1).floor() as i32, (cy + r1).ceil() as i32);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let d2 = dx * dx + dy * dy;
            if d2 >= r0 * r0 && d2 <= r1 * r1 {
                buf.put(x, y, value);
            }
        }
    }
}
