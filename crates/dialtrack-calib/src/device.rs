use serde::{Deserialize, Serialize};

use dialtrack_core::Region;

/// Supported hardware variants. Each family carries its own marker layout
/// and dot-count rules; `Legacy` units decode an id but are not trackable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    Mvp,
    Inhouse,
    Injection,
    Manta,
    Legacy,
}

impl DeviceFamily {
    /// Families whose ratchet carries the four-gap multi-dot pattern.
    #[inline]
    pub fn is_multi_dot(&self) -> bool {
        matches!(self, DeviceFamily::Injection | DeviceFamily::Manta)
    }
}

/// Frozen per-device constants.
///
/// The numeric values were fitted against the frozen detection algorithms
/// (the bubble-fit stop policy in particular) and must travel with them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceGeometry {
    pub family: DeviceFamily,
    /// Acceptable dot counts on the calibration strip.
    pub min_calibration_dots: usize,
    pub max_calibration_dots: usize,
    /// Physical spacing of the top two calibration dots, millimetres.
    pub dot_spacing_mm: f32,
    /// Ratchet search window as fractions of the frame extent (l, t, r, b).
    pub ratchet_search: [f32; 4],
    /// Added to the fitted ring radius to reach the dot track.
    pub ratchet_radius_offset: f32,
    pub ratchet_thickness: f32,
    pub scrolly_radius: f32,
    pub scrolly_thickness: f32,
    /// Ray angles (degrees) toward the two satellite dots; injection only.
    pub satellite_angles_deg: Option<[f32; 2]>,
    /// Satellite distance beyond the ratchet radius, pixels.
    pub satellite_reach: f32,
    /// Max deviation between the fitted and the satellite-reconstructed
    /// ratchet centre, pixels.
    pub satellite_center_tolerance: f32,
    /// Occluded image zone where ratchet dot detections are discarded.
    pub blackout: Option<Region>,
    /// Gap between the ratchet ring top and the top-marker band, pixels.
    pub marker_band_offset: f32,
    pub marker_band_height: i32,
}

impl DeviceGeometry {
    pub fn for_family(family: DeviceFamily) -> Self {
        let base = Self {
            family,
            min_calibration_dots: 2,
            max_calibration_dots: 3,
            dot_spacing_mm: 4.0,
            ratchet_search: [0.05, 0.05, 0.85, 0.95],
            ratchet_radius_offset: 6.0,
            ratchet_thickness: 4.0,
            scrolly_radius: 28.0,
            scrolly_thickness: 3.0,
            satellite_angles_deg: None,
            satellite_reach: 14.0,
            satellite_center_tolerance: 4.0,
            blackout: None,
            marker_band_offset: 10.0,
            marker_band_height: 18,
        };
        match family {
            DeviceFamily::Mvp => base,
            DeviceFamily::Inhouse => Self {
                dot_spacing_mm: 4.5,
                ..base
            },
            DeviceFamily::Injection => Self {
                min_calibration_dots: 5,
                max_calibration_dots: 5,
                dot_spacing_mm: 5.0,
                satellite_angles_deg: Some([45.0, 135.0]),
                blackout: Some(Region::new(0, 0, 24, 24)),
                ..base
            },
            DeviceFamily::Manta => Self {
                min_calibration_dots: 5,
                max_calibration_dots: 5,
                dot_spacing_mm: 5.0,
                ..base
            },
            DeviceFamily::Legacy => Self {
                dot_spacing_mm: 3.5,
                ..base
            },
        }
    }
}
