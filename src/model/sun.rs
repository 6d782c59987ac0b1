use std::ops::RangeInclusive;

use glam::Vec3;

pub const ELEVATION_RANGE: RangeInclusive<f32> = -90.0..=180.0;
pub const AZIMUTH_RANGE: RangeInclusive<f32> = -180.0..=180.0;

/// Sun placement in degrees, as edited from the GUI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunParameters {
    pub elevation: f32,
    pub azimuth: f32,
}

impl Default for SunParameters {
    fn default() -> Self {
        Self {
            elevation: 2.0,
            azimuth: 180.0,
        }
    }
}

impl SunParameters {
    pub fn new(elevation: f32, azimuth: f32) -> Self {
        Self { elevation, azimuth }
    }

    /// Clamp both angles into their slider ranges.
    pub fn clamped(self) -> Self {
        Self {
            elevation: self.elevation.clamp(*ELEVATION_RANGE.start(), *ELEVATION_RANGE.end()),
            azimuth: self.azimuth.clamp(*AZIMUTH_RANGE.start(), *AZIMUTH_RANGE.end()),
        }
    }

    pub fn direction(&self) -> Vec3 {
        sun_direction(self.elevation, self.azimuth)
    }
}

/// Unit vector pointing at the sun.
///
/// Spherical to Cartesian with `phi = 90° - elevation` measured from +Y and
/// `theta = azimuth` measured from +X towards +Z.
pub fn sun_direction(elevation_deg: f32, azimuth_deg: f32) -> Vec3 {
    let phi = (90.0 - elevation_deg).to_radians();
    let theta = azimuth_deg.to_radians();
    let sin_phi = phi.sin();
    Vec3::new(sin_phi * theta.cos(), phi.cos(), sin_phi * theta.sin())
}
