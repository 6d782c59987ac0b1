use glam::Vec3;

/// Uniform state of the ocean surface.
///
/// The time uniform is frame-count driven: every submitted frame adds one
/// fixed step regardless of how much wall-clock time passed.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterMaterial {
    pub sun_direction: Vec3,
    pub sun_color: Vec3,
    pub water_color: Vec3,
    pub distortion_scale: f32,
    pub size: f32,
    pub alpha: f32,
    /// Edge length of the square water plane in world units.
    pub extent: f32,
    base_time: f32,
    time_step: f32,
    frames: u64,
}

impl Default for WaterMaterial {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl WaterMaterial {
    pub fn new(time_step: f32) -> Self {
        Self {
            sun_direction: Vec3::Y,
            sun_color: Vec3::ONE,
            water_color: hex_color(0x001e0f),
            distortion_scale: 3.7,
            size: 1.0,
            alpha: 1.0,
            extent: 100_000.0,
            base_time: 0.0,
            time_step,
            frames: 0,
        }
    }

    pub fn time(&self) -> f32 {
        (self.base_time as f64 + self.frames as f64 * self.time_step as f64) as f32
    }

    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Advance the wave animation by exactly one frame step.
    pub fn advance_frame(&mut self) {
        self.frames += 1;
    }
}

pub fn hex_color(rgb: u32) -> Vec3 {
    Vec3::new(
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_is_frame_count_times_step() {
        let mut water = WaterMaterial::new(1.0 / 60.0);
        for _ in 0..600 {
            water.advance_frame();
        }
        assert_eq!(water.frames(), 600);
        assert!((water.time() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_time_strictly_increases() {
        let mut water = WaterMaterial::default();
        let mut last = water.time();
        for _ in 0..1000 {
            water.advance_frame();
            let now = water.time();
            assert!(now > last);
            last = now;
        }
    }

    #[test]
    fn test_hex_color() {
        let c = hex_color(0x001e0f);
        assert_eq!(c.x, 0.0);
        assert!((c.y - 30.0 / 255.0).abs() < 1e-6);
        assert!((c.z - 15.0 / 255.0).abs() < 1e-6);
    }
}
