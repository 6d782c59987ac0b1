use glam::{Mat4, Vec3};

/// Largest pitch magnitude in radians, slightly less than π/2 to avoid gimbal lock.
pub const PITCH_LIMIT: f32 = 1.5533;

pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 10.0, 9100.0),
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            up: Vec3::Y,
            fov_y: 60f32.to_radians(),
            aspect: aspect_ratio(width, height),
            z_near: 1.0,
            z_far: 20000.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let cy = self.yaw;
        let cp = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        Vec3::new(cy.cos() * cp.cos(), cp.sin(), cy.sin() * cp.cos()).normalize()
    }

    /// Camera-local +X axis in world space.
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize()
    }

    pub fn target(&self) -> Vec3 { self.eye + self.forward() }

    pub fn set_aspect(&mut self, width: u32, height: u32) { self.aspect = aspect_ratio(width, height); }

    /// Move along the camera-local Z axis. Negative distances move towards
    /// the view direction, matching a right-handed camera looking down -Z.
    pub fn translate_z(&mut self, distance: f32) {
        self.eye -= self.forward() * distance;
    }

    /// Move along the camera-local X axis (positive is to the right).
    pub fn translate_x(&mut self, distance: f32) {
        self.eye += self.right() * distance;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target(), self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn set_look_at(&mut self, target: Vec3) {
        let dir = (target - self.eye).normalize();
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Place the camera the way an orbit rig with a distance limit would:
    /// on the ray from `target` towards `requested`, at most `max_distance`
    /// away from the target, looking at the target.
    pub fn place_orbit(&mut self, target: Vec3, requested: Vec3, max_distance: f32) {
        let offset = requested - target;
        let distance = offset.length();
        self.eye = if distance > max_distance {
            target + offset / distance * max_distance
        } else {
            requested
        };
        self.set_look_at(target);
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbit_placement_is_clamped() {
        let mut cam = Camera::new(1280, 720);
        let target = Vec3::new(0.0, 10.0, 8900.0);
        cam.place_orbit(target, Vec3::new(0.0, 200.0, 1_000_000.0), 200.0);
        assert!((cam.eye.distance(target) - 200.0).abs() < 1e-2);
        // looking back towards the target, i.e. down -Z
        assert!(cam.forward().z < -0.99);
    }

    #[test]
    fn test_local_translation_axes() {
        let mut cam = Camera::new(800, 600);
        cam.eye = Vec3::ZERO;
        cam.yaw = -std::f32::consts::FRAC_PI_2;
        cam.pitch = 0.0;

        cam.translate_z(-5.0);
        assert!((cam.eye - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);

        cam.translate_x(2.0);
        assert!((cam.eye - Vec3::new(2.0, 0.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn test_look_at_steep_target_uses_pitch_limit() {
        let mut cam = Camera::new(800, 600);
        cam.eye = Vec3::ZERO;
        cam.set_look_at(Vec3::new(0.01, 100.0, 0.0));
        assert_eq!(cam.pitch, PITCH_LIMIT);

        cam.set_look_at(Vec3::new(0.0, -1.0, 1.0));
        assert!((cam.pitch + std::f32::consts::FRAC_PI_4).abs() < 1e-5);
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let mut cam = Camera::new(800, 0);
        assert!(cam.aspect.is_finite());
        cam.set_aspect(1024, 512);
        assert_eq!(cam.aspect, 2.0);
    }
}
