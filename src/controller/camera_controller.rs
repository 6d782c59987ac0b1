use crate::controller::input::MovementState;
use crate::model::camera::PITCH_LIMIT;
use crate::model::Camera;

/// Handles camera movement and orientation
#[derive(Debug, Clone)]
pub struct CameraController {
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(10.0, 0.002)
    }
}

impl CameraController {
    pub fn new(move_speed: f32, mouse_sensitivity: f32) -> Self {
        Self { move_speed, mouse_sensitivity }
    }

    /// Apply mouse look delta to camera
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        camera.yaw += dx * self.mouse_sensitivity;
        camera.pitch = (camera.pitch - dy * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Translate the camera along its local axes for every held direction.
    ///
    /// Each flag contributes `move_speed * dt` on its own axis; opposite
    /// flags cancel.
    pub fn apply_movement(&self, camera: &mut Camera, movement: &MovementState, dt: f32) {
        let step = self.move_speed * dt;
        if movement.forward {
            camera.translate_z(-step);
        }
        if movement.backward {
            camera.translate_z(step);
        }
        if movement.left {
            camera.translate_x(-step);
        }
        if movement.right {
            camera.translate_x(step);
        }
    }
}
