/// Platform-agnostic input handling
use winit::keyboard::KeyCode;

use crate::model::{Pose, SunParameters};

/// Everything the frame loop reacts to, queued by the window layer and
/// drained once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard
    KeyDown(KeyCode),
    KeyUp(KeyCode),

    // Mouse drag, in physical pixels
    Look { dx: f32, dy: f32 },

    // Window
    Resized { width: u32, height: u32 },
    FocusLost,

    // GUI
    SunChanged(SunParameters),
    SubmarinePose(Pose),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
}

/// The four held-direction flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, movement: Movement, pressed: bool) {
        match movement {
            Movement::Forward => self.forward = pressed,
            Movement::Backward => self.backward = pressed,
            Movement::Left => self.left = pressed,
            Movement::Right => self.right = pressed,
        }
    }

    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Key mapping configuration
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            backward: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
        }
    }
}

impl KeyBindings {
    pub fn movement_for(&self, key: KeyCode) -> Option<Movement> {
        if key == self.forward {
            Some(Movement::Forward)
        } else if key == self.backward {
            Some(Movement::Backward)
        } else if key == self.left {
            Some(Movement::Left)
        } else if key == self.right {
            Some(Movement::Right)
        } else {
            None
        }
    }

    /// Apply a key transition; unbound keys leave the state untouched.
    pub fn apply(&self, state: &mut MovementState, key: KeyCode, pressed: bool) -> bool {
        match self.movement_for(key) {
            Some(movement) => {
                state.set(movement, pressed);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_down_sets_and_key_up_clears() {
        let bindings = KeyBindings::default();
        let mut state = MovementState::new();
        assert!(!state.any());

        assert!(bindings.apply(&mut state, KeyCode::KeyW, true));
        assert!(bindings.apply(&mut state, KeyCode::KeyD, true));
        assert!(state.forward && state.right);
        assert!(!state.backward && !state.left);

        bindings.apply(&mut state, KeyCode::KeyW, false);
        assert!(!state.forward && state.right);
    }

    #[test]
    fn test_unbound_keys_are_ignored() {
        let bindings = KeyBindings::default();
        let mut state = MovementState { left: true, ..Default::default() };
        assert!(!bindings.apply(&mut state, KeyCode::KeyQ, true));
        assert!(!bindings.apply(&mut state, KeyCode::ArrowUp, false));
        assert_eq!(state, MovementState { left: true, ..Default::default() });
    }

    #[test]
    fn test_repeated_key_down_is_idempotent() {
        let bindings = KeyBindings::default();
        let mut state = MovementState::new();
        for _ in 0..3 {
            bindings.apply(&mut state, KeyCode::KeyS, true);
        }
        bindings.apply(&mut state, KeyCode::KeyS, false);
        assert!(!state.any());
    }
}
