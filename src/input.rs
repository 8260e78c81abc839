use std::collections::HashSet;

use glam::{Vec2, Vec3};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::freelook_camera::CameraInputs;

/// Button that enables mouse look while held.
pub const LOOK_BUTTON: MouseButton = MouseButton::Right;

/// Tracks input state for keyboard and mouse.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    self.mouse_buttons_down.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons_down.remove(button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } | WindowEvent::Focused(false) => {
                // Forget held state so nothing sticks while the window can't see releases.
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
                self.mouse_position = None;
            }
            _ => {}
        }
    }

    pub(crate) fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub(crate) fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    fn move_cursor(&mut self, position: Vec2) {
        if let Some(previous) = self.mouse_position {
            self.mouse_delta += position - previous;
        }
        self.mouse_position = Some(position);
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame (key repeats excluded).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Mouse movement delta this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// WASD/Space/Shift as a camera-space movement vector.
    fn movement(&self) -> Vec3 {
        let axis = |positive: KeyCode, negative: KeyCode| {
            self.key_down(positive) as i32 as f32 - self.key_down(negative) as i32 as f32
        };
        Vec3::new(
            axis(KeyCode::KeyD, KeyCode::KeyA),
            axis(KeyCode::Space, KeyCode::ShiftLeft),
            axis(KeyCode::KeyW, KeyCode::KeyS),
        )
    }

    /// This frame's camera input. Mouse movement only counts while [`LOOK_BUTTON`] is held.
    pub fn camera_inputs(&self, dt: f32) -> CameraInputs {
        let mouse_delta = if self.mouse_down(LOOK_BUTTON) {
            self.mouse_delta
        } else {
            Vec2::ZERO
        };
        CameraInputs {
            mouse_delta,
            movement: self.movement(),
            dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_only_on_first_frame() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyI);
        assert!(input.key_pressed(KeyCode::KeyI));

        input.begin_frame();
        // OS key repeat
        input.press_key(KeyCode::KeyI);
        assert!(!input.key_pressed(KeyCode::KeyI));
        assert!(input.key_down(KeyCode::KeyI));

        input.release_key(KeyCode::KeyI);
        assert!(!input.key_down(KeyCode::KeyI));
    }

    #[test]
    fn movement_combines_opposing_keys() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyW);
        input.press_key(KeyCode::KeyA);
        input.press_key(KeyCode::KeyD);
        input.press_key(KeyCode::Space);

        let inputs = input.camera_inputs(0.016);
        assert_eq!(inputs.movement, Vec3::new(0.0, 1.0, 1.0));
        assert_eq!(inputs.dt, 0.016);
    }

    #[test]
    fn first_cursor_position_has_no_delta() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(400.0, 300.0));
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.move_cursor(Vec2::new(410.0, 295.0));
        input.move_cursor(Vec2::new(412.0, 290.0));
        assert_eq!(input.mouse_delta(), Vec2::new(12.0, -10.0));
    }

    #[test]
    fn mouse_look_requires_look_button() {
        let mut input = Input::new();
        input.move_cursor(Vec2::ZERO);
        input.move_cursor(Vec2::new(5.0, 5.0));
        assert_eq!(input.camera_inputs(0.0).mouse_delta, Vec2::ZERO);

        input.mouse_buttons_down.insert(LOOK_BUTTON);
        assert_eq!(input.camera_inputs(0.0).mouse_delta, Vec2::new(5.0, 5.0));
    }
}
