//! A first-person free-fly camera controller.
//!
//! [`FreelookCamera`] turns per-frame [`CameraInputs`] into a [`Camera`]. The inputs
//! carry no windowing types, so the host decides which keys and buttons drive them
//! (see [`Input::camera_inputs`](crate::input::Input::camera_inputs)).
//!
//! # Example
//!
//! ```ignore
//! let mut camera = FreelookCamera::new()
//!     .position([0.0, 0.0, 5.0])
//!     .speed(3.0);
//!
//! // In frame loop:
//! camera.update(&frame.camera_inputs);
//! let view = camera.camera().view_matrix();
//! ```

use glam::{Vec2, Vec3};

use crate::camera::Camera;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Raw camera input for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraInputs {
    /// Mouse movement in pixels since the previous frame.
    pub mouse_delta: Vec2,
    /// Desired movement in camera space: x = right, y = up, z = forward.
    /// Each component is usually -1, 0 or 1.
    pub movement: Vec3,
    /// Seconds since the previous frame.
    pub dt: f32,
}

/// A free-fly camera controller.
///
/// # Controls (as bound by the host)
///
/// - **W/S**: Move forward/backward
/// - **A/D**: Strafe left/right
/// - **Space**: Move up
/// - **Left Shift**: Move down
/// - **Mouse** (right button held): Look around
#[derive(Clone, Debug)]
pub struct FreelookCamera {
    pub position: Vec3,
    /// Horizontal angle in radians (yaw). 0 = looking toward -Z.
    pub yaw: f32,
    /// Vertical angle in radians (pitch). 0 = horizontal, positive = up.
    pub pitch: f32,
    /// Field of view in radians.
    pub fov: f32,
    /// Radians of rotation per pixel of mouse movement.
    pub sensitivity: f32,
    /// Movement speed in units per second.
    pub speed: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for FreelookCamera {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            position: camera.position,
            yaw: 0.0,
            pitch: 0.0,
            fov: camera.fov,
            sensitivity: 0.003,
            speed: 5.0,
            near: camera.near,
            far: camera.far,
        }
    }
}

impl FreelookCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: impl Into<Vec3>) -> Self {
        self.position = position.into();
        self
    }

    /// Set the field of view in degrees.
    pub fn fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    /// Set the initial look direction using a direction vector.
    pub fn looking_toward(mut self, direction: impl Into<Vec3>) -> Self {
        let dir = direction.into().normalize_or_zero();
        self.yaw = dir.x.atan2(-dir.z);
        self.pitch = dir.y.asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self
    }

    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Compute the forward direction vector from current yaw and pitch.
    fn forward_direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
        .normalize_or_zero()
    }

    /// Compute the right direction vector (for strafing).
    fn right_direction(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin()).normalize_or_zero()
    }

    /// Advance orientation and position by one frame of input.
    pub fn update(&mut self, inputs: &CameraInputs) {
        self.yaw += inputs.mouse_delta.x * self.sensitivity;
        self.pitch -= inputs.mouse_delta.y * self.sensitivity;
        // Clamp pitch to avoid flipping over the poles
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let velocity = self.right_direction() * inputs.movement.x
            + Vec3::Y * inputs.movement.y
            + self.forward_direction() * inputs.movement.z;

        if velocity.length_squared() > 0.0 {
            self.position += velocity.normalize() * self.speed * inputs.dt;
        }
    }

    /// Get the current camera state.
    pub fn camera(&self) -> Camera {
        Camera {
            position: self.position,
            forward: self.forward_direction(),
            up: Vec3::Y,
            fov: self.fov,
            near: self.near,
            far: self.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn default_looks_down_negative_z() {
        let camera = FreelookCamera::new().camera();
        assert!(close(camera.forward, Vec3::NEG_Z));
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn forward_movement_scales_with_speed_and_dt() {
        let mut camera = FreelookCamera::new().position(Vec3::ZERO).speed(2.0);
        camera.update(&CameraInputs {
            movement: Vec3::Z,
            dt: 0.5,
            ..Default::default()
        });
        assert!(close(camera.position, Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn diagonal_movement_is_normalized() {
        let mut camera = FreelookCamera::new().position(Vec3::ZERO).speed(1.0);
        camera.update(&CameraInputs {
            movement: Vec3::new(1.0, 0.0, 1.0),
            dt: 1.0,
            ..Default::default()
        });
        assert!((camera.position.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mouse_moves_yaw_and_pitch() {
        let mut camera = FreelookCamera::new().sensitivity(0.01);
        camera.update(&CameraInputs {
            mouse_delta: Vec2::new(10.0, -20.0),
            ..Default::default()
        });
        assert!((camera.yaw - 0.1).abs() < 1e-6);
        assert!((camera.pitch - 0.2).abs() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped_short_of_vertical() {
        let mut camera = FreelookCamera::new().sensitivity(1.0);
        camera.update(&CameraInputs {
            mouse_delta: Vec2::new(0.0, -1000.0),
            ..Default::default()
        });
        assert_eq!(camera.pitch, PITCH_LIMIT);

        camera.update(&CameraInputs {
            mouse_delta: Vec2::new(0.0, 5000.0),
            ..Default::default()
        });
        assert_eq!(camera.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn looking_toward_sets_angles() {
        let camera = FreelookCamera::new().looking_toward(Vec3::X);
        assert!(close(camera.camera().forward, Vec3::X));
    }
}
