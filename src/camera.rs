//! Orbit camera with inertial damping.

use glam::{Mat4, Vec3};
use std::f32::consts::FRAC_PI_2;

use crate::params::RenderConfig;

const MIN_DISTANCE: f32 = 1.0;
const MAX_DISTANCE: f32 = 50.0;
const PITCH_MARGIN: f32 = 0.05;

/// Mouse-driven orbit controller around a fixed target.
///
/// Drag deltas feed angular velocity which decays exponentially, so the view
/// keeps gliding briefly after the mouse stops.
pub struct OrbitController {
    yaw: f32,
    pitch: f32,
    distance: f32,
    target: Vec3,

    yaw_velocity: f32,
    pitch_velocity: f32,
    dragging: bool,

    /// Velocity decay rate (per second)
    damping: f32,
    rotate_speed: f32,
    zoom_speed: f32,
}

impl OrbitController {
    pub fn new() -> Self {
        // Matches an initial eye position of roughly (0, 3, 5)
        let distance = Vec3::new(0.0, 3.0, 5.0).length();
        Self {
            yaw: 0.0,
            pitch: (3.0f32 / distance).asin(),
            distance,
            target: Vec3::ZERO,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            dragging: false,
            damping: 8.0,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
        }
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    /// Feed a cursor movement delta (pixels); only applies while dragging
    pub fn on_cursor_delta(&mut self, dx: f32, dy: f32) {
        if !self.dragging {
            return;
        }
        self.yaw_velocity = -dx * self.rotate_speed;
        self.pitch_velocity = dy * self.rotate_speed;
    }

    /// Feed a scroll delta (positive zooms in)
    pub fn on_scroll(&mut self, delta: f32) {
        self.distance =
            (self.distance * (1.0 - delta * self.zoom_speed)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Advance the orbit by one frame, applying and decaying velocity
    pub fn update(&mut self, dt: f32) {
        self.yaw += self.yaw_velocity;
        self.pitch = (self.pitch + self.pitch_velocity)
            .clamp(PITCH_MARGIN - FRAC_PI_2, FRAC_PI_2 - PITCH_MARGIN);

        let decay = (-self.damping * dt).exp();
        self.yaw_velocity *= decay;
        self.pitch_velocity *= decay;
    }

    /// Current eye position on the orbit sphere
    pub fn eye(&self) -> Vec3 {
        self.target
            + self.distance
                * Vec3::new(
                    self.pitch.cos() * self.yaw.sin(),
                    self.pitch.sin(),
                    self.pitch.cos() * self.yaw.cos(),
                )
    }

    /// Create view-projection matrix for rendering
    pub fn view_proj(&self, render_config: &RenderConfig) -> (Mat4, Vec3) {
        let eye = self.eye();
        let view = Mat4::look_at_rh(eye, self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            render_config.aspect_ratio(),
            render_config.near_plane,
            render_config.far_plane,
        );
        (proj * view, eye)
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_eye_position() {
        let camera = OrbitController::new();
        let eye = camera.eye();

        assert!((eye.x - 0.0).abs() < 1e-4);
        assert!((eye.y - 3.0).abs() < 1e-4);
        assert!((eye.z - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_damping_decays_velocity() {
        let mut camera = OrbitController::new();
        camera.set_dragging(true);
        camera.on_cursor_delta(100.0, 0.0);

        let yaw_before = camera.yaw;
        camera.update(1.0 / 60.0);
        let moved = (camera.yaw - yaw_before).abs();
        assert!(moved > 0.0);

        // After a few seconds of updates the motion has died out
        for _ in 0..300 {
            camera.update(1.0 / 60.0);
        }
        let yaw_settled = camera.yaw;
        camera.update(1.0 / 60.0);
        assert!((camera.yaw - yaw_settled).abs() < 1e-6);
    }

    #[test]
    fn test_drag_ignored_when_not_dragging() {
        let mut camera = OrbitController::new();
        camera.on_cursor_delta(100.0, 100.0);
        camera.update(1.0 / 60.0);

        let eye = camera.eye();
        assert!((eye.x - 0.0).abs() < 1e-4);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut camera = OrbitController::new();
        camera.set_dragging(true);

        for _ in 0..1000 {
            camera.on_cursor_delta(0.0, 1000.0);
            camera.update(1.0 / 60.0);
        }

        assert!(camera.pitch <= FRAC_PI_2 - PITCH_MARGIN + 1e-6);
        assert!(camera.eye().is_finite());
    }

    #[test]
    fn test_zoom_clamped() {
        let mut camera = OrbitController::new();

        for _ in 0..1000 {
            camera.on_scroll(1.0);
        }
        assert!(camera.distance >= MIN_DISTANCE);

        for _ in 0..1000 {
            camera.on_scroll(-1.0);
        }
        assert!(camera.distance <= MAX_DISTANCE);
    }

    #[test]
    fn test_view_proj_matrix_generation() {
        let camera = OrbitController::new();
        let render_config = RenderConfig::default();

        let (view_proj, eye) = camera.view_proj(&render_config);

        assert_ne!(view_proj, Mat4::IDENTITY);
        assert_ne!(view_proj, Mat4::ZERO);
        assert!(eye.is_finite());
    }
}
