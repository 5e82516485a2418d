use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use super::orbit_camera::OrbitCamera;

/// Below this a pending delta is dropped
const SETTLE_EPSILON: f32 = 1e-5;

/// Orbit controls with inertia.
///
/// Input is accumulated as pending deltas; every frame `update_camera` applies
/// a `damping` fraction of what is pending and keeps the rest, so motion eases
/// out instead of stopping dead.
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub damping: f32,
    is_shift_held: bool,
    is_mouse_pressed: bool,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_zoom: f32,
    pending_pan: (f32, f32),
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed: 0.01,
            damping: 0.05,
            is_shift_held: false,
            is_mouse_pressed: false,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_zoom: 0.0,
            pending_pan: (0.0, 0.0),
        }
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn process_events(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if !self.is_mouse_pressed {
                return;
            }
            if self.is_shift_held {
                // SHIFT + DRAG = PAN (move focus point)
                self.pending_pan.0 += -delta.0 as f32 * self.pan_speed;
                self.pending_pan.1 += delta.1 as f32 * self.pan_speed;
            } else {
                // NORMAL DRAG = ROTATE (orbit around focus)
                self.pending_yaw += -delta.0 as f32 * self.rotate_speed;
                self.pending_pitch += delta.1 as f32 * self.rotate_speed;
            }
        }
    }

    pub fn process_scroll(&mut self, delta: &MouseScrollDelta) {
        let scroll_amount = -match delta {
            MouseScrollDelta::LineDelta(_, scroll) => *scroll,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => *scroll as f32,
        };
        self.pending_zoom += scroll_amount * self.zoom_speed;
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent, _camera: &mut OrbitCamera) {
        if let KeyEvent {
            physical_key: PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight),
            state,
            ..
        } = event
        {
            let was_shift_held = self.is_shift_held;
            self.is_shift_held = *state == ElementState::Pressed;
            if was_shift_held != self.is_shift_held {
                log::trace!("shift held: {}", self.is_shift_held);
            }
        }
    }

    pub fn set_mouse_pressed(&mut self, pressed: bool) {
        self.is_mouse_pressed = pressed;
    }

    /// Applies one damped step of the pending input to `camera`
    pub fn update_camera(&mut self, camera: &mut OrbitCamera) {
        let factor = if self.damping > 0.0 && self.damping < 1.0 {
            self.damping
        } else {
            1.0
        };

        if self.pending_yaw != 0.0 {
            camera.add_yaw(self.pending_yaw * factor);
        }
        if self.pending_pitch != 0.0 {
            camera.add_pitch(self.pending_pitch * factor);
        }
        if self.pending_zoom != 0.0 {
            camera.add_distance(self.pending_zoom * factor);
        }
        if self.pending_pan != (0.0, 0.0) {
            camera.pan((self.pending_pan.0 * factor, self.pending_pan.1 * factor));
        }

        let decay = |v: &mut f32| {
            *v *= 1.0 - factor;
            if v.abs() < SETTLE_EPSILON {
                *v = 0.0;
            }
        };
        decay(&mut self.pending_yaw);
        decay(&mut self.pending_pitch);
        decay(&mut self.pending_zoom);
        decay(&mut self.pending_pan.0);
        decay(&mut self.pending_pan.1);
    }

    /// Whether damped motion is still in progress
    pub fn is_moving(&self) -> bool {
        self.pending_yaw != 0.0
            || self.pending_pitch != 0.0
            || self.pending_zoom != 0.0
            || self.pending_pan != (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Vector3, Zero};

    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), 1.0)
    }

    #[test]
    fn motion_without_button_is_ignored() {
        let mut controller = CameraController::new(0.01, 0.5);
        controller.process_events(&DeviceEvent::MouseMotion { delta: (10.0, 0.0) });
        assert!(!controller.is_moving());
    }

    #[test]
    fn damped_rotation_eases_toward_full_delta() {
        let mut controller = CameraController::new(0.01, 0.5);
        let mut camera = camera();
        let start_yaw = camera.yaw;

        controller.set_mouse_pressed(true);
        controller.process_events(&DeviceEvent::MouseMotion { delta: (-20.0, 0.0) });
        controller.set_mouse_pressed(false);

        controller.update_camera(&mut camera);
        let first_step = camera.yaw - start_yaw;
        assert!((first_step - 0.2 * 0.05).abs() < 1e-5);

        for _ in 0..1000 {
            controller.update_camera(&mut camera);
        }
        assert!(!controller.is_moving());
        assert!((camera.yaw - start_yaw - 0.2).abs() < 1e-3);
    }

    #[test]
    fn undamped_controller_applies_everything_at_once() {
        let mut controller = CameraController::new(0.01, 0.5).with_damping(0.0);
        let mut camera = camera();
        controller.process_scroll(&MouseScrollDelta::LineDelta(0.0, -2.0));
        controller.update_camera(&mut camera);
        assert!(!controller.is_moving());
        assert!(camera.distance > 5.0);
    }

    #[test]
    fn shift_drag_pans() {
        let mut controller = CameraController::new(0.01, 0.5).with_damping(0.0);
        let mut camera = camera();
        let start_yaw = camera.yaw;
        controller.is_shift_held = true;
        controller.set_mouse_pressed(true);

        controller.process_events(&DeviceEvent::MouseMotion { delta: (-10.0, 0.0) });
        controller.update_camera(&mut camera);
        assert!(camera.target.x > 0.0);
        assert_eq!(camera.yaw, start_yaw);
    }
}
