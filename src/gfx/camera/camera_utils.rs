use cgmath::{Matrix4, SquareMatrix};
use winit::event::{DeviceEvent, KeyEvent, MouseScrollDelta};

use super::{camera_controller::CameraController, orbit_camera::OrbitCamera};

/// Camera plus the controller that drives it
pub struct CameraManager {
    pub camera: OrbitCamera,
    pub controller: CameraController,
}

impl CameraManager {
    pub fn new(camera: OrbitCamera, controller: CameraController) -> Self {
        Self { camera, controller }
    }

    pub fn process_event(&mut self, event: &DeviceEvent) {
        self.controller.process_events(event);
    }

    pub fn process_keyboard_event(&mut self, event: &KeyEvent) {
        self.controller.process_keyed_events(event, &mut self.camera);
    }

    pub fn process_scroll(&mut self, delta: &MouseScrollDelta) {
        self.controller.process_scroll(delta);
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.controller.set_mouse_pressed(dragging);
    }

    /// Applies damped input and refreshes the uniform; call once per frame
    pub fn update(&mut self) {
        self.controller.update_camera(&mut self.camera);
        self.camera.update_view_proj();
    }
}

pub trait Camera: Sized {
    fn build_view_projection_matrix(&self) -> Matrix4<f32>;
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniform {
    /// The eye position of the camera in homogenous coordinates.
    ///
    /// Homogenous coordinates are used to fullfill the 16 byte alignment requirement.
    pub view_position: [f32; 4],

    /// Contains the view projection matrix.
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    /// Creates a default [CameraUniform].
    fn default() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: convert_matrix4_to_array(Matrix4::identity()),
        }
    }
}

impl CameraUniform {
    /// Inverse of `view_proj`, identity when it is singular
    pub fn inverse_view_proj(&self) -> [[f32; 4]; 4] {
        let m: Matrix4<f32> = self.view_proj.into();
        convert_matrix4_to_array(m.invert().unwrap_or_else(Matrix4::identity))
    }
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_of_identity_is_identity() {
        let uniform = CameraUniform::default();
        assert_eq!(uniform.inverse_view_proj(), convert_matrix4_to_array(Matrix4::identity()));
    }

    #[test]
    fn inverse_round_trips_translation() {
        let m = Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0));
        let uniform = CameraUniform {
            view_position: [0.0; 4],
            view_proj: convert_matrix4_to_array(m),
        };
        let inv: Matrix4<f32> = uniform.inverse_view_proj().into();
        assert_eq!(inv * m, Matrix4::identity());
    }
}
