use cgmath::*;

use super::camera_utils::{convert_matrix4_to_array, Camera, CameraUniform};
use crate::interaction::{PointerState, Ray, RayCaster};

/// Remaps OpenGL clip depth [-1, 1] to wgpu's [0, 1]; arguments are columns
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Y-up camera orbiting `target` at `distance`
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub uniform: CameraUniform,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.gl_view_projection()
    }
}

impl RayCaster for OrbitCamera {
    /// Unprojects the pointer at the near and far planes of the render matrix
    fn cast_ray(&self, pointer: PointerState) -> Option<Ray> {
        if !self.has_valid_projection() {
            return None;
        }
        let inv_view_proj = self.build_view_projection_matrix().invert()?;

        // wgpu clip depth: 0 at the near plane, 1 at the far plane
        let unproject = |z: f32| {
            let p = inv_view_proj * Vector4::new(pointer.x, pointer.y, z, 1.0);
            (p.w.abs() > f32::EPSILON).then(|| p.truncate() / p.w)
        };
        let near = unproject(0.0)?;
        let far = unproject(1.0)?;

        let direction = far - near;
        if direction.magnitude2() <= f32::EPSILON {
            return None;
        }
        Some(Ray::new(near, direction))
    }
}

impl OrbitCamera {
    pub fn new(distance: f32, pitch: f32, yaw: f32, target: Vector3<f32>, aspect: f32) -> Self {
        let mut camera = Self {
            distance,
            pitch,
            yaw,
            eye: Vector3::zero(), // Will be auto-calculted in `update()` nevertheless.
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy: Rad(std::f32::consts::PI / 4.0),
            znear: 0.1,
            zfar: 1000.0,
            uniform: CameraUniform::default(),
        };
        camera.update();
        camera
    }

    /// Camera at `position` orbiting `target`
    pub fn looking_at(position: Vector3<f32>, target: Vector3<f32>, aspect: f32) -> Self {
        let offset = position - target;
        let distance = offset.magnitude().max(f32::EPSILON);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        let yaw = offset.x.atan2(offset.z);
        Self::new(distance, pitch, yaw, target, aspect)
    }

    pub fn with_perspective(mut self, fovy: impl Into<Rad<f32>>, znear: f32, zfar: f32) -> Self {
        self.fovy = fovy.into();
        self.znear = znear;
        self.zfar = zfar;
        self
    }

    pub fn with_bounds(mut self, bounds: OrbitCameraBounds) -> Self {
        self.bounds = bounds;
        self.set_distance(self.distance);
        self
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    /// Logarithmic zoom so steps feel the same near and far
    pub fn add_distance(&mut self, delta: f32) {
        let corrected_zoom = f32::log10(self.distance.max(1.1)) * delta;
        self.set_distance(self.distance + corrected_zoom);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        let mut bounded_yaw = yaw;
        if let Some(min_yaw) = self.bounds.min_yaw {
            bounded_yaw = bounded_yaw.max(min_yaw);
        }
        if let Some(max_yaw) = self.bounds.max_yaw {
            bounded_yaw = bounded_yaw.min(max_yaw);
        }
        self.yaw = bounded_yaw;
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.set_yaw(self.yaw + delta);
    }

    /// Pans the camera relative to the current view direction
    /// delta.0 = horizontal pan (left/right relative to camera view)
    /// delta.1 = vertical pan (up/down relative to camera view)
    pub fn pan(&mut self, delta: (f32, f32)) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        // Scale by distance so panning feels the same at every zoom level
        let pan_scale = self.distance * 0.1;
        let movement = right * delta.0 * pan_scale + up * delta.1 * pan_scale;

        self.target += movement;
        self.update();
    }

    /// Updates the camera after changing `distance`, `pitch`, `yaw` or `target`.
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn update_view_proj(&mut self) {
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = convert_matrix4_to_array(self.build_view_projection_matrix());
    }

    /// Whether the perspective parameters form an invertible projection
    pub fn has_valid_projection(&self) -> bool {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        self.fovy.0 > 0.0
            && self.fovy.0 < std::f32::consts::PI
            && positive(self.aspect)
            && positive(self.znear)
            && positive(self.zfar)
            && self.zfar > self.znear
    }

    /// View-projection in OpenGL clip conventions (depth in [-1, 1])
    fn gl_view_projection(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.eye);
        let target = Point3::from_vec(self.target);
        let view = Matrix4::look_at_rh(eye, target, self.up);
        perspective(self.fovy, self.aspect, self.znear, self.zfar) * view
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_yaw: Option<f32>,
    pub max_yaw: Option<f32>,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: None,
            max_distance: None,
            min_pitch: -std::f32::consts::FRAC_PI_2 + 0.001,
            max_pitch: std::f32::consts::FRAC_PI_2 - 0.001,
            min_yaw: None,
            max_yaw: None,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn looking_at_reproduces_position() {
        let position = Vector3::new(3.0, 2.0, -4.0);
        let target = Vector3::new(1.0, 0.5, 0.0);
        let camera = OrbitCamera::looking_at(position, target, 1.5);
        assert!(close(camera.eye, position), "eye = {:?}", camera.eye);
    }

    #[test]
    fn center_ray_points_at_target() {
        let camera = OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), 1.5);
        let ray = camera.cast_ray(PointerState::new(0.0, 0.0)).unwrap();
        assert!(close(ray.direction, Vector3::new(0.0, 0.0, -1.0)));
        assert!((ray.origin.z - (5.0 - camera.znear)).abs() < 1e-3);
    }

    #[test]
    fn upper_right_pointer_leans_up_and_right() {
        let camera = OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), 1.5);
        let ray = camera.cast_ray(PointerState::new(0.5, 0.5)).unwrap();
        assert!(ray.direction.x > 0.0);
        assert!(ray.direction.y > 0.0);
        assert!(ray.direction.z < 0.0);
    }

    /// NDC of `point` as the renderer places it
    fn rendered_ndc(camera: &OrbitCamera, point: Vector3<f32>) -> PointerState {
        let clip = camera.build_view_projection_matrix() * point.extend(1.0);
        PointerState::new(clip.x / clip.w, clip.y / clip.w)
    }

    fn miss_distance(ray: &Ray, point: Vector3<f32>) -> f32 {
        let to_point = point - ray.origin;
        (to_point - ray.direction * to_point.dot(ray.direction)).magnitude()
    }

    #[test]
    fn wgpu_matrix_maps_depth_into_unit_range() {
        let camera = OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), 1.5)
            .with_perspective(Deg(75.0), 0.1, 100.0);
        let depth = |z: f32| {
            let clip = camera.build_view_projection_matrix() * Vector4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };
        assert!(depth(5.0 - 0.1).abs() < 1e-4);
        assert!((depth(5.0 - 100.0) - 1.0).abs() < 1e-4);
        assert!(depth(0.0) > 0.0 && depth(0.0) < 1.0);
    }

    #[test]
    fn ray_through_rendered_position_passes_through_the_point() {
        let camera = OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), 1.5)
            .with_perspective(Deg(75.0), 0.1, 4000.0);
        for point in [
            Vector3::new(2.0, 2.0, 1.0),
            Vector3::new(5.0, 2.0, -2.0),
            Vector3::new(-3.0, -1.0, -10.0),
        ] {
            let ray = camera.cast_ray(rendered_ndc(&camera, point)).unwrap();
            assert!(miss_distance(&ray, point) < 1e-3, "missed {:?}", point);
        }
    }

    #[test]
    fn degenerate_projection_casts_no_ray() {
        let mut camera =
            OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), 1.5);
        camera.aspect = 0.0;
        assert!(camera.cast_ray(PointerState::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn distance_respects_bounds() {
        let bounds = OrbitCameraBounds {
            min_distance: Some(2.0),
            max_distance: Some(50.0),
            ..Default::default()
        };
        let mut camera =
            OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), 1.0)
                .with_bounds(bounds);
        camera.set_distance(0.5);
        assert_eq!(camera.distance, 2.0);
        camera.set_distance(500.0);
        assert_eq!(camera.distance, 50.0);
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut camera =
            OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), 1.0);
        let offset_before = camera.eye - camera.target;
        camera.pan((1.0, 0.0));
        assert!(camera.target.x > 0.0);
        assert!(close(camera.eye - camera.target, offset_before));
    }
}
