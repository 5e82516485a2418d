//! Global uniform bindings for camera, lighting and the environment map
//!
//! Group 0 in every scene pipeline: the per-frame uniform, the
//! equirectangular environment texture and its sampler.

use crate::{
    gfx::camera::camera_utils::CameraUniform,
    gfx::resources::texture_resource::TextureResource,
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Global uniform buffer content
///
/// MUST match the `Globals` struct in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    inv_view_proj: [[f32; 4]; 4],
    /// xyz = position, w = range (0 = infinite)
    light_position: [f32; 4],
    /// rgb = color, a = intensity
    light_color: [f32; 4],
    /// rgb = color, a = intensity
    ambient: [f32; 4],
    /// x = map intensity, y = map loaded, z = neutral fill intensity
    environment: [f32; 4],
}

/// Point light
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    /// Distance at which the light fades to zero; 0 means no cutoff
    pub range: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [5.0, 5.0, 10.0],
            color: [1.0, 1.0, 1.0],
            intensity: 2.0,
            range: 50.0,
        }
    }
}

/// Everything besides the camera that lights the scene
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SceneLighting {
    pub light: LightConfig,
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    /// Weight of the environment map once it is loaded
    pub environment_intensity: f32,
    /// Neutral fill used while no environment map is bound
    pub room_intensity: f32,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            light: LightConfig::default(),
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.1,
            environment_intensity: 1.0,
            room_intensity: 0.04,
        }
    }
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

impl GlobalUBOContent {
    pub fn new(camera: &CameraUniform, lighting: &SceneLighting, has_environment: bool) -> Self {
        let light = &lighting.light;
        Self {
            view_position: camera.view_position,
            view_proj: camera.view_proj,
            inv_view_proj: camera.inverse_view_proj(),
            light_position: [light.position[0], light.position[1], light.position[2], light.range],
            light_color: [light.color[0], light.color[1], light.color[2], light.intensity],
            ambient: [
                lighting.ambient_color[0],
                lighting.ambient_color[1],
                lighting.ambient_color[2],
                lighting.ambient_intensity,
            ],
            environment: [
                lighting.environment_intensity,
                if has_environment { 1.0 } else { 0.0 },
                lighting.room_intensity,
                0.0,
            ],
        }
    }
}

/// Updates the global uniform buffer with camera and lighting data
pub fn update_global_ubo(
    ubo: &mut GlobalUBO,
    queue: &wgpu::Queue,
    camera: &CameraUniform,
    lighting: &SceneLighting,
    has_environment: bool,
) {
    ubo.update_content(queue, GlobalUBOContent::new(camera, lighting, has_environment));
}

/// Bind group layout and bind group for slot 0
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d_unfilterable())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::NonFiltering))
            .create(device, "Globals Bind Group Layout");

        GlobalBindings {
            bind_group_layout,
            bind_group: None,
        }
    }

    /// (Re)creates the bind group; called again whenever the environment changes
    pub fn create_bind_group(
        &mut self,
        device: &wgpu::Device,
        ubo: &GlobalUBO,
        environment: &TextureResource,
    ) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .resource(ubo.binding_resource())
                .texture(&environment.view)
                .sampler(&environment.sampler)
                .create(device, "Global Bind Group"),
        );
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<GlobalUBOContent>(), 16 + 64 + 64 + 16 * 4);
    }

    #[test]
    fn environment_flag_follows_load_state() {
        let camera = CameraUniform::default();
        let lighting = SceneLighting::default();

        let before = GlobalUBOContent::new(&camera, &lighting, false);
        let after = GlobalUBOContent::new(&camera, &lighting, true);
        assert_eq!(before.environment[1], 0.0);
        assert_eq!(after.environment[1], 1.0);
        assert_eq!(before.environment[2], 0.04);
        assert_eq!(before.light_position[3], 50.0);
        assert_eq!(before.light_color[3], 2.0);
    }
}
