//! Bloom post-processing
//!
//! The HDR scene is bright-passed into a half resolution target, blurred
//! horizontally then vertically, and added back on top of the scene while
//! writing to the swapchain.

use crate::error::RenderError;
use crate::gfx::resources::texture_resource::TextureResource;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

use super::pipeline_manager::{PipelineConfig, PipelineManager};

pub const THRESHOLD_PIPELINE: &str = "BloomThreshold";
pub const BLUR_PIPELINE: &str = "BloomBlur";
pub const COMPOSITE_PIPELINE: &str = "BloomComposite";

/// Bloom effect settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    /// Multiplier applied to the blurred glow when it is added back
    pub strength: f32,
    /// 0..1, widens the blur kernel
    pub radius: f32,
    /// Luminance above which pixels start to glow
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 2.0,
            radius: 0.4,
            threshold: 0.1,
        }
    }
}

/// Bloom uniform data.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BloomUniform {
    threshold: f32,
    strength: f32,
    radius: f32,
    _padding: f32,
    texel_size: [f32; 2],
    direction: [f32; 2],
}

impl BloomUniform {
    pub fn new(settings: &BloomSettings, width: u32, height: u32, direction: [f32; 2]) -> Self {
        let (w, h) = half_extent(width, height);
        Self {
            threshold: settings.threshold,
            strength: settings.strength,
            radius: settings.radius,
            _padding: 0.0,
            texel_size: [1.0 / w as f32, 1.0 / h as f32],
            direction,
        }
    }
}

/// Size of the blur targets for a surface of `width` x `height`
pub fn half_extent(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

pub struct BloomPass {
    settings: BloomSettings,
    width: u32,
    height: u32,
    layout: BindGroupLayoutWithDesc,
    composite_layout: BindGroupLayoutWithDesc,
    sampler: wgpu::Sampler,
    threshold_ubo: UniformBuffer<BloomUniform>,
    blur_h_ubo: UniformBuffer<BloomUniform>,
    blur_v_ubo: UniformBuffer<BloomUniform>,
    bright: TextureResource,
    ping: TextureResource,
    bind_groups: Option<BloomBindGroups>,
}

struct BloomBindGroups {
    threshold: wgpu::BindGroup,
    blur_h: wgpu::BindGroup,
    blur_v: wgpu::BindGroup,
    composite: wgpu::BindGroup,
}

impl BloomPass {
    pub fn new(
        device: &wgpu::Device,
        settings: BloomSettings,
        scene_target: &TextureResource,
        width: u32,
        height: u32,
    ) -> Self {
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .next_binding_fragment(binding_types::uniform())
            .create(device, "Bloom Bind Group Layout");

        let composite_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .next_binding_fragment(binding_types::uniform())
            .create(device, "Bloom Composite Bind Group Layout");

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bloom Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let (bright, ping) = Self::create_targets(device, width, height);

        let mut pass = Self {
            settings,
            width,
            height,
            layout,
            composite_layout,
            sampler,
            threshold_ubo: UniformBuffer::new_with_data(
                device,
                &BloomUniform::new(&settings, width, height, [0.0, 0.0]),
            ),
            blur_h_ubo: UniformBuffer::new_with_data(
                device,
                &BloomUniform::new(&settings, width, height, [1.0, 0.0]),
            ),
            blur_v_ubo: UniformBuffer::new_with_data(
                device,
                &BloomUniform::new(&settings, width, height, [0.0, 1.0]),
            ),
            bright,
            ping,
            bind_groups: None,
        };
        pass.create_bind_groups(device, scene_target);
        pass
    }

    /// Loads the bloom shaders and registers the three pipelines
    pub fn register_pipelines(
        &self,
        pipeline_manager: &mut PipelineManager,
        surface_format: wgpu::TextureFormat,
    ) {
        pipeline_manager.load_shader("bloom", include_str!("shaders/bloom.wgsl"));
        pipeline_manager.load_shader("composite", include_str!("shaders/composite.wgsl"));

        let fullscreen = |shader: &str, label: &str| {
            PipelineConfig::default_with_shader(shader)
                .with_label(label)
                .with_cull_mode(None)
                .with_no_vertex_buffers()
        };

        pipeline_manager.register_pipeline(
            THRESHOLD_PIPELINE,
            fullscreen("bloom", "Bloom Threshold")
                .with_fragment_entry("fs_threshold")
                .with_bind_group_layouts(vec![self.layout.layout.clone()])
                .with_color_target(TextureResource::HDR_FORMAT, None),
        );
        pipeline_manager.register_pipeline(
            BLUR_PIPELINE,
            fullscreen("bloom", "Bloom Blur")
                .with_fragment_entry("fs_blur")
                .with_bind_group_layouts(vec![self.layout.layout.clone()])
                .with_color_target(TextureResource::HDR_FORMAT, None),
        );
        pipeline_manager.register_pipeline(
            COMPOSITE_PIPELINE,
            fullscreen("composite", "Bloom Composite")
                .with_bind_group_layouts(vec![self.composite_layout.layout.clone()])
                .with_color_target(surface_format, Some(wgpu::BlendState::REPLACE)),
        );
    }

    fn create_targets(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (TextureResource, TextureResource) {
        let (w, h) = half_extent(width, height);
        (
            TextureResource::create_render_target(
                device,
                w,
                h,
                TextureResource::HDR_FORMAT,
                "Bloom Bright Texture",
            ),
            TextureResource::create_render_target(
                device,
                w,
                h,
                TextureResource::HDR_FORMAT,
                "Bloom Blur Texture",
            ),
        )
    }

    fn create_bind_groups(&mut self, device: &wgpu::Device, scene_target: &TextureResource) {
        let single = |view: &wgpu::TextureView, ubo: &UniformBuffer<BloomUniform>, label: &str| {
            BindGroupBuilder::new(&self.layout)
                .texture(view)
                .sampler(&self.sampler)
                .resource(ubo.binding_resource())
                .create(device, label)
        };

        let bind_groups = BloomBindGroups {
            threshold: single(&scene_target.view, &self.threshold_ubo, "Bloom Threshold Bind Group"),
            // bright -> ping -> bright
            blur_h: single(&self.bright.view, &self.blur_h_ubo, "Bloom Blur H Bind Group"),
            blur_v: single(&self.ping.view, &self.blur_v_ubo, "Bloom Blur V Bind Group"),
            composite: BindGroupBuilder::new(&self.composite_layout)
                .texture(&scene_target.view)
                .texture(&self.bright.view)
                .sampler(&self.sampler)
                .resource(self.threshold_ubo.binding_resource())
                .create(device, "Bloom Composite Bind Group"),
        };
        self.bind_groups = Some(bind_groups);
    }

    /// Recreates the blur targets; `scene_target` must already have the new size
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        scene_target: &TextureResource,
        width: u32,
        height: u32,
    ) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        let (bright, ping) = Self::create_targets(device, width, height);
        self.bright = bright;
        self.ping = ping;
        self.create_bind_groups(device, scene_target);
    }

    pub fn settings(&self) -> &BloomSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: BloomSettings) {
        self.settings = settings;
    }

    /// Syncs settings and texel sizes to the GPU
    pub fn prepare(&mut self, queue: &wgpu::Queue) {
        let (s, w, h) = (&self.settings, self.width, self.height);
        self.threshold_ubo
            .update_content(queue, BloomUniform::new(s, w, h, [0.0, 0.0]));
        self.blur_h_ubo
            .update_content(queue, BloomUniform::new(s, w, h, [1.0, 0.0]));
        self.blur_v_ubo
            .update_content(queue, BloomUniform::new(s, w, h, [0.0, 1.0]));
    }

    /// Runs threshold, blur and composite; the composite writes `output`
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline_manager: &PipelineManager,
        output: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        let Some(groups) = &self.bind_groups else {
            return Ok(());
        };
        let threshold = pipeline_manager.get_pipeline(THRESHOLD_PIPELINE)?;
        let blur = pipeline_manager.get_pipeline(BLUR_PIPELINE)?;
        let composite = pipeline_manager.get_pipeline(COMPOSITE_PIPELINE)?;

        fullscreen_pass(encoder, "Bloom Threshold Pass", &self.bright.view, threshold, &groups.threshold);
        fullscreen_pass(encoder, "Bloom Blur H Pass", &self.ping.view, blur, &groups.blur_h);
        fullscreen_pass(encoder, "Bloom Blur V Pass", &self.bright.view, blur, &groups.blur_v);
        fullscreen_pass(encoder, "Bloom Composite Pass", output, composite, &groups.composite);

        Ok(())
    }
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    render_pass.set_pipeline(pipeline);
    render_pass.set_bind_group(0, bind_group, &[]);
    render_pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<BloomUniform>(), 32);
    }

    #[test]
    fn blur_targets_are_half_size_and_never_empty() {
        assert_eq!(half_extent(1200, 800), (600, 400));
        assert_eq!(half_extent(1, 1), (1, 1));
        assert_eq!(half_extent(3, 0), (1, 1));
    }

    #[test]
    fn uniform_texel_size_follows_half_resolution() {
        let uniform = BloomUniform::new(&BloomSettings::default(), 800, 400, [1.0, 0.0]);
        assert_eq!(uniform.texel_size, [1.0 / 400.0, 1.0 / 200.0]);
        assert_eq!(uniform.direction, [1.0, 0.0]);
        assert_eq!(uniform.strength, 2.0);
        assert_eq!(uniform.threshold, 0.1);
    }
}
