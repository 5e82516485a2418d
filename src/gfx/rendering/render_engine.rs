//! WGPU-based rendering engine
//!
//! Draws the sky and the scene into an HDR target, then runs bloom which
//! composites the result onto the swapchain.

use std::sync::Arc;
use wgpu::{Device, TextureFormat};

use crate::assets::decode::MAX_TEXTURE_DIMENSION;
use crate::error::RenderError;
use crate::gfx::{
    camera::camera_utils::CameraUniform,
    resources::{
        global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO, SceneLighting},
        texture_resource::TextureResource,
    },
    scene::{object::DrawObject, scene::Scene},
};

use super::bloom::{BloomPass, BloomSettings};
use super::pipeline_manager::{DepthConfig, PipelineConfig, PipelineManager};

const SKY_PIPELINE: &str = "Sky";
const SCENE_PIPELINE: &str = "Scene";

/// Surface and target size for a window, each edge kept within `max_dimension`
///
/// A window larger than the device allows is rendered at the clamped size and
/// stretched on present.
pub fn target_extent(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    (width.clamp(1, max_dimension), height.clamp(1, max_dimension))
}

/// Core rendering engine managing GPU resources and draw calls
///
/// The RenderEngine handles:
/// - Surface and device management
/// - Pipeline creation
/// - Depth and HDR targets
/// - The environment map shared by the sky and scene shaders
/// - Bloom
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    hdr_target: TextureResource,
    format: TextureFormat,
    pub pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    environment: TextureResource,
    has_environment: bool,
    lighting: SceneLighting,
    bloom: BloomPass,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// `scene` gets its shared layouts created here since the scene
    /// pipeline is built against them.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        lighting: SceneLighting,
        bloom_settings: BloomSettings,
        scene: &mut Scene,
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: MAX_TEXTURE_DIMENSION,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        // The composite writes linear color, so let the surface encode sRGB
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let (width, height) =
            target_extent(width, height, device.limits().max_texture_dimension_2d);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, config.width, config.height, "depth_texture");
        let hdr_target = TextureResource::create_render_target(
            &device,
            config.width,
            config.height,
            TextureResource::HDR_FORMAT,
            "HDR Target",
        );

        // Sky stays black until the environment map arrives
        let environment = TextureResource::create_empty_environment(&device, &queue);
        let global_ubo = GlobalUBO::new(&device);
        let mut global_bindings = GlobalBindings::new(&device);
        global_bindings.create_bind_group(&device, &global_ubo, &environment);

        scene.init_gpu_resources(&device, &queue);
        let transform_layout = scene
            .transform_bind_group_layout()
            .ok_or(RenderError::MissingLayout("transform"))?
            .clone();
        let material_layout = scene
            .material_manager
            .get_bind_group_layout()
            .ok_or(RenderError::MissingLayout("material"))?
            .clone();

        let bloom = BloomPass::new(&device, bloom_settings, &hdr_target, config.width, config.height);

        let device_handle: Arc<Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        pipeline_manager.load_shader("sky", include_str!("shaders/sky.wgsl"));
        pipeline_manager.load_shader("scene", include_str!("shaders/scene.wgsl"));

        pipeline_manager.register_pipeline(
            SKY_PIPELINE,
            PipelineConfig::default_with_shader("sky")
                .with_label("SKY")
                .with_depth(DepthConfig::background(TextureResource::DEPTH_FORMAT))
                .with_cull_mode(None)
                .with_bind_group_layouts(vec![global_bindings.bind_group_layout().clone()])
                .with_color_target(TextureResource::HDR_FORMAT, None)
                .with_no_vertex_buffers(),
        );

        // Panels and glTF primitives may be single sided, so nothing is culled
        pipeline_manager.register_pipeline(
            SCENE_PIPELINE,
            PipelineConfig::default_with_shader("scene")
                .with_label("SCENE")
                .with_depth(DepthConfig::opaque(TextureResource::DEPTH_FORMAT))
                .with_cull_mode(None)
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layout().clone(),
                    transform_layout,
                    material_layout,
                ])
                .with_color_target(TextureResource::HDR_FORMAT, None),
        );

        bloom.register_pipelines(&mut pipeline_manager, format);
        pipeline_manager.create_all_pipelines()?;

        let stats = pipeline_manager.get_stats();
        log::debug!(
            "{} pipelines from {} shaders ready",
            stats.total_pipelines,
            stats.loaded_shaders
        );

        Ok(RenderEngine {
            device: device_handle,
            config,
            format,
            surface,
            queue: queue_handle,
            depth_texture,
            hdr_target,
            pipeline_manager,
            global_bindings,
            global_ubo,
            environment,
            has_environment: false,
            lighting,
            bloom,
        })
    }

    /// Replaces the environment map with decoded equirectangular texels
    pub fn set_environment(&mut self, texels: &[f32], width: u32, height: u32) {
        self.environment = TextureResource::create_environment(
            &self.device,
            &self.queue,
            texels,
            width,
            height,
            "Environment",
        );
        self.global_bindings
            .create_bind_group(&self.device, &self.global_ubo, &self.environment);
        self.has_environment = true;
        log::info!("environment map {}x{} uploaded", width, height);
    }

    pub fn has_environment(&self) -> bool {
        self.has_environment
    }

    /// Renders a frame
    ///
    /// Lost or outdated surfaces are reconfigured and the frame is skipped,
    /// as is a timed out acquire. Anything else is returned.
    pub fn render_frame(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("surface acquire timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let Some(global_bind_group) = self.global_bindings.bind_group() else {
            return Err(RenderError::MissingLayout("global"));
        };
        let sky_pipeline = self.pipeline_manager.get_pipeline(SKY_PIPELINE)?;
        let scene_pipeline = self.pipeline_manager.get_pipeline(SCENE_PIPELINE)?;

        // PASS 1: sky then scene into the HDR target
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.hdr_target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, global_bind_group, &[]);

            render_pass.set_pipeline(sky_pipeline);
            render_pass.draw(0..3, 0..1);

            render_pass.set_pipeline(scene_pipeline);
            for object in scene.objects.iter().filter(|o| o.visible) {
                let Some(transform_bind_group) = object.get_transform_bind_group() else {
                    continue;
                };
                let material = scene.get_material_for_object(object);
                let Some(material_bind_group) = material.get_bind_group() else {
                    log::trace!(
                        "skipping '{}': material '{}' has no GPU resources",
                        object.name,
                        material.name
                    );
                    continue;
                };
                render_pass.set_bind_group(1, transform_bind_group, &[]);
                render_pass.set_bind_group(2, material_bind_group, &[]);
                render_pass.draw_object(object);
            }
        }

        // PASS 2: bloom, ending on the swapchain
        self.bloom.prepare(&self.queue);
        self.bloom
            .render(&mut encoder, &self.pipeline_manager, &surface_texture_view)?;

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Updates the global uniform with the camera and lighting
    pub fn update(&mut self, camera_uniform: &CameraUniform) {
        update_global_ubo(
            &mut self.global_ubo,
            &self.queue,
            camera_uniform,
            &self.lighting,
            self.has_environment,
        );
    }

    pub fn set_lighting(&mut self, lighting: SceneLighting) {
        self.lighting = lighting;
    }

    pub fn lighting(&self) -> &SceneLighting {
        &self.lighting
    }

    pub fn bloom_settings(&self) -> &BloomSettings {
        self.bloom.settings()
    }

    pub fn set_bloom_settings(&mut self, settings: BloomSettings) {
        self.bloom.set_settings(settings);
    }

    /// Resizes the surface and every size-dependent target
    ///
    /// Zero sized requests (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (width, height) =
            target_extent(width, height, self.device.limits().max_texture_dimension_2d);
        if (width, height) != (self.config.width, self.config.height) {
            log::debug!("render targets resized to {}x{}", width, height);
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, width, height, "depth_texture");
        self.hdr_target = TextureResource::create_render_target(
            &self.device,
            width,
            height,
            TextureResource::HDR_FORMAT,
            "HDR Target",
        );
        self.bloom
            .resize(&self.device, &self.hdr_target, width, height);
    }

    /// Returns current surface dimensions
    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Set VSync (vertical synchronization) state
    pub fn set_vsync(&mut self, enable: bool) {
        self.config.present_mode = if enable {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::Immediate
        };
        self.surface.configure(&self.device, &self.config);
    }
}
