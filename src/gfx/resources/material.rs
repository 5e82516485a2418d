//! Material system
//!
//! Materials are stored in [`MaterialManager`] and objects reference them by
//! ID. Each material owns a small uniform buffer and a bind group holding
//! that buffer plus its base color texture (a shared white texel when it
//! has none).

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::Device;

use super::texture_resource::TextureResource;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

/// Material ID for referencing materials
pub type MaterialId = String;

/// GPU uniform data for materials
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub metallic: f32,
    pub roughness: f32,
    pub has_texture: f32,
    /// 1.0 for standard shading, 0.0 for diffuse-only surfaces
    pub specular: f32,
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

/// How a surface responds to light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shading {
    /// Diffuse + specular + environment reflection
    #[default]
    Standard,
    /// Diffuse only
    Lambert,
}

/// Material definition with PBR-ish properties
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub shading: Shading,
    pub texture: Option<Arc<image::RgbaImage>>,

    material_ubo: Option<MaterialUBO>,
    texture_resource: Option<TextureResource>,
    bind_group: Option<wgpu::BindGroup>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default", [0.8, 0.8, 0.8, 1.0], 0.0, 0.5)
    }
}

impl Material {
    /// Creates a new material with basic PBR properties
    ///
    /// # Arguments
    /// * `name` - Unique name for this material
    /// * `base_color` - Linear RGBA base color
    /// * `metallic` - Metallic factor (0.0 = dielectric, 1.0 = metallic)
    /// * `roughness` - Surface roughness (0.0 = mirror, 1.0 = rough)
    pub fn new(name: &str, base_color: [f32; 4], metallic: f32, roughness: f32) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            metallic: metallic.clamp(0.0, 1.0),
            roughness: roughness.clamp(0.0, 1.0),
            emissive: [0.0, 0.0, 0.0],
            emissive_intensity: 1.0,
            shading: Shading::Standard,
            texture: None,
            material_ubo: None,
            texture_resource: None,
            bind_group: None,
        }
    }

    /// Builder pattern: Set emissive color
    pub fn with_emission(mut self, r: f32, g: f32, b: f32) -> Self {
        self.emissive = [r, g, b];
        self
    }

    pub fn with_emissive_intensity(mut self, intensity: f32) -> Self {
        self.emissive_intensity = intensity;
        self
    }

    pub fn with_texture(mut self, image: Arc<image::RgbaImage>) -> Self {
        self.texture = Some(image);
        self
    }

    pub fn with_shading(mut self, shading: Shading) -> Self {
        self.shading = shading;
        self
    }

    pub fn uniform(&self) -> MaterialUniform {
        MaterialUniform {
            base_color: self.base_color,
            emissive: self.emissive,
            emissive_intensity: self.emissive_intensity,
            metallic: self.metallic,
            roughness: self.roughness,
            has_texture: if self.texture.is_some() { 1.0 } else { 0.0 },
            specular: match self.shading {
                Shading::Standard => 1.0,
                Shading::Lambert => 0.0,
            },
        }
    }

    /// Creates GPU resources on first call and syncs the uniform afterwards
    pub fn update_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
        white: &TextureResource,
    ) {
        if self.material_ubo.is_none() {
            self.material_ubo = Some(MaterialUBO::new(device));
        }
        if self.texture_resource.is_none() {
            if let Some(image) = &self.texture {
                self.texture_resource = Some(TextureResource::create_from_rgba_data(
                    device,
                    queue,
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    &self.name,
                ));
            }
        }

        let uniform = self.uniform();
        let Some(ubo) = self.material_ubo.as_mut() else {
            return;
        };
        ubo.update_content(queue, uniform);

        if self.bind_group.is_none() {
            let texture = self.texture_resource.as_ref().unwrap_or(white);
            self.bind_group = Some(
                BindGroupBuilder::new(layout)
                    .resource(ubo.binding_resource())
                    .texture(&texture.view)
                    .sampler(&texture.sampler)
                    .create(device, &format!("Material Bind Group: {}", self.name)),
            );
        }
    }

    /// Bind group for rendering, once GPU resources exist
    pub fn get_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

/// Manages all materials in the engine
pub struct MaterialManager {
    materials: HashMap<MaterialId, Material>,
    default_material_id: MaterialId,
    layout: Option<BindGroupLayoutWithDesc>,
    white: Option<TextureResource>,
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialManager {
    /// Creates a new material manager with a default material
    pub fn new() -> Self {
        let default_material = Material::default();
        let default_material_id = default_material.name.clone();
        let mut materials = HashMap::new();
        materials.insert(default_material_id.clone(), default_material);

        Self {
            materials,
            default_material_id,
            layout: None,
            white: None,
        }
    }

    /// Layout shared by every material bind group
    pub fn create_layout(device: &Device) -> BindGroupLayoutWithDesc {
        BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Material Bind Group Layout")
    }

    /// Sets up the shared layout and fallback texture
    pub fn init_gpu(&mut self, device: &Device, queue: &wgpu::Queue) {
        if self.layout.is_none() {
            self.layout = Some(Self::create_layout(device));
        }
        if self.white.is_none() {
            self.white = Some(TextureResource::create_white(device, queue));
        }
    }

    /// Replaces any material with the same name
    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn get_material(&self, id: &str) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_material_mut(&mut self, id: &str) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn get_default_material(&self) -> &Material {
        &self.materials[&self.default_material_id]
    }

    /// Material for an object, falling back to the default
    pub fn get_material_for_object(&self, material_id: Option<&MaterialId>) -> &Material {
        material_id
            .and_then(|id| self.get_material(id))
            .unwrap_or_else(|| self.get_default_material())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.materials.contains_key(id)
    }

    pub fn list_materials(&self) -> Vec<&MaterialId> {
        self.materials.keys().collect()
    }

    /// Syncs every material to the GPU; no-op before `init_gpu`
    pub fn update_all_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        let (Some(layout), Some(white)) = (self.layout.as_ref(), self.white.as_ref()) else {
            return;
        };
        for material in self.materials.values_mut() {
            material.update_gpu_resources(device, queue, layout, white);
        }
    }

    pub fn get_bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.layout.as_ref().map(|l| &l.layout)
    }
}
