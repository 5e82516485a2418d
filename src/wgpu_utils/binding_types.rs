//! Shorthands for the bind group entry types the pipelines use

pub fn uniform() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

pub fn sampler(kind: wgpu::SamplerBindingType) -> wgpu::BindingType {
    wgpu::BindingType::Sampler(kind)
}

fn float_texture_2d(filterable: bool) -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable },
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

/// Color and HDR render targets
pub fn texture_2d() -> wgpu::BindingType {
    float_texture_2d(true)
}

/// Rgba32Float environment maps; filtering them needs an optional feature
pub fn texture_2d_unfilterable() -> wgpu::BindingType {
    float_texture_2d(false)
}
