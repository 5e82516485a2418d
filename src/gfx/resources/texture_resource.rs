//! Texture resource management for wgpu
//!
//! Depth buffers, offscreen render targets for the HDR scene and bloom
//! chain, and textures uploaded from decoded images.

/// GPU texture resource containing texture, view, and sampler
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Format of the scene target before tone mapping
    pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Format of decoded HDR environment maps
    pub const ENVIRONMENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

    /// Single-mip 2D texture; zero sizes are bumped to 1
    fn allocate(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        })
    }

    /// Writes tightly packed texels covering the whole of `texture`
    fn upload(queue: &wgpu::Queue, texture: &wgpu::Texture, bytes: &[u8], bytes_per_texel: u32) {
        let size = texture.size();
        queue.write_texture(
            texture.as_image_copy(),
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_texel * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );
    }

    fn with_sampler(
        device: &wgpu::Device,
        texture: wgpu::Texture,
        filter: wgpu::FilterMode,
        address_u: wgpu::AddressMode,
        address_v: wgpu::AddressMode,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("TextureResource Sampler"),
            address_mode_u: address_u,
            address_mode_v: address_v,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler,
        }
    }

    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = Self::allocate(
            device,
            label,
            width,
            height,
            Self::DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        Self::with_sampler(
            device,
            texture,
            wgpu::FilterMode::Nearest,
            wgpu::AddressMode::ClampToEdge,
            wgpu::AddressMode::ClampToEdge,
        )
    }

    /// Offscreen color target that later passes sample from
    pub fn create_render_target(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = Self::allocate(
            device,
            label,
            width,
            height,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        Self::with_sampler(
            device,
            texture,
            wgpu::FilterMode::Linear,
            wgpu::AddressMode::ClampToEdge,
            wgpu::AddressMode::ClampToEdge,
        )
    }

    /// Uploads RGBA8 pixels as an sRGB texture
    pub fn create_from_rgba_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let texture = Self::allocate(
            device,
            label,
            width,
            height,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        Self::upload(queue, &texture, data, 4);
        Self::with_sampler(
            device,
            texture,
            wgpu::FilterMode::Linear,
            wgpu::AddressMode::Repeat,
            wgpu::AddressMode::Repeat,
        )
    }

    /// 1x1 white texture bound when a material has no image
    pub fn create_white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::create_from_rgba_data(device, queue, &[255, 255, 255, 255], 1, 1, "White Texture")
    }

    /// Uploads linear RGBA32F texels of an equirectangular environment map
    ///
    /// Rgba32Float is not filterable on every adapter, so the sampler is
    /// nearest. Longitude wraps, latitude clamps at the poles.
    pub fn create_environment(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texels: &[f32],
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let texture = Self::allocate(
            device,
            label,
            width,
            height,
            Self::ENVIRONMENT_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        Self::upload(queue, &texture, bytemuck::cast_slice(texels), 16);
        Self::with_sampler(
            device,
            texture,
            wgpu::FilterMode::Nearest,
            wgpu::AddressMode::Repeat,
            wgpu::AddressMode::ClampToEdge,
        )
    }

    /// Black 1x1 placeholder used until the real map has loaded
    pub fn create_empty_environment(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::create_environment(device, queue, &[0.0; 4], 1, 1, "Empty Environment")
    }
}
