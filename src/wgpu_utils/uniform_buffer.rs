//! Typed uniform buffers

use std::marker::PhantomData;

use wgpu::util::DeviceExt;

const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::UNIFORM.union(wgpu::BufferUsages::COPY_DST);

/// A uniform buffer holding exactly one `Content`.
///
/// The bytes of the last upload are kept so per-frame writes of unchanged
/// content (most objects, most frames) never reach the queue.
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    last_upload: Option<Vec<u8>>,
    _content: PhantomData<Content>,
}

fn label_for<Content>() -> String {
    let name = std::any::type_name::<Content>();
    format!("Uniform {}", name.rsplit("::").next().unwrap_or(name))
}

/// Whether `next` differs from what the buffer already holds
fn needs_upload(last: Option<&[u8]>, next: &[u8]) -> bool {
    last != Some(next)
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    /// Zero-initialised; the first `update_content` always uploads
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label_for::<Content>()),
            size: std::mem::size_of::<Content>() as u64,
            usage: USAGE,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            last_upload: None,
            _content: PhantomData,
        }
    }

    pub fn new_with_data(device: &wgpu::Device, initial: &Content) -> Self {
        let bytes = bytemuck::bytes_of(initial);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&label_for::<Content>()),
            contents: bytes,
            usage: USAGE,
        });
        Self {
            buffer,
            last_upload: Some(bytes.to_vec()),
            _content: PhantomData,
        }
    }

    /// Queues a write of `content`; returns false when it was already current
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) -> bool {
        let bytes = bytemuck::bytes_of(&content);
        if !needs_upload(self.last_upload.as_deref(), bytes) {
            return false;
        }
        queue.write_buffer(&self.buffer, 0, bytes);
        self.last_upload = Some(bytes.to_vec());
        true
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}
