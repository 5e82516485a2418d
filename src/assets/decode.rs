//! CPU-side decoding, run on loader worker threads
//!
//! Nothing here touches the GPU; the results are plain vertex arrays and
//! images that the event-loop thread turns into scene objects.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use cgmath::Matrix4;

use crate::error::AssetError;
use crate::gfx::scene::{object::Mesh, vertex::Vertex3D};

/// Environment maps with a longer edge than this are downscaled before upload
pub const MAX_ENVIRONMENT_WIDTH: u32 = 2048;

/// Largest 2D texture edge the renderer requests from the device
pub const MAX_TEXTURE_DIMENSION: u32 = 4096;

/// Surface parameters read from a glTF material
#[derive(Debug, Clone)]
pub struct MaterialData {
    pub name: String,
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
    pub metallic: f32,
    pub roughness: f32,
    pub texture: Option<Arc<image::RgbaImage>>,
}

/// One triangle primitive of a model, already in world placement
#[derive(Debug, Clone)]
pub struct PrimitiveData {
    pub name: String,
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
    pub transform: Matrix4<f32>,
    /// Index into [`ModelData::materials`]
    pub material: usize,
}

#[derive(Debug, Clone)]
pub struct ModelData {
    pub primitives: Vec<PrimitiveData>,
    pub materials: Vec<MaterialData>,
}

#[derive(Debug, Clone)]
pub struct PanelData {
    pub size: [f32; 3],
    pub transform: Matrix4<f32>,
    pub image: Arc<image::RgbaImage>,
}

/// Linear RGBA32F texels of an equirectangular map
#[derive(Debug, Clone)]
pub struct EnvironmentData {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<f32>,
}

pub fn decode_model(path: &Path, transform: Matrix4<f32>) -> Result<ModelData, AssetError> {
    let (document, buffers, images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;
    let model = build_model(&document, &buffers, &images, transform);
    if model.primitives.is_empty() {
        return Err(AssetError::EmptyModel(path.to_path_buf()));
    }
    Ok(model)
}

/// Flattens the default scene into world-space primitives
pub fn build_model(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    transform: Matrix4<f32>,
) -> ModelData {
    let mut builder = ModelBuilder {
        buffers,
        images,
        model: ModelData {
            primitives: Vec::new(),
            materials: Vec::new(),
        },
        material_slots: HashMap::new(),
        textures: HashMap::new(),
    };

    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        for node in scene.nodes() {
            builder.visit(&node, transform);
        }
    }
    builder.model
}

struct ModelBuilder<'a> {
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    model: ModelData,
    /// glTF material index (None = default material) -> slot in `model.materials`
    material_slots: HashMap<Option<usize>, usize>,
    textures: HashMap<usize, Option<Arc<image::RgbaImage>>>,
}

impl ModelBuilder<'_> {
    fn visit(&mut self, node: &gltf::Node, parent: Matrix4<f32>) {
        let world = parent * Matrix4::from(node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            let base_name = node
                .name()
                .or_else(|| mesh.name())
                .map(str::to_string)
                .unwrap_or_else(|| format!("node{}", node.index()));

            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::debug!(
                        "skipping {:?} primitive in '{}'",
                        primitive.mode(),
                        base_name
                    );
                    continue;
                }
                let Some((vertices, indices)) = self.read_geometry(&primitive) else {
                    continue;
                };
                let material = self.material_slot(&primitive.material());
                self.model.primitives.push(PrimitiveData {
                    name: format!("{}#{}", base_name, primitive.index()),
                    vertices,
                    indices,
                    transform: world,
                    material,
                });
            }
        }

        for child in node.children() {
            self.visit(&child, world);
        }
    }

    fn read_geometry(&self, primitive: &gltf::Primitive) -> Option<(Vec<Vertex3D>, Vec<u32>)> {
        let reader =
            primitive.reader(|buffer| self.buffers.get(buffer.index()).map(|b| b.0.as_slice()));

        let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
        if positions.is_empty() {
            return None;
        }

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if indices.len() < 3 {
            return None;
        }

        let normals: Vec<[f32; 3]> = match reader.read_normals() {
            Some(normals) => normals.collect(),
            None => Mesh::calculate_vertex_normals(&positions, &indices),
        };

        let uv_set = primitive
            .material()
            .pbr_metallic_roughness()
            .base_color_texture()
            .map(|info| info.tex_coord())
            .unwrap_or(0);
        let tex_coords: Vec<[f32; 2]> = reader
            .read_tex_coords(uv_set)
            .map(|coords| coords.into_f32().collect())
            .unwrap_or_default();

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex3D {
                position,
                normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                tex_coords: tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect();

        Some((vertices, indices))
    }

    fn material_slot(&mut self, material: &gltf::Material) -> usize {
        if let Some(&slot) = self.material_slots.get(&material.index()) {
            return slot;
        }

        let pbr = material.pbr_metallic_roughness();
        let texture = pbr
            .base_color_texture()
            .and_then(|info| self.texture(info.texture().source().index()));

        let data = MaterialData {
            name: material
                .name()
                .map(str::to_string)
                .or_else(|| material.index().map(|i| format!("material{}", i)))
                .unwrap_or_else(|| "default".to_string()),
            base_color: pbr.base_color_factor(),
            emissive: material.emissive_factor(),
            metallic: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
            texture,
        };

        let slot = self.model.materials.len();
        self.model.materials.push(data);
        self.material_slots.insert(material.index(), slot);
        slot
    }

    fn texture(&mut self, image_index: usize) -> Option<Arc<image::RgbaImage>> {
        if let Some(cached) = self.textures.get(&image_index) {
            return cached.clone();
        }
        let texture = self.images.get(image_index).and_then(|data| {
            let pixels = expand_to_rgba(data.format, &data.pixels);
            if pixels.is_none() {
                log::warn!("unsupported glTF image format {:?}", data.format);
            }
            image::RgbaImage::from_raw(data.width, data.height, pixels?)
                .map(|image| Arc::new(fit_texture(image, "glTF texture")))
        });
        self.textures.insert(image_index, texture.clone());
        texture
    }
}

/// Widens 8-bit glTF image data to RGBA8
pub fn expand_to_rgba(format: gltf::image::Format, pixels: &[u8]) -> Option<Vec<u8>> {
    use gltf::image::Format;

    let out = match format {
        Format::R8G8B8A8 => pixels.to_vec(),
        Format::R8G8B8 => pixels
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        Format::R8G8 => pixels
            .chunks_exact(2)
            .flat_map(|c| [c[0], c[0], c[0], c[1]])
            .collect(),
        Format::R8 => pixels.iter().flat_map(|&r| [r, r, r, 255]).collect(),
        _ => return None,
    };
    Some(out)
}

fn open_image(path: &Path) -> Result<image::DynamicImage, AssetError> {
    let io_error = |source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    };
    image::ImageReader::open(path)
        .map_err(io_error)?
        .with_guessed_format()
        .map_err(io_error)?
        .decode()
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

pub fn decode_panel(
    path: &Path,
    size: [f32; 3],
    transform: Matrix4<f32>,
) -> Result<PanelData, AssetError> {
    let image = open_image(path)?.to_rgba8();
    Ok(PanelData {
        size,
        transform,
        image: Arc::new(fit_texture(image, &path.display().to_string())),
    })
}

pub fn decode_environment(path: &Path) -> Result<EnvironmentData, AssetError> {
    let image = open_image(path)?;
    let (width, height) = fit_within(image.width(), image.height(), MAX_ENVIRONMENT_WIDTH);
    let image = if (width, height) != (image.width(), image.height()) {
        log::debug!(
            "downscaling {} from {}x{} to {}x{}",
            path.display(),
            image.width(),
            image.height(),
            width,
            height
        );
        image.resize_exact(width, height, image::imageops::FilterType::Triangle)
    } else {
        image
    };

    let rgba = image.into_rgba32f();
    Ok(EnvironmentData {
        width: rgba.width(),
        height: rgba.height(),
        texels: rgba.into_raw(),
    })
}

/// Size after shrinking so neither edge exceeds `max`, keeping the aspect ratio
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max {
        return (width, height);
    }
    let scale = |edge: u32| (edge as u64 * max as u64 / longest as u64).max(1) as u32;
    (scale(width), scale(height))
}

/// Shrinks an RGBA8 image that would not fit in a device texture
fn fit_texture(image: image::RgbaImage, label: &str) -> image::RgbaImage {
    let (width, height) = fit_within(image.width(), image.height(), MAX_TEXTURE_DIMENSION);
    if (width, height) == image.dimensions() {
        return image;
    }
    log::debug!(
        "downscaling {} from {}x{} to {}x{}",
        label,
        image.width(),
        image.height(),
        width,
        height
    );
    image::imageops::resize(&image, width, height, image::imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use cgmath::{SquareMatrix, Vector3, Vector4};

    use super::*;

    /// One red triangle at z = 2 with no normals, indices as u16
    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "tri", "mesh": 0, "translation": [0.0, 0.0, 2.0] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }] }],
        "materials": [{
            "name": "red",
            "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "metallicFactor": 0.25, "roughnessFactor": 0.75 },
            "emissiveFactor": [0.0, 0.5, 0.0]
        }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "buffers": [{
            "byteLength": 44,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA="
        }]
    }"#;

    fn triangle(transform: Matrix4<f32>) -> ModelData {
        let (document, buffers, images) = gltf::import_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        build_model(&document, &buffers, &images, transform)
    }

    #[test]
    fn reads_geometry_and_material() {
        let model = triangle(Matrix4::identity());
        assert_eq!(model.primitives.len(), 1);
        assert_eq!(model.materials.len(), 1);

        let primitive = &model.primitives[0];
        assert_eq!(primitive.indices, vec![0, 1, 2]);
        assert_eq!(primitive.vertices.len(), 3);
        assert!(primitive.name.starts_with("tri"));

        let material = &model.materials[primitive.material];
        assert_eq!(material.name, "red");
        assert_eq!(material.base_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(material.emissive, [0.0, 0.5, 0.0]);
        assert_eq!(material.metallic, 0.25);
        assert_eq!(material.roughness, 0.75);
        assert!(material.texture.is_none());
    }

    #[test]
    fn missing_normals_are_computed() {
        let model = triangle(Matrix4::identity());
        for vertex in &model.primitives[0].vertices {
            assert!((vertex.normal[2] - 1.0).abs() < 1e-6, "{:?}", vertex.normal);
        }
    }

    #[test]
    fn node_transform_is_applied_under_placement() {
        let placement = Matrix4::from_translation(Vector3::new(1.0, 1.0, 0.0))
            * Matrix4::from_scale(0.5);
        let model = triangle(placement);
        let origin = model.primitives[0].transform * Vector4::new(0.0, 0.0, 0.0, 1.0);
        // node translation (0,0,2) scaled by 0.5, then moved by (1,1,0)
        assert_eq!(origin, Vector4::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn wide_environment_is_downscaled() {
        assert_eq!(fit_within(4096, 2048, MAX_ENVIRONMENT_WIDTH), (2048, 1024));
        assert_eq!(fit_within(1024, 512, MAX_ENVIRONMENT_WIDTH), (1024, 512));
        assert_eq!(fit_within(8192, 1, MAX_ENVIRONMENT_WIDTH), (2048, 1));
    }

    #[test]
    fn both_edges_are_bounded() {
        assert_eq!(fit_within(5000, 4, MAX_TEXTURE_DIMENSION), (4096, 3));
        assert_eq!(fit_within(4, 5000, MAX_TEXTURE_DIMENSION), (3, 4096));
        assert_eq!(fit_within(8192, 8192, MAX_TEXTURE_DIMENSION), (4096, 4096));
        assert_eq!(fit_within(4096, 10, MAX_TEXTURE_DIMENSION), (4096, 10));
    }

    #[test]
    fn oversized_panel_image_fits_the_device() {
        let path = std::env::temp_dir().join(format!("glowscene-wide-{}.png", std::process::id()));
        image::RgbaImage::from_pixel(5000, 4, image::Rgba([200, 10, 10, 255]))
            .save(&path)
            .unwrap();

        let panel = decode_panel(&path, [1.0, 1.0, 0.1], Matrix4::identity());
        std::fs::remove_file(&path).unwrap();
        let panel = panel.unwrap();

        assert_eq!(panel.image.dimensions(), (4096, 3));
        let red = panel.image.get_pixel(4095, 2)[0];
        assert!(red.abs_diff(200) <= 1, "red channel {}", red);
    }

    #[test]
    fn rgb_images_gain_opaque_alpha() {
        let rgba = expand_to_rgba(gltf::image::Format::R8G8B8, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
        assert!(expand_to_rgba(gltf::image::Format::R16, &[0, 0]).is_none());
    }

    #[test]
    fn missing_panel_image_is_an_io_error() {
        let err = decode_panel(
            Path::new("does/not/exist.png"),
            [1.0, 1.0, 0.1],
            Matrix4::identity(),
        )
        .unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }
}
