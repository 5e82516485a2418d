//! # Asset Loading
//!
//! Scene content that lives on disk: the glTF model, the image panels and
//! the HDR environment. Each [`AssetDescriptor`] is decoded on its own
//! worker thread by [`AssetLoader`]; the event-loop thread drains the
//! resulting [`LoadEvent`]s and inserts them into the [`Scene`]. Arrival
//! order does not matter, every asset lands in its own objects.

pub mod decode;
pub mod descriptor;
pub mod loader;

pub use decode::{EnvironmentData, MaterialData, ModelData, PanelData, PrimitiveData};
pub use descriptor::{AssetDescriptor, AssetKind};
pub use loader::{AssetLoader, LoadEvent, LoadedAsset};

use crate::gfx::{
    geometry::generate_box,
    resources::material::{Material, Shading},
    scene::{object::Mesh, object::Object, scene::Scene},
};

impl ModelData {
    /// Adds one object per primitive, returning how many were added
    pub fn add_to_scene(self, name: &str, scene: &mut Scene) -> usize {
        let material_ids: Vec<String> = self
            .materials
            .into_iter()
            .enumerate()
            .map(|(slot, data)| {
                let id = format!("{}/{}#{}", name, data.name, slot);
                let mut material = Material::new(&id, data.base_color, data.metallic, data.roughness)
                    .with_emission(data.emissive[0], data.emissive[1], data.emissive[2]);
                if let Some(texture) = data.texture {
                    material = material.with_texture(texture);
                }
                scene.add_material(material);
                id
            })
            .collect();

        let mut added = 0;
        for primitive in self.primitives {
            let mut object = Object::new(
                format!("{}/{}", name, primitive.name),
                vec![Mesh::new(primitive.vertices, primitive.indices)],
            )
            .with_transform(primitive.transform);
            if let Some(id) = material_ids.get(primitive.material) {
                object = object.with_material(id);
            }
            scene.add_object(object);
            added += 1;
        }
        added
    }
}

impl PanelData {
    /// Adds the textured box for this panel
    pub fn add_to_scene(self, name: &str, scene: &mut Scene) -> usize {
        let [width, height, depth] = self.size;
        let material_id = format!("{}/image", name);
        scene.add_material(
            Material::new(&material_id, [1.0, 1.0, 1.0, 1.0], 0.0, 1.0)
                .with_shading(Shading::Lambert)
                .with_texture(self.image),
        );

        let geometry = generate_box(width, height, depth);
        scene.add_object(
            Object::new(name, vec![Mesh::from_geometry(&geometry)])
                .with_transform(self.transform)
                .with_material(&material_id),
        )
    }
}
