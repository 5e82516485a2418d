use wgpu::Device;

use crate::gfx::{
    camera::camera_utils::CameraManager,
    resources::material::{Material, MaterialManager},
};
use crate::interaction::Interactions;
use crate::wgpu_utils::binding_builder::BindGroupLayoutWithDesc;

use super::object::Object;

/// Main scene containing objects, materials, and camera
pub struct Scene {
    pub camera_manager: CameraManager,
    pub objects: Vec<Object>,
    pub material_manager: MaterialManager,
    transform_layout: Option<BindGroupLayoutWithDesc>,
}

impl Scene {
    pub fn new(camera_manager: CameraManager) -> Self {
        Self {
            camera_manager,
            objects: Vec::new(),
            material_manager: MaterialManager::new(),
            transform_layout: None,
        }
    }

    /// Applies damped camera input and refreshes camera matrices
    pub fn update(&mut self) {
        self.camera_manager.update();
    }

    /// Adds an object; it is uploaded on the next `prepare`
    pub fn add_object(&mut self, object: Object) -> usize {
        let name = self.ensure_unique_name(&object.name);
        let mut object = object;
        object.name = name;
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn add_material(&mut self, material: Material) {
        self.material_manager.add_material(material);
    }

    /// Creates the shared layouts; must run before pipelines are built
    pub fn init_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        self.material_manager.init_gpu(device, queue);
        if self.transform_layout.is_none() {
            self.transform_layout = Some(Object::create_transform_layout(device));
        }
        self.prepare(device, queue);
    }

    /// Uploads new objects and syncs transforms and materials
    pub fn prepare(&mut self, device: &Device, queue: &wgpu::Queue) {
        if let Some(layout) = &self.transform_layout {
            for object in &mut self.objects {
                if object.gpu_resources.is_none() {
                    object.init_gpu_resources(device, layout);
                } else {
                    object.update_transform(queue);
                }
            }
        }
        self.material_manager.update_all_gpu_resources(device, queue);
    }

    /// Copies each interactive object's current glow into its material
    pub fn sync_interactive(&mut self, interactions: &Interactions) {
        for object in &self.objects {
            let (Some(id), Some(material_id)) = (object.interactive_id(), object.get_material_id())
            else {
                continue;
            };
            let Some(intensity) = interactions.intensity(id) else {
                continue;
            };
            if let Some(material) = self.material_manager.get_material_mut(material_id) {
                material.emissive_intensity = intensity;
            }
        }
    }

    /// Material assigned to `object`, or the default
    pub fn get_material_for_object(&self, object: &Object) -> &Material {
        self.material_manager
            .get_material_for_object(object.get_material_id())
    }

    pub fn transform_bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.transform_layout.as_ref().map(|l| &l.layout)
    }

    pub fn get_object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn get_object(&self, index: usize) -> Option<&Object> {
        self.objects.get(index)
    }

    pub fn find_object(&self, name: &str) -> Option<&Object> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn get_statistics(&self) -> SceneStatistics {
        SceneStatistics {
            object_count: self.objects.len(),
            material_count: self.material_manager.list_materials().len(),
            total_triangles: self.objects.iter().map(Object::triangle_count).sum(),
            total_vertices: self
                .objects
                .iter()
                .flat_map(|obj| obj.meshes.iter().map(|m| m.vertex_count()))
                .sum(),
        }
    }

    pub fn ensure_unique_name(&self, desired_name: &str) -> String {
        let mut counter = 0;
        let mut test_name = desired_name.to_string();

        while self.objects.iter().any(|obj| obj.name == test_name) {
            counter += 1;
            test_name = format!("{} ({})", desired_name, counter);
        }

        test_name
    }
}

/// Scene statistics for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub object_count: usize,
    pub material_count: usize,
    pub total_triangles: u32,
    pub total_vertices: u32,
}

#[cfg(test)]
mod tests {
    use cgmath::{Vector3, Zero};

    use super::*;
    use crate::gfx::camera::{CameraController, OrbitCamera};
    use crate::gfx::geometry::generate_sphere;
    use crate::gfx::scene::object::Mesh;
    use crate::interaction::{InteractiveObject, ObjectId, PointerState, Ray, RayCaster, Shape, Viewport};

    fn scene() -> Scene {
        let camera = OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), 1.0);
        Scene::new(CameraManager::new(camera, CameraController::new(0.01, 0.5)))
    }

    /// Ray straight down -Z through the NDC point, scaled to world units
    struct Straight;

    impl RayCaster for Straight {
        fn cast_ray(&self, pointer: PointerState) -> Option<Ray> {
            Some(Ray::new(
                Vector3::new(pointer.x * 10.0, pointer.y * 10.0, 10.0),
                Vector3::new(0.0, 0.0, -1.0),
            ))
        }
    }

    #[test]
    fn duplicate_names_are_suffixed() {
        let mut scene = scene();
        scene.add_object(Object::new("panel", Vec::new()));
        scene.add_object(Object::new("panel", Vec::new()));
        scene.add_object(Object::new("panel", Vec::new()));
        assert!(scene.find_object("panel (1)").is_some());
        assert!(scene.find_object("panel (2)").is_some());
    }

    #[test]
    fn hover_intensity_reaches_material() {
        let mut scene = scene();
        scene.add_material(
            Material::new("orb", [1.0; 4], 0.5, 0.3).with_emissive_intensity(0.2),
        );
        scene.add_object(
            Object::new("orb", vec![Mesh::from_geometry(&generate_sphere(0.5, 16, 8))])
                .with_material("orb")
                .with_interactive(ObjectId::from("orb")),
        );

        let mut interactions = Interactions::new();
        interactions
            .register(
                InteractiveObject::new("orb", Shape::sphere(Vector3::zero(), 0.5), 0.2, 1.0, Box::new(|| Ok(())))
                    .unwrap(),
            )
            .unwrap();
        let viewport = Viewport::new(100.0, 100.0).unwrap();

        interactions.pointer_moved((50.0, 50.0), viewport, &Straight);
        scene.sync_interactive(&interactions);
        assert_eq!(scene.material_manager.get_material("orb").unwrap().emissive_intensity, 1.0);

        interactions.pointer_moved((0.0, 0.0), viewport, &Straight);
        scene.sync_interactive(&interactions);
        assert_eq!(scene.material_manager.get_material("orb").unwrap().emissive_intensity, 0.2);
    }

    #[test]
    fn statistics_count_geometry() {
        let mut scene = scene();
        scene.add_object(Object::new("orb", vec![Mesh::from_geometry(&generate_sphere(0.5, 16, 8))]));
        let stats = scene.get_statistics();
        assert_eq!(stats.object_count, 1);
        assert_eq!(stats.material_count, 1);
        assert_eq!(stats.total_triangles, 256);
        assert_eq!(stats.total_vertices, 153);
    }
}
