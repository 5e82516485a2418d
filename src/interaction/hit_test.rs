//! Hit testing
//!
//! Each object is tested on its own against the ray through the pointer;
//! several objects may be hit by the same ray.

use std::collections::BTreeSet;

use super::object::{InteractiveSet, ObjectId};
use super::pointer::PointerState;
use super::ray::{Ray, Shape};

/// Produces a world-space ray through a point in normalized device coordinates
pub trait RayCaster {
    /// `None` when no ray can be formed (e.g. a degenerate projection)
    fn cast_ray(&self, pointer: PointerState) -> Option<Ray>;
}

impl<T: RayCaster + ?Sized> RayCaster for &T {
    fn cast_ray(&self, pointer: PointerState) -> Option<Ray> {
        (**self).cast_ray(pointer)
    }
}

/// Ids of all objects hit by one pointer position
pub type HoverResult = BTreeSet<ObjectId>;

/// Whether `ray` touches `shape`
pub fn hit_test(ray: &Ray, shape: &Shape) -> bool {
    shape.intersect_ray(ray).is_some()
}

/// Hit-tests every object in `objects` against the ray through `pointer`
pub fn hits<C: RayCaster>(caster: &C, pointer: PointerState, objects: &InteractiveSet) -> HoverResult {
    let Some(ray) = caster.cast_ray(pointer) else {
        // Fires on every move while the projection is degenerate
        log::debug!("camera produced no ray for pointer {:?}", pointer);
        return HoverResult::new();
    };

    objects
        .iter()
        .filter(|object| hit_test(&ray, object.shape()))
        .map(|object| object.id().clone())
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use cgmath::Vector3;

    use super::*;

    /// Orthographic caster looking down -Z: NDC maps straight onto world XY.
    pub struct OrthoCaster;

    impl RayCaster for OrthoCaster {
        fn cast_ray(&self, pointer: PointerState) -> Option<Ray> {
            Some(Ray::new(
                Vector3::new(pointer.x, pointer.y, 10.0),
                Vector3::new(0.0, 0.0, -1.0),
            ))
        }
    }

    pub struct BlindCaster;

    impl RayCaster for BlindCaster {
        fn cast_ray(&self, _pointer: PointerState) -> Option<Ray> {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::test_support::{BlindCaster, OrthoCaster};
    use super::*;
    use crate::interaction::object::InteractiveObject;

    fn set_with(shapes: &[(&str, Shape)]) -> InteractiveSet {
        let mut set = InteractiveSet::new();
        for (id, shape) in shapes {
            set.insert(InteractiveObject::new(*id, *shape, 0.2, 1.0, Box::new(|| Ok(()))).unwrap())
                .unwrap();
        }
        set
    }

    #[test]
    fn reports_every_object_under_pointer() {
        let set = set_with(&[
            ("a", Shape::sphere(Vector3::new(0.0, 0.0, 0.0), 0.3)),
            ("b", Shape::sphere(Vector3::new(0.1, 0.0, -2.0), 0.3)),
            ("c", Shape::sphere(Vector3::new(-0.8, 0.8, 0.0), 0.1)),
        ]);

        let result = hits(&OrthoCaster, PointerState::new(0.05, 0.0), &set);
        let expected: HoverResult = ["a", "b"].into_iter().map(ObjectId::from).collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn empty_space_hits_nothing() {
        let set = set_with(&[("a", Shape::sphere(Vector3::new(0.0, 0.0, 0.0), 0.3))]);
        assert!(hits(&OrthoCaster, PointerState::new(0.9, -0.9), &set).is_empty());
    }

    #[test]
    fn missing_ray_hits_nothing() {
        let set = set_with(&[("a", Shape::sphere(Vector3::new(0.0, 0.0, 0.0), 5.0))]);
        assert!(hits(&BlindCaster, PointerState::new(0.0, 0.0), &set).is_empty());
    }

    #[test]
    fn box_shapes_are_hit_tested() {
        let panel = crate::interaction::ray::Aabb::from_center_size(
            Vector3::new(0.5, 0.5, 0.0),
            Vector3::new(0.2, 0.2, 0.05),
        );
        let set = set_with(&[("panel", Shape::Box(panel))]);
        assert_eq!(hits(&OrthoCaster, PointerState::new(0.55, 0.45), &set).len(), 1);
        assert!(hits(&OrthoCaster, PointerState::new(0.7, 0.45), &set).is_empty());
    }
}
