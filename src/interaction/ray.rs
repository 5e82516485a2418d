//! Rays and hit-testable shapes
//!
//! Intersection routines return the distance along the ray to the nearest
//! hit in front of the origin, or `None`. A ray starting inside a shape
//! counts as a hit.

use cgmath::{InnerSpace, Vector3};

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Ray origin point in world space
    pub origin: Vector3<f32>,
    /// Ray direction (normalized)
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Create a new ray, normalizing `direction`
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }
}

/// Sphere bounds in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vector3<f32>,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vector3<f32>, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Ray-sphere intersection (geometric form)
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let to_center = self.center - ray.origin;
        let t_closest = to_center.dot(ray.direction);
        let dist_sq = to_center.magnitude2() - t_closest * t_closest;
        let radius_sq = self.radius * self.radius;
        if dist_sq > radius_sq {
            return None;
        }

        let half_chord = (radius_sq - dist_sq).sqrt();
        let t_near = t_closest - half_chord;
        let t_far = t_closest + half_chord;

        if t_far < 0.0 {
            None
        } else if t_near >= 0.0 {
            Some(t_near)
        } else {
            Some(t_far)
        }
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Box of the given full extents centered on `center`
    pub fn from_center_size(center: Vector3<f32>, size: Vector3<f32>) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    /// Slab test
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < f32::EPSILON {
                // Parallel to this slab: must already be inside it
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let (t0, t1) = {
                let a = (lo - origin) * inv;
                let b = (hi - origin) * inv;
                if a <= b {
                    (a, b)
                } else {
                    (b, a)
                }
            };
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
        }

        if t_near <= t_far && t_far >= 0.0 {
            Some(if t_near >= 0.0 { t_near } else { t_far })
        } else {
            None
        }
    }

}

/// Anything an interactive object can be hit-tested as
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere(BoundingSphere),
    Box(Aabb),
}

impl Shape {
    pub fn sphere(center: Vector3<f32>, radius: f32) -> Self {
        Shape::Sphere(BoundingSphere::new(center, radius))
    }

    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        match self {
            Shape::Sphere(sphere) => sphere.intersect_ray(ray),
            Shape::Box(aabb) => aabb.intersect_ray(ray),
        }
    }

    /// Reason the shape cannot be hit-tested, if any
    pub(crate) fn defect(&self) -> Option<&'static str> {
        let finite = |v: Vector3<f32>| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
        match self {
            Shape::Sphere(s) if !finite(s.center) => Some("sphere center is not finite"),
            Shape::Sphere(s) if !(s.radius.is_finite() && s.radius > 0.0) => {
                Some("sphere radius must be positive")
            }
            Shape::Box(b) if !finite(b.min) || !finite(b.max) => Some("box corners are not finite"),
            Shape::Box(b) if b.min.x > b.max.x || b.min.y > b.max.y || b.min.z > b.max.z => {
                Some("box min corner exceeds max corner")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Zero;

    use super::*;

    #[test]
    fn test_ray_aabb_intersection() {
        let aabb = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));

        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(aabb.intersect_ray(&ray), Some(4.0));

        let ray_miss = Ray::new(Vector3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray_miss).is_none());
    }

    #[test]
    fn test_ray_sphere_hits_front_surface() {
        let sphere = BoundingSphere::new(Vector3::new(0.0, 0.0, -10.0), 0.5);
        let ray = Ray::new(Vector3::zero(), Vector3::new(0.0, 0.0, -1.0));

        let t = sphere.intersect_ray(&ray).expect("ray points at the sphere");
        assert!((t - 9.5).abs() < 1e-5);
        assert!((ray.point_at(t).z + 9.5).abs() < 1e-5);
    }

    #[test]
    fn test_ray_sphere_behind_origin_misses() {
        let sphere = BoundingSphere::new(Vector3::new(0.0, 0.0, 10.0), 0.5);
        let ray = Ray::new(Vector3::zero(), Vector3::new(0.0, 0.0, -1.0));
        assert!(sphere.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_ray_from_inside_sphere_hits() {
        let sphere = BoundingSphere::new(Vector3::zero(), 2.0);
        let ray = Ray::new(Vector3::zero(), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(sphere.intersect_ray(&ray), Some(2.0));
    }

    #[test]
    fn test_axis_parallel_ray_outside_slab_misses() {
        let aabb = Aabb::from_center_size(Vector3::zero(), Vector3::new(2.0, 2.0, 2.0));
        let ray = Ray::new(Vector3::new(0.0, 3.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_shape_defects() {
        assert!(Shape::sphere(Vector3::zero(), 0.0).defect().is_some());
        assert!(Shape::sphere(Vector3::new(f32::NAN, 0.0, 0.0), 1.0).defect().is_some());
        assert!(Shape::Box(Aabb::new(Vector3::new(1.0, 0.0, 0.0), Vector3::zero()))
            .defect()
            .is_some());
        assert!(Shape::sphere(Vector3::zero(), 0.5).defect().is_none());
    }

}
