//! # Pointer Interaction
//!
//! Hover and click handling for a small set of interactive objects.
//!
//! ## How it works
//!
//! 1. **Normalize**: pointer pixels + viewport size become NDC ([`pointer`])
//! 2. **Hit test**: the camera casts a ray through that point and every
//!    object is tested against it on its own ([`hit_test`])
//! 3. **Hover**: hit objects go Hovered, everything else goes Idle, and the
//!    cursor is derived from all of them together ([`hover`])
//! 4. **Click**: a click re-runs the hit test and fires the action of
//!    every object it hits ([`click`])
//!
//! ## Usage
//!
//! ```no_run
//! use glowscene::interaction::{Interactions, InteractiveObject, Shape, Viewport};
//! use glowscene::gfx::camera::OrbitCamera;
//! use cgmath::Vector3;
//!
//! let camera = OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 0.0), 1.5);
//! let mut interactions = Interactions::new();
//! interactions
//!     .register(InteractiveObject::new(
//!         "orb",
//!         Shape::sphere(Vector3::new(0.0, 0.0, 0.0), 0.5),
//!         0.2,
//!         1.0,
//!         Box::new(|| Ok(())),
//!     )?)?;
//!
//! let viewport = Viewport::new(1200.0, 800.0).unwrap();
//! let update = interactions.pointer_moved((600.0, 400.0), viewport, &camera);
//! println!("cursor: {:?}", update.cursor);
//! # Ok::<(), glowscene::error::InteractionError>(())
//! ```

pub mod click;
pub mod hit_test;
pub mod hover;
pub mod object;
pub mod pointer;
pub mod ray;

pub use click::ClickReport;
pub use hit_test::{HoverResult, RayCaster};
pub use hover::{CursorStyle, HoverUpdate};
pub use object::{ClickAction, HoverState, InteractiveObject, InteractiveSet, ObjectId};
pub use pointer::{PointerState, Viewport};
pub use ray::{Aabb, BoundingSphere, Ray, Shape};

use crate::error::InteractionError;

/// Owns the interactive objects and routes pointer events through them
#[derive(Debug, Default)]
pub struct Interactions {
    objects: InteractiveSet,
    cursor: CursorStyle,
    last_pointer: Option<PointerState>,
}

impl Interactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, object: InteractiveObject) -> Result<(), InteractionError> {
        self.objects.insert(object)
    }

    /// Handles a pointer-move at pixel `position`
    pub fn pointer_moved<C: RayCaster>(
        &mut self,
        position: (f32, f32),
        viewport: Viewport,
        caster: &C,
    ) -> HoverUpdate {
        let pointer = PointerState::from_screen(position, viewport);
        self.last_pointer = Some(pointer);

        let hits = hit_test::hits(caster, pointer, &self.objects);
        let update = hover::apply(&mut self.objects, &hits);
        self.cursor = update.cursor;
        update
    }

    /// Handles a click at pixel `position`
    pub fn clicked<C: RayCaster>(
        &mut self,
        position: (f32, f32),
        viewport: Viewport,
        caster: &C,
    ) -> ClickReport {
        let pointer = PointerState::from_screen(position, viewport);
        let hits = hit_test::hits(caster, pointer, &self.objects);
        click::dispatch(&mut self.objects, &hits)
    }

    /// Cursor implied by the latest pointer-move
    pub fn cursor(&self) -> CursorStyle {
        self.cursor
    }

    pub fn last_pointer(&self) -> Option<PointerState> {
        self.last_pointer
    }

    pub fn get(&self, id: &ObjectId) -> Option<&InteractiveObject> {
        self.objects.get(id)
    }

    /// Current emissive intensity of `id`, for the renderer
    pub fn intensity(&self, id: &ObjectId) -> Option<f32> {
        self.objects.get(id).map(InteractiveObject::current_intensity)
    }

    pub fn objects(&self) -> &InteractiveSet {
        &self.objects
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use cgmath::Vector3;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::hit_test::test_support::{BlindCaster, OrthoCaster};
    use super::*;

    const BASE: f32 = 0.2;
    const HOVER: f32 = 1.0;

    fn viewport() -> Viewport {
        Viewport::new(1000.0, 1000.0).unwrap()
    }

    /// Pixel position of an NDC point in the square test viewport
    fn px(x: f32, y: f32) -> (f32, f32) {
        PointerState::new(x, y).to_screen(viewport())
    }

    fn with_spheres(spheres: &[(&str, f32, f32, f32)], clicks: &Rc<Cell<u32>>) -> Interactions {
        let mut interactions = Interactions::new();
        for &(id, x, y, r) in spheres {
            let clicks = Rc::clone(clicks);
            interactions
                .register(
                    InteractiveObject::new(
                        id,
                        Shape::sphere(Vector3::new(x, y, 0.0), r),
                        BASE,
                        HOVER,
                        Box::new(move || {
                            clicks.set(clicks.get() + 1);
                            Ok(())
                        }),
                    )
                    .unwrap(),
                )
                .unwrap();
        }
        interactions
    }

    #[test]
    fn pointer_inside_projection_hovers() {
        let clicks = Rc::new(Cell::new(0));
        let mut interactions = with_spheres(&[("a", 0.0, 0.0, 0.5)], &clicks);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let dist = rng.random_range(0.0..0.49);
            let pos = px(dist * angle.cos(), dist * angle.sin());

            interactions.pointer_moved(pos, viewport(), &OrthoCaster);
            assert_eq!(interactions.intensity(&"a".into()), Some(HOVER));
            assert_eq!(interactions.cursor(), CursorStyle::Pointer);
        }
    }

    #[test]
    fn pointer_outside_all_projections_is_idle() {
        let clicks = Rc::new(Cell::new(0));
        let mut interactions =
            with_spheres(&[("a", -0.5, 0.0, 0.2), ("b", 0.5, 0.0, 0.2)], &clicks);
        let mut rng = StdRng::seed_from_u64(23);

        let mut checked = 0;
        while checked < 200 {
            let (x, y) = (rng.random_range(-1.0..1.0f32), rng.random_range(-1.0..1.0f32));
            let near = |cx: f32| ((x - cx).powi(2) + y * y).sqrt() <= 0.21;
            if near(-0.5) || near(0.5) {
                continue;
            }
            checked += 1;

            let update = interactions.pointer_moved(px(x, y), viewport(), &OrthoCaster);
            assert_eq!(update.cursor, CursorStyle::Default);
            assert!(interactions
                .objects()
                .iter()
                .all(|o| o.current_intensity() == o.base_intensity()));
        }
    }

    #[test]
    fn overlapping_objects_hover_and_click_together() {
        let clicks = Rc::new(Cell::new(0));
        let mut interactions =
            with_spheres(&[("a", 0.0, 0.0, 0.3), ("b", 0.2, 0.0, 0.3)], &clicks);

        let update = interactions.pointer_moved(px(0.1, 0.0), viewport(), &OrthoCaster);
        assert_eq!(update.entered.len(), 2);
        assert_eq!(update.cursor, CursorStyle::Pointer);

        // Off "a" but still on "b"
        let update = interactions.pointer_moved(px(0.45, 0.0), viewport(), &OrthoCaster);
        assert_eq!(update.exited, vec![ObjectId::from("a")]);
        assert_eq!(update.cursor, CursorStyle::Pointer);

        let update = interactions.pointer_moved(px(0.9, 0.9), viewport(), &OrthoCaster);
        assert_eq!(update.cursor, CursorStyle::Default);

        let report = interactions.clicked(px(0.1, 0.0), viewport(), &OrthoCaster);
        assert_eq!(report.invoked.len(), 2);
        assert_eq!(clicks.get(), 2);
    }

    #[test]
    fn click_on_empty_space_fires_nothing() {
        let clicks = Rc::new(Cell::new(0));
        let mut interactions = with_spheres(&[("a", 0.0, 0.0, 0.3)], &clicks);

        let report = interactions.clicked(px(-0.9, -0.9), viewport(), &OrthoCaster);
        assert!(report.is_empty());
        assert_eq!(clicks.get(), 0);
    }

    #[test]
    fn clicking_does_not_change_hover_state() {
        let clicks = Rc::new(Cell::new(0));
        let mut interactions = with_spheres(&[("a", 0.0, 0.0, 0.3)], &clicks);

        interactions.clicked(px(0.0, 0.0), viewport(), &OrthoCaster);
        assert_eq!(interactions.intensity(&"a".into()), Some(BASE));
        assert_eq!(interactions.cursor(), CursorStyle::Default);
    }

    #[test]
    fn last_pointer_tracks_moves() {
        let clicks = Rc::new(Cell::new(0));
        let mut interactions = with_spheres(&[("a", 0.0, 0.0, 0.3)], &clicks);
        assert!(interactions.last_pointer().is_none());

        interactions.pointer_moved((250.0, 250.0), viewport(), &OrthoCaster);
        assert_eq!(interactions.last_pointer(), Some(PointerState::new(-0.5, 0.5)));
    }

    #[test]
    fn moves_without_a_ray_hover_nothing() {
        let clicks = Rc::new(Cell::new(0));
        let mut interactions = with_spheres(&[("a", 0.0, 0.0, 0.5)], &clicks);
        interactions.pointer_moved(px(0.0, 0.0), viewport(), &OrthoCaster);

        // Degenerate camera: first move drops the hover, the rest are no-ops
        let first = interactions.pointer_moved(px(0.0, 0.0), viewport(), &BlindCaster);
        assert_eq!(first.exited, vec![ObjectId::from("a")]);
        for step in 0..50 {
            let pos = px(step as f32 * 0.01, 0.0);
            let update = interactions.pointer_moved(pos, viewport(), &BlindCaster);
            assert!(!update.changed());
            assert_eq!(update.cursor, CursorStyle::Default);
        }
        assert_eq!(interactions.intensity(&"a".into()), Some(BASE));
    }
}
