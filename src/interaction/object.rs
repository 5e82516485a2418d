//! Interactive objects and the set that owns them

use std::fmt;

use crate::error::InteractionError;

use super::ray::Shape;

/// Stable identifier of an interactive object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Callback run when the object is clicked
pub type ClickAction = Box<dyn FnMut() -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Hovered,
}

/// A scene element that reacts to hover and click
pub struct InteractiveObject {
    id: ObjectId,
    shape: Shape,
    base_intensity: f32,
    hover_intensity: f32,
    current_intensity: f32,
    state: HoverState,
    on_click: ClickAction,
}

impl InteractiveObject {
    /// Validates the shape and intensities; objects start Idle at `base_intensity`.
    pub fn new(
        id: impl Into<ObjectId>,
        shape: Shape,
        base_intensity: f32,
        hover_intensity: f32,
        on_click: ClickAction,
    ) -> Result<Self, InteractionError> {
        let id = id.into();
        if let Some(reason) = shape.defect() {
            return Err(InteractionError::InvalidShape { id, reason });
        }
        if !base_intensity.is_finite() || !hover_intensity.is_finite() {
            return Err(InteractionError::InvalidIntensity { id });
        }

        Ok(Self {
            id,
            shape,
            base_intensity,
            hover_intensity,
            current_intensity: base_intensity,
            state: HoverState::Idle,
            on_click,
        })
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn base_intensity(&self) -> f32 {
        self.base_intensity
    }

    pub fn hover_intensity(&self) -> f32 {
        self.hover_intensity
    }

    pub fn current_intensity(&self) -> f32 {
        self.current_intensity
    }

    pub fn state(&self) -> HoverState {
        self.state
    }

    pub fn is_hovered(&self) -> bool {
        self.state == HoverState::Hovered
    }

    /// Moves to `state` and applies its intensity. Returns whether the state changed.
    pub(crate) fn set_state(&mut self, state: HoverState) -> bool {
        self.current_intensity = match state {
            HoverState::Idle => self.base_intensity,
            HoverState::Hovered => self.hover_intensity,
        };
        let changed = self.state != state;
        self.state = state;
        changed
    }

    pub(crate) fn invoke(&mut self) -> anyhow::Result<()> {
        (self.on_click)()
    }
}

impl fmt::Debug for InteractiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractiveObject")
            .field("id", &self.id)
            .field("shape", &self.shape)
            .field("base_intensity", &self.base_intensity)
            .field("hover_intensity", &self.hover_intensity)
            .field("current_intensity", &self.current_intensity)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Registration-ordered collection of interactive objects
#[derive(Debug, Default)]
pub struct InteractiveSet {
    objects: Vec<InteractiveObject>,
}

impl InteractiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: InteractiveObject) -> Result<(), InteractionError> {
        if self.get(object.id()).is_some() {
            return Err(InteractionError::DuplicateId(object.id().clone()));
        }
        self.objects.push(object);
        Ok(())
    }

    pub fn get(&self, id: &ObjectId) -> Option<&InteractiveObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractiveObject> {
        self.objects.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut InteractiveObject> {
        self.objects.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn any_hovered(&self) -> bool {
        self.objects.iter().any(InteractiveObject::is_hovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Vector3, Zero};

    fn noop() -> ClickAction {
        Box::new(|| Ok(()))
    }

    #[test]
    fn new_object_starts_idle_at_base_intensity() {
        let obj =
            InteractiveObject::new("a", Shape::sphere(Vector3::zero(), 1.0), 0.2, 1.0, noop())
                .unwrap();
        assert_eq!(obj.state(), HoverState::Idle);
        assert_eq!(obj.current_intensity(), 0.2);
    }

    #[test]
    fn invalid_shape_is_rejected_at_setup() {
        let err =
            InteractiveObject::new("bad", Shape::sphere(Vector3::zero(), -1.0), 0.2, 1.0, noop())
                .unwrap_err();
        assert!(matches!(err, InteractionError::InvalidShape { .. }));
    }

    #[test]
    fn non_finite_intensity_is_rejected() {
        let err = InteractiveObject::new(
            "bad",
            Shape::sphere(Vector3::zero(), 1.0),
            f32::NAN,
            1.0,
            noop(),
        )
        .unwrap_err();
        assert_eq!(err, InteractionError::InvalidIntensity { id: ObjectId::new("bad") });
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut set = InteractiveSet::new();
        let make = || {
            InteractiveObject::new("a", Shape::sphere(Vector3::zero(), 1.0), 0.2, 1.0, noop())
                .unwrap()
        };
        set.insert(make()).unwrap();
        assert_eq!(
            set.insert(make()).unwrap_err(),
            InteractionError::DuplicateId(ObjectId::new("a"))
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn set_state_reports_transitions() {
        let mut obj =
            InteractiveObject::new("a", Shape::sphere(Vector3::zero(), 1.0), 0.2, 1.0, noop())
                .unwrap();
        assert!(obj.set_state(HoverState::Hovered));
        assert_eq!(obj.current_intensity(), 1.0);
        assert!(!obj.set_state(HoverState::Hovered));
        assert!(obj.set_state(HoverState::Idle));
        assert_eq!(obj.current_intensity(), 0.2);
    }
}
