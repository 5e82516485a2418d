//! Hover state machine
//!
//! Every object moves to Hovered or Idle depending on whether it is in the
//! latest [`HoverResult`]. The cursor style is derived from all objects
//! together after the update, never from the one that just changed.

use super::hit_test::HoverResult;
use super::object::{HoverState, InteractiveSet, ObjectId};

/// Cursor the host should display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    /// Something under the pointer is interactive
    Pointer,
}

impl CursorStyle {
    pub fn icon(self) -> winit::window::CursorIcon {
        match self {
            CursorStyle::Default => winit::window::CursorIcon::Default,
            CursorStyle::Pointer => winit::window::CursorIcon::Pointer,
        }
    }
}

/// Outcome of one pointer-move
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HoverUpdate {
    pub cursor: CursorStyle,
    /// Objects that went Idle → Hovered
    pub entered: Vec<ObjectId>,
    /// Objects that went Hovered → Idle
    pub exited: Vec<ObjectId>,
}

impl HoverUpdate {
    pub fn changed(&self) -> bool {
        !self.entered.is_empty() || !self.exited.is_empty()
    }
}

/// Applies a hit result to every object and returns the aggregated cursor
pub fn apply(objects: &mut InteractiveSet, hits: &HoverResult) -> HoverUpdate {
    let mut update = HoverUpdate::default();

    for object in objects.iter_mut() {
        let target = if hits.contains(object.id()) {
            HoverState::Hovered
        } else {
            HoverState::Idle
        };

        if object.set_state(target) {
            log::debug!("'{}' is now {:?}", object.id(), target);
            match target {
                HoverState::Hovered => update.entered.push(object.id().clone()),
                HoverState::Idle => update.exited.push(object.id().clone()),
            }
        }
    }

    update.cursor = cursor_for(objects);
    update
}

/// Cursor implied by the current state of all objects
pub fn cursor_for(objects: &InteractiveSet) -> CursorStyle {
    if objects.any_hovered() {
        CursorStyle::Pointer
    } else {
        CursorStyle::Default
    }
}
