//! Click dispatch
//!
//! Every object hit by the click gets its action run exactly once. A
//! failing action (error or panic) is logged and recorded; dispatch moves
//! on to the next object regardless.

use std::panic::{self, AssertUnwindSafe};

use super::hit_test::HoverResult;
use super::object::{InteractiveSet, ObjectId};

/// What happened during one click
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClickReport {
    /// Objects whose action ran to completion
    pub invoked: Vec<ObjectId>,
    /// Objects whose action failed, with the failure message
    pub failed: Vec<(ObjectId, String)>,
}

impl ClickReport {
    pub fn is_empty(&self) -> bool {
        self.invoked.is_empty() && self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.invoked.len() + self.failed.len()
    }
}

/// Runs the action of every object in `hits`
pub fn dispatch(objects: &mut InteractiveSet, hits: &HoverResult) -> ClickReport {
    let mut report = ClickReport::default();

    for object in objects.iter_mut().filter(|o| hits.contains(o.id())) {
        let id = object.id().clone();
        match panic::catch_unwind(AssertUnwindSafe(|| object.invoke())) {
            Ok(Ok(())) => report.invoked.push(id),
            Ok(Err(err)) => {
                log::error!("click action for '{}' failed: {:#}", id, err);
                report.failed.push((id, format!("{:#}", err)));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("click action for '{}' panicked: {}", id, message);
                report.failed.push((id, message));
            }
        }
    }

    report
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
