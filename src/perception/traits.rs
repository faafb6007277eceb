use thiserror::Error;

use crate::perception::types::{Bounds, UiNode};

/// The platform reported no foreground window to read. Transient: the
/// engine waits and snapshots again.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no active window")]
pub struct NoActiveWindow;

/// Source of screen snapshots. Implemented by platform glue.
pub trait ScreenSource: Send + Sync {
    fn snapshot(&self) -> Result<UiNode, NoActiveWindow>;
}

/// Read-only view of one node in the platform's live accessibility tree.
/// `capture` copies these into an owned `UiNode` tree.
pub trait PlatformNode: Sized {
    fn text(&self) -> Option<String>;
    fn hint_text(&self) -> Option<String>;
    fn description(&self) -> Option<String>;
    fn element_id(&self) -> Option<String>;
    fn package_name(&self) -> Option<String>;
    fn class_name(&self) -> Option<String>;
    fn bounds(&self) -> Bounds;
    fn is_clickable(&self) -> bool;
    fn is_editable(&self) -> bool;
    fn is_scrollable(&self) -> bool;
    fn child_count(&self) -> usize;
    /// Children may disappear between `child_count` and `child`.
    fn child(&self, index: usize) -> Option<Self>;
}
