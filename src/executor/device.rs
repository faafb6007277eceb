// Platform action primitives.
use std::sync::Mutex;

use crate::agent_engine::state::ScrollDirection;
use crate::perception::types::{Located, NodePath};

/// Action primitives of the live UI. Implementations map the snapshot path
/// in `Located` back to their own node objects. "Not found" and "platform
/// refused" are both reported as `false`, never as a panic.
pub trait Device: Send + Sync {
    fn tap(&self, target: &Located<'_>) -> bool;
    fn focus(&self, target: &Located<'_>) -> bool;
    fn set_text(&self, target: &Located<'_>, text: &str) -> bool;
    fn scroll(&self, target: &Located<'_>, direction: ScrollDirection) -> bool;
    fn global_back(&self) -> bool;
    fn global_home(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Tap { path: NodePath, label: Option<String> },
    Focus { path: NodePath },
    SetText { path: NodePath, text: String },
    Scroll { path: NodePath, direction: ScrollDirection },
    Back,
    Home,
}

/// Device that performs nothing and remembers every call. Backs the dry-run
/// binary and the test suites.
pub struct RecordingDevice {
    calls: Mutex<Vec<DeviceCall>>,
    succeed: bool,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            succeed: true,
        }
    }

    /// Every primitive reports failure.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            succeed: false,
        }
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn push(&self, call: DeviceCall) -> bool {
        tracing::info!(?call, ok = self.succeed, "device call");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        self.succeed
    }
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for RecordingDevice {
    fn tap(&self, target: &Located<'_>) -> bool {
        let label = target
            .node
            .text
            .clone()
            .or_else(|| target.node.description.clone())
            .or_else(|| target.node.element_id.clone());
        self.push(DeviceCall::Tap {
            path: target.path.clone(),
            label,
        })
    }

    fn focus(&self, target: &Located<'_>) -> bool {
        self.push(DeviceCall::Focus {
            path: target.path.clone(),
        })
    }

    fn set_text(&self, target: &Located<'_>, text: &str) -> bool {
        self.push(DeviceCall::SetText {
            path: target.path.clone(),
            text: text.to_string(),
        })
    }

    fn scroll(&self, target: &Located<'_>, direction: ScrollDirection) -> bool {
        self.push(DeviceCall::Scroll {
            path: target.path.clone(),
            direction,
        })
    }

    fn global_back(&self) -> bool {
        self.push(DeviceCall::Back)
    }

    fn global_home(&self) -> bool {
        self.push(DeviceCall::Home)
    }
}
