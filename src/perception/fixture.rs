//! Recorded screens replayed as a `ScreenSource`.
//!
//! Used by the dry-run binary and by tests. Each `snapshot()` call returns the
//! next queued screen; the last one repeats once the queue is exhausted. A
//! `None` entry simulates a moment with no active window.

use std::path::Path;
use std::sync::Mutex;

use crate::errors::{DroidClawError, DroidClawResult};
use crate::perception::traits::{NoActiveWindow, ScreenSource};
use crate::perception::types::UiNode;

pub struct FixtureScreen {
    frames: Mutex<FrameQueue>,
}

struct FrameQueue {
    frames: Vec<Option<UiNode>>,
    cursor: usize,
}

impl FixtureScreen {
    pub fn new(screen: UiNode) -> Self {
        Self::sequence(vec![Some(screen)])
    }

    pub fn sequence(frames: Vec<Option<UiNode>>) -> Self {
        Self {
            frames: Mutex::new(FrameQueue { frames, cursor: 0 }),
        }
    }

    /// Loads a single snapshot, or an array of snapshots, from a JSON file.
    pub fn from_file(path: &Path) -> DroidClawResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let frames = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|v| serde_json::from_value::<Option<UiNode>>(v))
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![Some(serde_json::from_value(other)?)],
        };
        if frames.is_empty() {
            return Err(DroidClawError::Perception(format!(
                "{} contains no screens",
                path.display()
            )));
        }
        tracing::info!(path = %path.display(), frames = frames.len(), "fixture screens loaded");
        Ok(Self::sequence(frames))
    }
}

impl ScreenSource for FixtureScreen {
    fn snapshot(&self) -> Result<UiNode, NoActiveWindow> {
        let mut queue = self.frames.lock().map_err(|_| NoActiveWindow)?;
        if queue.frames.is_empty() {
            return Err(NoActiveWindow);
        }
        let index = queue.cursor.min(queue.frames.len() - 1);
        if queue.cursor < queue.frames.len() {
            queue.cursor += 1;
        }
        queue.frames[index].clone().ok_or(NoActiveWindow)
    }
}
