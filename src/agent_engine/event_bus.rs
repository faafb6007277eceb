use serde::Serialize;
use tokio::sync::broadcast;

use crate::agent_engine::state::{ExecutionRecord, StepRecord};

/// Run transitions, in the order the engine produces them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Started { command: String, max_steps: u32 },
    StepCompleted { record: StepRecord },
    Finished { record: ExecutionRecord },
    Reset,
}

/// Fan-out of `RunEvent`s. Publishing never blocks and never fails the
/// publisher; slow subscribers see `RecvError::Lagged`.
pub struct EventBus {
    tx: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: RunEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("run event dropped: no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
