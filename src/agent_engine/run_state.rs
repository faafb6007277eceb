//! Authoritative state of the current run.
//!
//! The engine is the only writer. Everyone else reads through `subscribe()`
//! (latest `RunState`) or `events()` (every transition); the only thing a
//! reader may change is the cancellation flag.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};

use crate::agent_engine::event_bus::{EventBus, RunEvent};
use crate::agent_engine::history::ExecutionSink;
use crate::agent_engine::state::{ExecutionRecord, RunState, RunStatus, StepRecord};

pub struct RunStateStore {
    state_tx: watch::Sender<RunState>,
    events: EventBus,
    cancel: AtomicBool,
    /// Goals submitted through a handle that the engine has not picked up yet.
    queued: AtomicUsize,
    sink: Arc<dyn ExecutionSink>,
    started_at: Mutex<DateTime<Utc>>,
}

impl RunStateStore {
    pub fn new(sink: Arc<dyn ExecutionSink>) -> Self {
        let (state_tx, _) = watch::channel(RunState::default());
        Self {
            state_tx,
            events: EventBus::default(),
            cancel: AtomicBool::new(false),
            queued: AtomicUsize::new(0),
            sink,
            started_at: Mutex::new(Utc::now()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> RunState {
        self.state_tx.borrow().clone()
    }

    pub fn status(&self) -> RunStatus {
        self.state_tx.borrow().status
    }

    pub fn step_count(&self) -> u32 {
        self.state_tx.borrow().current_step
    }

    /// Flags the current run, or the next queued one if no run has started
    /// yet. With nothing running or queued the request is dropped.
    pub fn request_cancel(&self) {
        if self.queued.load(Ordering::SeqCst) == 0 && self.status() != RunStatus::Running {
            tracing::debug!("cancellation requested with no run pending; ignored");
            return;
        }
        self.cancel.store(true, Ordering::SeqCst);
        self.state_tx.send_modify(|s| s.cancel_requested = true);
        tracing::info!("cancellation requested");
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn goal_queued(&self) {
        self.queued.fetch_add(1, Ordering::SeqCst);
    }

    /// Saturates at zero; direct `AgentEngine::run` calls never queued.
    pub fn goal_dequeued(&self) {
        let _ = self
            .queued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// The cancel flag is left alone: a request made while the goal sat in
    /// the queue belongs to this run. `reset` clears it.
    pub fn on_run_started(&self, command: &str, max_steps: u32) {
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Utc::now();
        self.state_tx.send_replace(RunState {
            status: RunStatus::Running,
            command: Some(command.to_string()),
            current_step: 0,
            max_steps,
            current_reasoning: None,
            live_steps: Vec::new(),
            cancel_requested: self.is_cancel_requested(),
        });
        self.events.publish(RunEvent::Started {
            command: command.to_string(),
            max_steps,
        });
    }

    pub fn on_step_completed(&self, record: StepRecord) {
        self.state_tx.send_modify(|s| {
            s.current_reasoning = record.reasoning.clone();
            s.live_steps.push(record.clone());
            s.current_step = s.live_steps.len() as u32;
        });
        self.events.publish(RunEvent::StepCompleted { record });
    }

    /// Publishes the terminal status and archives the run. Sink failures are
    /// logged only.
    pub fn on_run_finished(&self, status: RunStatus, message: &str) -> ExecutionRecord {
        debug_assert!(status.is_terminal());
        let start_time = *self.started_at.lock().unwrap_or_else(|e| e.into_inner());

        let record = {
            let s = self.state_tx.borrow();
            ExecutionRecord {
                id: uuid::Uuid::new_v4(),
                command: s.command.clone().unwrap_or_default(),
                status,
                result_message: message.to_string(),
                steps: s.live_steps.clone(),
                start_time,
                end_time: Utc::now(),
            }
        };
        self.state_tx.send_modify(|s| {
            s.status = status;
            s.current_reasoning = Some(message.to_string());
        });

        if let Err(e) = self.sink.record(&record) {
            tracing::error!(error = %e, run = %record.id, "failed to persist execution record");
        }
        self.events.publish(RunEvent::Finished {
            record: record.clone(),
        });
        record
    }

    pub fn reset(&self) {
        self.cancel.store(false, Ordering::SeqCst);
        self.state_tx.send_replace(RunState::default());
        self.events.publish(RunEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_engine::history::NullSink;
    use crate::agent_engine::state::StepKind;
    use crate::errors::{DroidClawError, DroidClawResult};

    struct FailingSink;

    impl ExecutionSink for FailingSink {
        fn record(&self, _record: &ExecutionRecord) -> DroidClawResult<()> {
            Err(DroidClawError::Persistence("disk full".into()))
        }
    }

    #[test]
    fn test_step_counter_tracks_live_steps() {
        let store = RunStateStore::new(Arc::new(NullSink));
        let rx = store.subscribe();
        store.on_run_started("open settings", 10);
        store.on_step_completed(StepRecord::new(1, StepKind::Click, Some("Settings".into()), Some("tap".into()), true));
        store.on_step_completed(StepRecord::new(2, StepKind::Error, None, Some("boom".into()), false));

        let state = rx.borrow().clone();
        assert_eq!(state.status, RunStatus::Running);
        assert_eq!(state.current_step, 2);
        assert_eq!(state.live_steps.len(), 2);
        assert_eq!(state.current_reasoning.as_deref(), Some("boom"));
    }

    #[test]
    fn test_cancel_while_idle_is_ignored() {
        let store = RunStateStore::new(Arc::new(NullSink));
        store.request_cancel();
        assert!(!store.is_cancel_requested());

        store.on_run_started("goal", 5);
        assert!(!store.snapshot().cancel_requested);
    }

    #[test]
    fn test_cancel_of_queued_goal_survives_run_start() {
        let store = RunStateStore::new(Arc::new(NullSink));
        store.goal_queued();
        store.request_cancel();
        store.goal_dequeued();

        store.on_run_started("goal", 5);
        assert!(store.is_cancel_requested());
        assert!(store.snapshot().cancel_requested);

        store.on_run_finished(RunStatus::Cancelled, "Cancelled by user after 0 steps.");
        store.reset();
        assert!(!store.is_cancel_requested());
    }

    #[test]
    fn test_dequeue_never_underflows() {
        let store = RunStateStore::new(Arc::new(NullSink));
        store.goal_dequeued();
        store.request_cancel();
        assert!(!store.is_cancel_requested());
    }

    #[test]
    fn test_finish_survives_sink_failure() {
        let store = RunStateStore::new(Arc::new(FailingSink));
        let mut events = store.events();
        store.on_run_started("goal", 5);
        store.on_step_completed(StepRecord::new(1, StepKind::Done, None, None, true));
        let record = store.on_run_finished(RunStatus::Completed, "ok");

        assert_eq!(record.command, "goal");
        assert_eq!(record.steps.len(), 1);
        assert_eq!(store.status(), RunStatus::Completed);

        store.reset();
        assert_eq!(store.snapshot(), RunState::default());

        assert!(matches!(events.try_recv(), Ok(RunEvent::Started { .. })));
        assert!(matches!(events.try_recv(), Ok(RunEvent::StepCompleted { .. })));
        assert!(matches!(events.try_recv(), Ok(RunEvent::Finished { .. })));
        assert!(matches!(events.try_recv(), Ok(RunEvent::Reset)));
    }
}
