use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::agent_engine::loop_control::{LoopController, Recovery};
use crate::agent_engine::run_state::RunStateStore;
use crate::agent_engine::state::{AgentEvent, RunOutcome, RunStatus, StepKind, StepRecord};
use crate::config::AgentConfig;
use crate::executor::device::Device;
use crate::executor::dispatcher;
use crate::llm::planner::Planner;
use crate::perception::traits::ScreenSource;
use crate::perception::types::UiNode;
use crate::perception::ui_tree::log_tree;

/// Observe → plan → act loop. One run at a time; each step completes before
/// the next begins because every decision depends on the previous mutation.
pub struct AgentEngine {
    screen: Arc<dyn ScreenSource>,
    device: Arc<dyn Device>,
    planner: Planner,
    store: Arc<RunStateStore>,
    config: AgentConfig,
}

/// How a step ended, before it is written to the store.
enum StepEnd {
    Continue,
    Finished(RunStatus, String),
}

impl AgentEngine {
    pub fn new(
        screen: Arc<dyn ScreenSource>,
        device: Arc<dyn Device>,
        planner: Planner,
        store: Arc<RunStateStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            screen,
            device,
            planner,
            store,
            config: config.normalized(),
        }
    }

    pub fn store(&self) -> &Arc<RunStateStore> {
        &self.store
    }

    /// Serves goals from `rx` one after another until `Stop` or channel close.
    pub async fn run_loop(self, mut rx: mpsc::Receiver<AgentEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                AgentEvent::GoalReceived(goal) => {
                    let outcome = self.run(&goal).await;
                    tracing::info!(
                        goal = %goal,
                        status = ?outcome.status,
                        steps = outcome.steps,
                        "run finished: {}",
                        outcome.message
                    );
                }
                AgentEvent::Stop => break,
            }
        }
        tracing::info!("agent engine stopped");
    }

    /// Drives one goal to a terminal status, archives it and returns the
    /// store to IDLE.
    pub async fn run(&self, goal: &str) -> RunOutcome {
        let cfg = self.config.clone();
        let step_delay = Duration::from_millis(cfg.step_delay_ms);

        self.store.on_run_started(goal, cfg.max_steps);
        // Dequeue after RUNNING is published; a racing cancel sees one or the other.
        self.store.goal_dequeued();
        tracing::info!(
            goal = %goal,
            max_steps = cfg.max_steps,
            provider = %self.planner.provider_name(),
            "run started"
        );
        sleep(Duration::from_millis(cfg.initial_delay_ms)).await;

        let mut loop_ctrl = LoopController::new(cfg.hint_threshold, cfg.force_back_threshold);
        let mut history: Vec<String> = Vec::new();
        let mut window_misses: u32 = 0;
        let mut step: u32 = 1;

        let (status, message) = loop {
            if self.store.is_cancel_requested() {
                break (
                    RunStatus::Cancelled,
                    format!("Cancelled by user after {}.", steps_phrase(step - 1)),
                );
            }
            if step > cfg.max_steps {
                break (
                    RunStatus::Failed,
                    format!(
                        "Reached the step limit ({}) without completing the goal.",
                        cfg.max_steps
                    ),
                );
            }

            if loop_ctrl.recovery() == Recovery::ForceBack {
                self.force_back(step, &mut loop_ctrl, &mut history);
                step += 1;
                sleep(step_delay).await;
                continue;
            }

            let snapshot = match self.screen.snapshot() {
                Ok(snapshot) => {
                    window_misses = 0;
                    snapshot
                }
                Err(e) => {
                    window_misses += 1;
                    if window_misses < cfg.window_retry_limit {
                        tracing::warn!(step, attempt = window_misses, "{e}; retrying");
                        sleep(step_delay).await;
                        continue;
                    }
                    window_misses = 0;
                    let msg = format!("No active window after {} attempts", cfg.window_retry_limit);
                    self.record_error(step, msg, &mut loop_ctrl, &mut history);
                    step += 1;
                    sleep(step_delay).await;
                    continue;
                }
            };

            match self
                .step(goal, step, &snapshot, &mut loop_ctrl, &mut history)
                .await
            {
                StepEnd::Finished(status, message) => break (status, message),
                StepEnd::Continue => {
                    step += 1;
                    sleep(step_delay).await;
                }
            }
        };

        let steps = self.store.step_count();
        match status {
            RunStatus::Completed => tracing::info!(goal = %goal, steps, "{message}"),
            _ => tracing::warn!(goal = %goal, steps, status = ?status, "{message}"),
        }
        self.store.on_run_finished(status, &message);
        self.store.reset();

        RunOutcome {
            status,
            message,
            steps,
        }
    }

    /// Plan and act on one fresh snapshot.
    async fn step(
        &self,
        goal: &str,
        step: u32,
        snapshot: &UiNode,
        loop_ctrl: &mut LoopController,
        history: &mut Vec<String>,
    ) -> StepEnd {
        tracing::info!(step, nodes = snapshot.node_count(), "observing screen");
        log_tree(snapshot);

        if loop_ctrl.recovery() == Recovery::Hint {
            let hint = loop_ctrl.stuck_hint();
            tracing::warn!(step, failures = loop_ctrl.failures(), "injecting stuck hint");
            history.push(hint);
        }

        let proposal = match self.planner.propose(goal, history, snapshot).await {
            Ok(p) => p,
            Err(e) => {
                self.record_error(step, e.to_string(), loop_ctrl, history);
                return StepEnd::Continue;
            }
        };

        if proposal.is_done() {
            self.store.on_step_completed(StepRecord::new(
                step,
                StepKind::Done,
                None,
                proposal.reasoning.clone(),
                true,
            ));
            return StepEnd::Finished(
                RunStatus::Completed,
                format!("Goal achieved in {}.", steps_phrase(step)),
            );
        }

        let success = dispatcher::execute(snapshot, self.device.as_ref(), &proposal.action);
        if success {
            loop_ctrl.record_success();
        } else {
            loop_ctrl.record_failure();
        }
        tracing::info!(
            step,
            action = %proposal.action.kind(),
            success,
            failures = loop_ctrl.failures(),
            "step executed"
        );

        history.push(proposal.to_history_entry(step, success));
        self.store.on_step_completed(StepRecord::new(
            step,
            proposal.action.kind(),
            proposal.action.target_text().map(String::from),
            proposal.reasoning,
            success,
        ));
        StepEnd::Continue
    }

    fn force_back(&self, step: u32, loop_ctrl: &mut LoopController, history: &mut Vec<String>) {
        let failures = loop_ctrl.failures();
        tracing::warn!(step, failures, "too many consecutive failures; forcing BACK");
        let ok = self.device.global_back();

        history.push(format!(
            "Step {step} [SYSTEM]: Forced BACK due to {failures} consecutive failures (result: {ok})"
        ));
        self.store.on_step_completed(StepRecord::new(
            step,
            StepKind::System,
            Some("BACK".into()),
            Some(format!("Forced BACK after {failures} consecutive failures")),
            ok,
        ));
        loop_ctrl.reset();
    }

    fn record_error(
        &self,
        step: u32,
        message: String,
        loop_ctrl: &mut LoopController,
        history: &mut Vec<String>,
    ) {
        tracing::error!(step, error = %message, "step failed");
        loop_ctrl.record_failure();
        history.push(format!("Step {step} [ERROR]: {message}"));
        self.store.on_step_completed(StepRecord::new(
            step,
            StepKind::Error,
            None,
            Some(message),
            false,
        ));
    }
}

fn steps_phrase(n: u32) -> String {
    if n == 1 {
        "1 step".to_string()
    } else {
        format!("{n} steps")
    }
}
