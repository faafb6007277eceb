pub mod agent_engine;
pub mod config;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use crate::agent_engine::engine::AgentEngine;
use crate::agent_engine::event_bus::RunEvent;
use crate::agent_engine::history::ExecutionSink;
use crate::agent_engine::run_state::RunStateStore;
use crate::agent_engine::state::{AgentEvent, RunState};
use crate::config::AppConfig;
use crate::errors::{DroidClawError, DroidClawResult};
use crate::executor::device::Device;
use crate::llm::planner::Planner;
use crate::llm::registry::ProviderRegistry;
use crate::perception::traits::ScreenSource;

/// Handle for feeding goals into a spawned engine and watching its runs.
#[derive(Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<AgentEvent>,
    store: Arc<RunStateStore>,
}

impl AgentHandle {
    /// Queues a goal. Goals run one at a time in submission order.
    pub async fn submit(&self, goal: impl Into<String>) -> DroidClawResult<()> {
        self.store.goal_queued();
        if let Err(e) = self.tx.send(AgentEvent::GoalReceived(goal.into())).await {
            self.store.goal_dequeued();
            return Err(DroidClawError::Agent(format!("engine is not running: {e}")));
        }
        Ok(())
    }

    /// Cancels the current run at the top of its next step. Right after
    /// `submit` this targets the queued goal, which then ends with zero steps.
    pub fn cancel(&self) {
        self.store.request_cancel();
    }

    /// Stops the engine once the current run (if any) has finished.
    pub async fn shutdown(&self) -> DroidClawResult<()> {
        self.tx
            .send(AgentEvent::Stop)
            .await
            .map_err(|e| DroidClawError::Agent(format!("engine is not running: {e}")))
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.store.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<RunEvent> {
        self.store.events()
    }

    pub fn state(&self) -> RunState {
        self.store.snapshot()
    }
}

/// Builds an engine from config, resolving the active planner backend.
/// Configuration problems (unknown provider, missing key) surface here.
pub fn build_engine(
    config: &AppConfig,
    screen: Arc<dyn ScreenSource>,
    device: Arc<dyn Device>,
    sink: Arc<dyn ExecutionSink>,
) -> DroidClawResult<AgentEngine> {
    let provider = ProviderRegistry::from_config(config).get_active()?;
    let planner = Planner::new(provider, &config.agent);
    let store = Arc::new(RunStateStore::new(sink));
    Ok(AgentEngine::new(
        screen,
        device,
        planner,
        store,
        config.agent.clone(),
    ))
}

/// Moves the engine onto a tokio task and returns its handle.
pub fn spawn_engine(engine: AgentEngine) -> (AgentHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<AgentEvent>(32);
    let handle = AgentHandle {
        tx,
        store: engine.store().clone(),
    };
    tracing::info!("spawning agent engine task");
    let task = tokio::spawn(async move {
        engine.run_loop(rx).await;
        tracing::info!("agent engine task exited");
    });
    (handle, task)
}

/// Installs the fmt subscriber; `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
