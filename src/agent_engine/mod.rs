pub mod engine;
pub mod event_bus;
pub mod history;
pub mod loop_control;
pub mod run_state;
pub mod state;

pub use engine::AgentEngine;
pub use event_bus::RunEvent;
pub use history::{ExecutionSink, JsonlExecutionSink, NullSink};
pub use run_state::RunStateStore;
