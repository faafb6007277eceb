use std::sync::Arc;

use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::broadcast;

use droidclaw::agent_engine::engine::AgentEngine;
use droidclaw::agent_engine::event_bus::RunEvent;
use droidclaw::agent_engine::history::NullSink;
use droidclaw::agent_engine::run_state::RunStateStore;
use droidclaw::agent_engine::state::{ExecutionRecord, RunStatus, StepKind};
use droidclaw::config::{AgentConfig, AppConfig, ProviderEntry};
use droidclaw::errors::{DroidClawError, PlannerError};
use droidclaw::executor::device::RecordingDevice;
use droidclaw::llm::planner::Planner;
use droidclaw::llm::provider::LlmProvider;
use droidclaw::perception::fixture::FixtureScreen;
use droidclaw::perception::types::UiNode;
use droidclaw::{build_engine, spawn_engine};

/// Always answers BACK.
struct Wanderer;

#[async_trait]
impl LlmProvider for Wanderer {
    fn name(&self) -> &str {
        "wanderer"
    }

    async fn chat(&self, _system: &str, _user: &str) -> Result<String, PlannerError> {
        Ok(r#"{"action_type":"BACK","reasoning":"look around"}"#.into())
    }
}

fn screen() -> UiNode {
    UiNode {
        children: vec![UiNode {
            text: Some("Settings".into()),
            clickable: true,
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn provider_entry(api_base: String, api_key: Option<&str>) -> ProviderEntry {
    let mut cfg = AppConfig::default();
    let mut entry = cfg
        .llm
        .providers
        .remove("openai")
        .expect("openai preset");
    entry.display_name = "Mock".into();
    entry.api_base = api_base;
    entry.api_key = api_key.map(String::from);
    entry
}

async fn wait_finished(mut events: broadcast::Receiver<RunEvent>) -> ExecutionRecord {
    loop {
        match events.recv().await {
            Ok(RunEvent::Finished { record }) => return record,
            Ok(_) => {}
            Err(e) => panic!("event stream closed: {e}"),
        }
    }
}

#[tokio::test]
async fn test_submit_runs_goal_through_http_backend() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer mock-key");
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant",
                    "content": "```json\n{\"action_type\":\"DONE\",\"reasoning\":\"already there\"}\n```"}}]
            }));
        })
        .await;

    let mut cfg = AppConfig::default();
    cfg.llm.providers.insert(
        "mock".into(),
        provider_entry(server.url("/v1/chat/completions"), Some("mock-key")),
    );
    cfg.llm.active_provider = "mock".into();

    let engine = build_engine(
        &cfg,
        Arc::new(FixtureScreen::new(screen())),
        Arc::new(RecordingDevice::new()),
        Arc::new(NullSink),
    )
    .unwrap();
    let (handle, task) = spawn_engine(engine);

    let events = handle.events();
    handle.submit("open settings").await.unwrap();
    let finished = wait_finished(events).await;

    assert_eq!(finished.status, RunStatus::Completed);
    assert_eq!(finished.command, "open settings");
    assert_eq!(finished.steps.len(), 1);
    assert_eq!(finished.steps[0].action_type, StepKind::Done);
    assert_eq!(finished.steps[0].reasoning.as_deref(), Some("already there"));
    mock.assert_async().await;

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_missing_key_fails_before_any_run() {
    let mut cfg = AppConfig::default();
    cfg.llm.providers.insert(
        "keyless".into(),
        provider_entry("http://127.0.0.1:9/v1/chat/completions".into(), None),
    );
    cfg.llm.active_provider = "keyless".into();
    std::env::remove_var("DROIDCLAW_KEYLESS_API_KEY");

    let result = build_engine(
        &cfg,
        Arc::new(FixtureScreen::new(screen())),
        Arc::new(RecordingDevice::new()),
        Arc::new(NullSink),
    );
    assert!(matches!(result, Err(DroidClawError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_through_handle() {
    let store = Arc::new(RunStateStore::new(Arc::new(NullSink)));
    let engine = AgentEngine::new(
        Arc::new(FixtureScreen::new(screen())),
        Arc::new(RecordingDevice::new()),
        Planner::with_system_prompt(Arc::new(Wanderer), "test".into()),
        store,
        AgentConfig::default(),
    );
    let (handle, task) = spawn_engine(engine);
    let mut events = handle.events();
    let mut state = handle.subscribe();

    handle.submit("wander").await.unwrap();

    let record = loop {
        match events.recv().await.unwrap() {
            RunEvent::StepCompleted { record } if record.step == 1 => handle.cancel(),
            RunEvent::Finished { record } => break record,
            _ => {}
        }
    };

    assert_eq!(record.status, RunStatus::Cancelled);
    assert_eq!(record.steps.len(), 1);
    assert_eq!(record.result_message, "Cancelled by user after 1 step.");

    // store returns to idle after archival
    state
        .wait_for(|s| s.status == RunStatus::Idle)
        .await
        .unwrap();
    assert!(!handle.state().cancel_requested);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_right_after_submit_ends_queued_goal() {
    let store = Arc::new(RunStateStore::new(Arc::new(NullSink)));
    let device = Arc::new(RecordingDevice::new());
    let engine = AgentEngine::new(
        Arc::new(FixtureScreen::new(screen())),
        device.clone(),
        Planner::with_system_prompt(Arc::new(Wanderer), "test".into()),
        store,
        AgentConfig::default(),
    );
    let (handle, task) = spawn_engine(engine);
    let events = handle.events();

    handle.submit("wander").await.unwrap();
    handle.cancel();
    let record = wait_finished(events).await;

    assert_eq!(record.status, RunStatus::Cancelled);
    assert!(record.steps.is_empty());
    assert_eq!(record.result_message, "Cancelled by user after 0 steps.");
    assert!(device.calls().is_empty());

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_idle_does_not_touch_next_goal() {
    let store = Arc::new(RunStateStore::new(Arc::new(NullSink)));
    let engine = AgentEngine::new(
        Arc::new(FixtureScreen::new(screen())),
        Arc::new(RecordingDevice::new()),
        Planner::with_system_prompt(Arc::new(Wanderer), "test".into()),
        store,
        AgentConfig {
            max_steps: 5,
            ..AgentConfig::default()
        },
    );
    let (handle, task) = spawn_engine(engine);
    let events = handle.events();

    handle.cancel();
    handle.submit("wander").await.unwrap();
    let record = wait_finished(events).await;

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.steps.len(), 5);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}
