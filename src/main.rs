use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use droidclaw::agent_engine::history::{ExecutionSink, JsonlExecutionSink, NullSink};
use droidclaw::agent_engine::state::RunStatus;
use droidclaw::config::{self, AppConfig};
use droidclaw::executor::device::RecordingDevice;
use droidclaw::perception::fixture::FixtureScreen;
use droidclaw::{build_engine, init_tracing};

/// DroidClaw - dry-run an automation goal against recorded screens
#[derive(Parser, Debug)]
#[command(
    name = "droidclaw",
    about = "Runs one goal through the observe/plan/act loop against a JSON UI snapshot",
    after_help = "ENVIRONMENT VARIABLES:\n\
        DROIDCLAW_<ID>_API_KEY   API key for provider <ID> (e.g. DROIDCLAW_OPENAI_API_KEY)\n\
        DROIDCLAW_CONFIG         Path to config.toml\n\
        RUST_LOG                 Log filter (default: info)"
)]
struct Args {
    /// Natural-language goal, e.g. "open settings"
    goal: String,

    /// JSON file holding one snapshot or an array of snapshots (null = no window)
    #[arg(short, long)]
    screen: PathBuf,

    /// Path to config.toml (default: next to the executable, then the working directory)
    #[arg(short, long, env = "DROIDCLAW_CONFIG")]
    config: Option<PathBuf>,

    /// Override the active provider id
    #[arg(short, long)]
    provider: Option<String>,

    /// Override the step budget (clamped to 5-30)
    #[arg(long)]
    max_steps: Option<u32>,

    /// Do not append the run to the execution history file
    #[arg(long)]
    no_history: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let _ = dotenvy::dotenv();
    init_tracing("info");
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using built-in configuration");
            AppConfig::default()
        }),
    };
    if let Some(provider) = args.provider {
        cfg.llm.active_provider = provider;
    }
    if let Some(max_steps) = args.max_steps {
        cfg.agent.max_steps = max_steps;
    }

    let screen = Arc::new(FixtureScreen::from_file(&args.screen)?);
    let device = Arc::new(RecordingDevice::new());
    let sink: Arc<dyn ExecutionSink> = if args.no_history {
        Arc::new(NullSink)
    } else {
        let sink = JsonlExecutionSink::in_data_dir();
        tracing::info!(path = %sink.path().display(), "recording execution history");
        Arc::new(sink)
    };

    let engine = build_engine(&cfg, screen, device.clone(), sink)?;

    let store = engine.store().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            store.request_cancel();
        }
    });

    let outcome = engine.run(&args.goal).await;

    println!("{:?}: {}", outcome.status, outcome.message);
    for call in device.calls() {
        println!("  {call:?}");
    }

    Ok(if outcome.status == RunStatus::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
