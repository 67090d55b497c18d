//! spnbridge binary
//!
//! Runs one session through its whole lifecycle against the loopback host:
//! start (which initializes), pause, resume, end, terminate. Useful for
//! checking a config file and watching the bridge's trace output.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use spnbridge::loopback::{port_bundle, LoopbackContextFactory, LoopbackHost};
use spnbridge::{
    AudioNode, EngineHandle, PublicEvents, RealmContext, ReleaseLatch, SessionController,
    SessionOptions,
};
use spnconf::BridgeConfig;
use spnproto::PlayState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spnbridge")]
#[command(about = "Drive an audio session through a loopback worker realm")]
#[command(version)]
struct Cli {
    /// Config file used in place of ./spnbridge.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Input channel count
    #[arg(long)]
    inputs: Option<u32>,

    /// Output channel count
    #[arg(long)]
    outputs: Option<u32>,

    /// Leave the worker node unconnected
    #[arg(long)]
    no_auto_connect: bool,

    /// Print the merged configuration and exit
    #[arg(long)]
    print_config: bool,
}

/// Logs every controller notification.
struct TracedEvents;

impl PublicEvents for TracedEvents {
    fn performance_started(&self) {
        info!("event: performance started");
    }

    fn performance_paused(&self) {
        info!("event: performance paused");
    }

    fn performance_resumed(&self) {
        info!("event: performance resumed");
    }

    fn audio_node_created(&self, node: Option<Arc<dyn AudioNode>>) {
        match node {
            Some(node) => info!("event: audio node created ({})", node.id()),
            None => info!("event: audio node missing"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = BridgeConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(rate) = cli.sample_rate {
        config.session.sample_rate = rate;
    }
    if let Some(inputs) = cli.inputs {
        config.session.inputs_count = inputs;
    }
    if let Some(outputs) = cli.outputs {
        config.session.outputs_count = outputs;
    }
    if cli.no_auto_connect {
        config.session.auto_connect = false;
    }
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},spnbridge=debug", config.telemetry.log_level))
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("spnbridge {} starting", env!("CARGO_PKG_VERSION"));

    let host = Arc::new(LoopbackHost::new());
    let realm = Arc::new(RealmContext::new(host.clone(), &config.realm));
    let latch = Arc::new(ReleaseLatch::new());
    let engine = EngineHandle::new().with_releases(latch.clone());

    // Main-side peers stay alive for the whole run
    let (ports, main_ends) = port_bundle();

    let mut controller = SessionController::new(
        realm,
        Arc::new(LoopbackContextFactory::new()),
        SessionOptions::from(&config.session),
    )
    .with_engine(engine)
    .with_public_events(Arc::new(TracedEvents))
    .with_ipc_ports(ports);

    // The loopback engine acknowledges every step immediately
    latch.release_start();
    controller.on_play_state_change(PlayState::PerformanceStarted).await;
    report(&controller)?;

    latch.release_pause();
    controller.on_play_state_change(PlayState::PerformancePaused).await;
    report(&controller)?;

    latch.release_resume();
    controller.on_play_state_change(PlayState::PerformanceResumed).await;
    report(&controller)?;

    controller.on_play_state_change(PlayState::PerformanceEnded).await;
    report(&controller)?;

    let calls = host.journal().calls();
    let open = main_ends.iter().filter(|p| !p.is_closed()).count();
    info!("worker saw {} calls, {} of {} channels open", calls.len(), open, main_ends.len());

    controller.terminate_instance().await;
    report(&controller)?;

    info!("spnbridge done");
    Ok(())
}

fn report(controller: &SessionController) -> Result<()> {
    let snapshot = serde_json::to_string(&controller.snapshot())?;
    println!("{}", snapshot);
    Ok(())
}
