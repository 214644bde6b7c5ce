#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! echobeats — a self-driving cognitive inference scheduler.
//!
//! ```sh
//! echobeats start                 # run indefinitely (default)
//! echobeats checkpoint            # initialize state and write one snapshot, then exit
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use echobeats::clock::Context;
use echobeats::config::EchoConfig;
use echobeats::dream::DreamConsolidator;
use echobeats::echobeats::EchobeatsScheduler;
use echobeats::engine::{InferenceEngine, MockEngine};
use echobeats::episodic::EpisodicBuffer;
use echobeats::identity::Identity;
use echobeats::jobs::JobStore;
use echobeats::memory::MemoryStore;
use echobeats::opponent::{CycleSignals, OpponentRegulator};
use echobeats::resilience::checkpoint::{CheckpointConfig, CheckpointScheduler};
use echobeats::snapshot::{self, Snapshot, SNAPSHOT_VERSION};
use echobeats::wake::WakeController;

/// echobeats — a self-driving cognitive inference scheduler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Path to the snapshot file
    #[arg(long, default_value = "state/snapshot.json", global = true)]
    snapshot_path: PathBuf,

    /// Directory for the durable job store
    #[arg(long, default_value = "state/jobs", global = true)]
    jobs_dir: PathBuf,
}

#[derive(Subcommand, Debug, Default, Clone, Copy)]
enum Command {
    /// Run indefinitely, loading a snapshot if one exists (default).
    #[default]
    Start,
    /// Initialize state (restoring a snapshot if present) and write a
    /// single checkpoint, then exit.
    Checkpoint,
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn main() -> std::process::ExitCode {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_new(&args.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    if let Err(e) = echobeats::resilience::install_panic_hooks() {
        eprintln!("warning: failed to install panic hooks: {e}");
    }

    let runtime = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    let command = args.command.unwrap_or_default();

    match runtime.block_on(run(command, &args.snapshot_path, &args.jobs_dir)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("echobeats exiting with error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
async fn run(command: Command, snapshot_path: &PathBuf, jobs_dir: &PathBuf) -> Result<(), echobeats::error::EchoError> {
    let config = EchoConfig::default();

    let restored = snapshot::load(snapshot_path).await?;
    if restored.is_some() {
        info!("restored snapshot from {}", snapshot_path.display());
    } else {
        info!("no snapshot found at {}, starting fresh", snapshot_path.display());
    }

    let (mut memory, mut identity, mut wake, mut opponent, cycle_counter) = match restored {
        Some(snap) => {
            let (nodes, edges) = (snap.memory_nodes, snap.hyperedges);
            let memory = MemoryStore::restore_from_snapshot(config.memory, nodes, edges);
            let opponent = OpponentRegulator::restore(config.opponent, snap.opponent_pairs);
            let wake = WakeController::restore(config.wake, snap.fatigue);
            (memory, snap.identity, wake, opponent, snap.cycle_counter)
        }
        None => (
            MemoryStore::new(config.memory),
            Identity::new("echobeats", config.memory.embedding_dim),
            WakeController::new(config.wake),
            OpponentRegulator::new(config.opponent),
            0u64,
        ),
    };

    let mut episodic = EpisodicBuffer::new(config.buffer_capacity);
    let mut dreamer = DreamConsolidator::new();

    let mut job_store = JobStore::open_with_config(jobs_dir, config.jobs).await?;
    info!("job store opened with {} pending jobs", job_store.len());

    let mut engines: Vec<Box<dyn InferenceEngine>> = Vec::with_capacity(3);
    for _ in 0..3 {
        let mut engine = MockEngine::new();
        engine.initialize("mock-v1").await?;
        engines.push(Box::new(engine));
    }
    let engines: [Box<dyn InferenceEngine>; 3] =
        engines.try_into().unwrap_or_else(|_| unreachable!("exactly 3 engines were pushed"));
    let mut scheduler = EchobeatsScheduler::new(config.echobeats, engines);

    let checkpoint_scheduler_config =
        CheckpointConfig { cycle_interval: 100, time_interval: config.snapshot_interval };
    let mut checkpoints = CheckpointScheduler::new(checkpoint_scheduler_config);

    info!("echobeats ready; cycle {cycle_counter} onward");

    if matches!(command, Command::Checkpoint) {
        let snap = build_snapshot(&memory, &identity, &wake, &opponent, cycle_counter);
        snapshot::write_atomic(snapshot_path, &snap).await?;
        info!("wrote checkpoint to {}", snapshot_path.display());
        return Ok(());
    }

    let mut shutdown = Box::pin(shutdown_signal());
    let mut cycle = cycle_counter;

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!("shutdown signal received, writing final snapshot");
                break;
            }
            cycle_report = run_one_cycle(&mut scheduler, &mut episodic, &mut memory, &mut wake, &mut identity) => {
                cycle += 1;
                opponent.update_on_cycle_end(cycle_signals(&cycle_report, &wake));
                if cycle_report.gated {
                    handle_wake_gate(&mut wake, &mut dreamer, &mut episodic, &mut memory);
                }

                if checkpoints.is_due(cycle) {
                    let snap = build_snapshot(&memory, &identity, &wake, &opponent, cycle);
                    if let Err(e) = snapshot::write_atomic(snapshot_path, &snap).await {
                        warn!("checkpoint failed: {e}");
                    } else {
                        checkpoints.record_checkpoint(cycle);
                    }
                }

                if let Err(e) = job_store.reap(Utc::now()).await {
                    warn!("job reap failed: {e}");
                }
            }
        }
    }

    let final_snapshot = build_snapshot(&memory, &identity, &wake, &opponent, cycle);
    snapshot::write_atomic(snapshot_path, &final_snapshot).await?;
    info!("final snapshot written, {} memory nodes, {} cycles", memory.len(), cycle);

    Ok(())
}

async fn run_one_cycle(
    scheduler: &mut EchobeatsScheduler,
    episodic: &mut EpisodicBuffer,
    memory: &mut MemoryStore,
    wake: &mut WakeController,
    identity: &mut Identity,
) -> echobeats::echobeats::CycleReport {
    let ctx = Context::with_timeout(Duration::from_secs(5));
    scheduler.run_cycle(&ctx, episodic, memory, wake, identity).await
}

/// Derives this cycle's opponent-process signals from its own report,
/// independent of whether the cycle ended in a dream.
fn cycle_signals(report: &echobeats::echobeats::CycleReport, wake: &WakeController) -> CycleSignals {
    let distinct_streams: std::collections::HashSet<_> = report
        .outcomes
        .iter()
        .filter_map(|o| match o {
            echobeats::echobeats::StepOutcome::Completed { stream_id, .. } => Some(*stream_id),
            _ => None,
        })
        .collect();
    CycleSignals {
        pattern_diversity: distinct_streams.len() as f32 / 3.0,
        cycle_completion_success: report.steps_run as f32 / 12.0,
        fatigue_trend: wake.fatigue(),
    }
}

/// Drives the Resting -> {Dreaming, Awake} decision once the scheduler
/// has reported the wake gate closed for a cycle. A no-op unless the
/// controller has actually reached `Resting`.
fn handle_wake_gate(
    wake: &mut WakeController,
    dreamer: &mut DreamConsolidator,
    episodic: &mut EpisodicBuffer,
    memory: &mut MemoryStore,
) {
    if wake.skip_dream_if_rested().unwrap_or(false) {
        return;
    }
    if wake.ready_to_dream(true) {
        match wake.begin_dreaming() {
            Ok(()) => {
                let report = dreamer.run_cycle(episodic, memory, Utc::now()).unwrap_or_default();
                info!(
                    "dream cycle: {} decayed, {} strengthened, {} consolidated, {} patterns, {} wisdoms",
                    report.episodes_decayed,
                    report.episodes_strengthened,
                    report.episodes_consolidated,
                    report.patterns_created,
                    report.wisdom_created
                );
                let _ = wake.dream_completed();
                let _ = wake.finish_waking();
            }
            Err(e) => warn!("could not begin dreaming: {e}"),
        }
    }
}

fn build_snapshot(
    memory: &MemoryStore,
    identity: &Identity,
    wake: &WakeController,
    opponent: &OpponentRegulator,
    cycle_counter: u64,
) -> Snapshot {
    let (memory_nodes, hyperedges) = memory.export_for_snapshot();
    Snapshot {
        version: SNAPSHOT_VERSION,
        created_at: Utc::now(),
        identity: identity.clone(),
        memory_nodes,
        hyperedges,
        wake_state: wake.state(),
        fatigue: wake.fatigue(),
        opponent_pairs: opponent.pairs().to_vec(),
        cycle_counter,
        unknown_fields: serde_json::Map::new(),
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
