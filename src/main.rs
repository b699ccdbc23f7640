//! Contour Tracker CLI
//!
//! Tracks blobs of active nodes on a small sensor grid and reports how they
//! change.

use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use contour_tracking::{
    collector::{Collector, CollectorConfig, PeriodUpdate, ReadingStore, SamplingControl},
    config::Config,
    core::{render_grid, TrackingEngine},
    recording::{read_recording, Player, RecordingWriter},
    stats::create_shared_stats_with_persistence,
    VERSION,
};
use crossbeam_channel::RecvTimeoutError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "contour-tracker")]
#[command(version = VERSION)]
#[command(about = "Blob tracking for small sensor-node grids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a simulated node grid
    Run {
        /// Number of nodes (9 or 16); defaults to the configured grid
        #[arg(long)]
        nodes: Option<usize>,

        /// Write snapshots to a recording in the configured directory
        #[arg(long)]
        record: bool,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Play back a recording
    Replay {
        /// Recording file
        file: PathBuf,

        /// Start this many seconds into the recording
        #[arg(long, default_value = "0")]
        seek: u64,

        /// Pace frames by their recorded timestamps
        #[arg(long)]
        realtime: bool,
    },

    /// Summarize a recording
    Inspect {
        /// Recording file
        file: PathBuf,

        /// Dump every node and blob of each snapshot
        #[arg(long, short)]
        verbose: bool,
    },

    /// Show configuration
    Config,

    /// Set the activation threshold (1-1000)
    SetThreshold { value: i64 },

    /// Set the node sampling interval in ms (1-65535)
    SetInterval { value: i64 },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            nodes,
            record,
            ticks,
        } => cmd_run(nodes, record, ticks),
        Commands::Replay {
            file,
            seek,
            realtime,
        } => cmd_replay(&file, seek, realtime),
        Commands::Inspect { file, verbose } => cmd_inspect(&file, verbose),
        Commands::Config => cmd_config(),
        Commands::SetThreshold { value } => cmd_set_threshold(value),
        Commands::SetInterval { value } => cmd_set_interval(value),
    }
}

/// Track the simulated grid until Ctrl+C or `max_ticks`.
///
/// The config file is polled once a second, so `set-threshold` and
/// `set-interval` issued from another shell reach the engine and, through a
/// beacon, the nodes.
fn cmd_run(nodes: Option<usize>, record: bool, max_ticks: Option<u64>) -> Result<()> {
    println!("Contour Tracker v{VERSION}");
    println!();

    let mut config = Config::load().context("loading configuration")?;
    if let Some(nodes) = nodes {
        config.grid_nodes = nodes;
    }
    config.validate().context("invalid configuration")?;
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("  Grid: {} nodes", config.grid_nodes);
    println!("  Threshold: {}", config.threshold);
    println!("  Tick period: {}ms", config.tick_period.as_millis());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats = create_shared_stats_with_persistence(config.data_path.join("stats.json"));
    let mut engine = TrackingEngine::from_config(&config)?.with_stats(stats.clone());
    let mut store = ReadingStore::new();
    let mut control = SamplingControl::new(config.interval, config.threshold);

    let mut writer = if record {
        let path = config.recording_dir.join(format!(
            "session_{}.jsonl",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        let writer = RecordingWriter::create(&path)
            .with_context(|| format!("creating recording {}", path.display()))?;
        println!("Recording to {path:?} (session {})", writer.session_id());
        Some(writer)
    } else {
        None
    };

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut collector = Collector::new(CollectorConfig {
        nodes: config.grid_nodes,
        interval: config.interval,
        threshold: config.threshold,
        period: config.tick_period / 2,
    });
    collector.start()?;

    let receiver = collector.receiver().clone();
    let started = Instant::now();
    let mut last_tick = Instant::now();
    let mut last_config_check = Instant::now();
    let mut ticks = 0u64;

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(message) => {
                if let PeriodUpdate::Rebroadcast(beacon) =
                    control.period_update(message.version, message.interval, message.clock_ms)
                {
                    tracing::debug!(version = beacon.version, node = message.id, "node behind, rebroadcasting");
                    collector.broadcast(beacon);
                }
                if let Err(e) = store.ingest(&message) {
                    tracing::warn!("rejected message: {e}");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                eprintln!("Collector disconnected unexpectedly");
                break;
            }
        }

        if last_config_check.elapsed() >= Duration::from_secs(1) {
            last_config_check = Instant::now();
            let clock_ms = started.elapsed().as_millis() as i64;
            apply_config_changes(&mut engine, &mut control, &collector, clock_ms);
        }

        if last_tick.elapsed() < config.tick_period {
            continue;
        }
        last_tick = Instant::now();

        let first = engine.history().is_empty();
        let event = engine.tick(&store.batch());
        ticks += 1;

        if let Some(event) = event.filter(|e| !e.is_empty()) {
            println!("[{}] {event}", Local::now().format("%H:%M:%S"));
            if let Some(latest) = engine.latest() {
                print!("{}", render_grid(&latest));
            }
        }

        if let Some(writer) = writer.as_mut() {
            if first || event.is_some() {
                if let Some(latest) = engine.latest() {
                    writer.append(&latest)?;
                }
            }
        }

        if max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }
    }

    collector.stop();

    if let Some(mut writer) = writer {
        writer.flush()?;
        println!("Recorded {} snapshots", writer.written());
    }

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
    Ok(())
}

/// Pick up threshold and interval changes saved to the config file.
fn apply_config_changes(
    engine: &mut TrackingEngine,
    control: &mut SamplingControl,
    collector: &Collector,
    clock_ms: i64,
) {
    let Ok(saved) = Config::load() else {
        return;
    };

    if saved.threshold != engine.threshold() {
        let threshold = i64::from(saved.threshold);
        match engine
            .set_threshold(threshold)
            .and_then(|()| control.set_threshold(threshold, clock_ms))
        {
            Ok(beacon) => collector.broadcast(beacon),
            Err(e) => tracing::warn!("ignoring saved threshold: {e}"),
        }
    }

    if saved.interval != control.interval() {
        match control.set_interval(i64::from(saved.interval), clock_ms) {
            Ok(beacon) => collector.broadcast(beacon),
            Err(e) => tracing::warn!("ignoring saved interval: {e}"),
        }
    }
}

fn cmd_replay(file: &Path, seek: u64, realtime: bool) -> Result<()> {
    let recording =
        read_recording(file).with_context(|| format!("reading recording {}", file.display()))?;
    if let Some(reason) = &recording.truncated {
        eprintln!("Warning: recording is truncated ({reason})");
    }
    if recording.snapshots.is_empty() {
        bail!("nothing to play in {}", file.display());
    }

    let mut player = Player::new(recording.snapshots);
    println!("Number of snapshots: {}", player.len());
    println!("Duration: {:.1} seconds", player.duration_secs());
    println!();

    if seek > 0 {
        player.seek(seek);
    }

    loop {
        if realtime {
            if let Some(delay) = player.delay_to_next() {
                thread::sleep(delay);
            }
        }
        let Some(snapshot) = player.next_frame() else {
            break;
        };
        let grid = render_grid(snapshot);
        if let Some(caption) = player.caption() {
            println!("{caption}");
        }
        println!("{grid}");
    }
    Ok(())
}

fn cmd_inspect(file: &Path, verbose: bool) -> Result<()> {
    let recording =
        read_recording(file).with_context(|| format!("reading recording {}", file.display()))?;

    println!("Recording: {file:?}");
    println!("  Session: {}", recording.header.session_id);
    println!(
        "  Created: {}",
        recording.header.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Snapshots: {}", recording.snapshots.len());

    let player = Player::new(recording.snapshots.clone());
    println!("  Duration: {:.1} seconds", player.duration_secs());
    match &recording.truncated {
        Some(reason) => println!("  Truncated: {reason}"),
        None => println!("  Complete: yes"),
    }
    println!();

    for snapshot in &recording.snapshots {
        if verbose {
            print!("{}", snapshot.debug());
            continue;
        }
        let event = snapshot
            .event()
            .map_or_else(|| "No Event".to_string(), |e| e.to_string());
        println!(
            "{:>12}  blobs={} active={}  {event}",
            snapshot.latest_sample_timestamp(),
            snapshot.blob_count(),
            snapshot.active_count()
        );
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_set_threshold(value: i64) -> Result<()> {
    let mut config = Config::load().context("loading configuration")?;
    config.set_threshold(value)?;
    config.save().context("saving configuration")?;
    println!("Threshold set to {}", config.threshold);
    Ok(())
}

fn cmd_set_interval(value: i64) -> Result<()> {
    let mut config = Config::load().context("loading configuration")?;
    config.set_interval(value)?;
    config.save().context("saving configuration")?;
    println!("Sampling interval set to {}ms", config.interval);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
