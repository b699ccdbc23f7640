//! Demonstration of blob tracking on a simulated grid.
//!
//! This example shows how to:
//! 1. Start the simulated collector
//! 2. Feed node packets into a reading store
//! 3. Tick the tracking engine and print events
//! 4. Record the session and play it back
//!
//! Run with: cargo run --example track_demo

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contour_tracking::{
    collector::{Collector, CollectorConfig, ReadingStore},
    core::{render_grid, TrackingEngine},
    recording::{read_recording, Player, RecordingWriter},
};

fn main() {
    println!("Contour Tracking - Track Demo");
    println!("=============================");
    println!();

    let mut collector = Collector::new(CollectorConfig {
        nodes: 16,
        period: Duration::from_millis(100),
        ..CollectorConfig::default()
    });
    let mut store = ReadingStore::new();
    let mut engine = TrackingEngine::new(500, 10).expect("valid threshold");

    let path = std::env::temp_dir().join("contour_track_demo.jsonl");
    let mut writer = RecordingWriter::create(&path).expect("create recording");
    println!("Recording to {path:?}");
    println!("Tracking a 4x4 grid for 10 seconds...");
    println!();

    if let Err(e) = collector.start() {
        eprintln!("Error starting collector: {e}");
        return;
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let start = Instant::now();
    let mut last_tick = Instant::now();
    let receiver = collector.receiver().clone();

    while running.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(10) {
        match receiver.recv_timeout(Duration::from_millis(50)) {
            Ok(message) => {
                if let Err(e) = store.ingest(&message) {
                    eprintln!("  rejected packet: {e}");
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }

        if last_tick.elapsed() < Duration::from_millis(250) {
            continue;
        }
        last_tick = Instant::now();

        let first = engine.history().is_empty();
        let event = engine.tick(&store.batch());
        let Some(latest) = engine.latest() else {
            continue;
        };

        if first || event.is_some() {
            writer.append(&latest).expect("append snapshot");
        }
        if let Some(event) = event.filter(|e| !e.is_empty()) {
            println!("  [{:>5.1}s] {event}", start.elapsed().as_secs_f64());
            for line in render_grid(&latest).lines() {
                println!("           {line}");
            }
        }
    }

    println!();
    println!("Stopping capture...");
    collector.stop();
    writer.flush().expect("flush recording");
    println!("Recorded {} snapshots", writer.written());
    drop(writer);

    println!();
    println!("{}", engine.stats().summary());

    println!();
    println!("=== Playback ===");
    let recording = read_recording(&path).expect("read recording");
    let mut player = Player::new(recording.snapshots);
    println!("  Duration: {:.1}s", player.duration_secs());
    while player.next_frame().is_some() {
        if let Some(caption) = player.caption() {
            println!("  {caption}");
        }
    }
}
