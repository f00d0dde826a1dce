use anyhow::Result;
use kaal::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // 2. Load the configuration, optionally from a TOML file given as the first argument.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = RecorderConfig::load(config_path.as_deref())?;

    // 3. Create the engine.
    let engine = KaalEngine::new(config)?;

    // 4. Spawn concurrent tasks to listen to different event streams.
    spawn_event_listeners(&engine);

    // 5. Exercise the panels, then keep recording until Ctrl+C.
    drive_demo_session(&engine).await;
    engine.run().await?;

    let status = engine.status().await;
    info!(
        "Session closed after {}s with {} log entries.",
        status.elapsed_seconds, status.entry_count
    );
    Ok(())
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(engine: &KaalEngine) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let mut recorder_rx = engine.subscribe_recorder_events();
    tokio::spawn(async move {
        while let Ok(event) = recorder_rx.recv().await {
            match event {
                RecorderEvent::Tick { elapsed_seconds } if elapsed_seconds % 10 != 0 => {}
                RecorderEvent::EntryAppended(entry) => info!("[LOG] => {}", entry),
                other => info!("[RECORDER] => {:?}", other),
            }
        }
    });

    let mut simulation_rx = engine.subscribe_simulation_events();
    tokio::spawn(async move {
        while let Ok(event) = simulation_rx.recv().await {
            info!("[SIMULATION] => {} is {}", event.kind, event.phase);
        }
    });
}

/// Walks every panel once so each event stream has something to show.
async fn drive_demo_session(engine: &KaalEngine) {
    if let Err(e) = engine.load_interface(Interface::Desktop).await {
        warn!("Interface load refused: {}", e);
    }

    engine.start().await;

    if let Err(e) = engine.deploy().await {
        warn!("Expected refusal before placing assets: {}", e);
    }
    engine.place_asset(AssetKind::Soldiers, 120.4, 48.9).await;
    engine.place_asset(AssetKind::Drones, 300.0, 12.5).await;
    if let Err(e) = engine.deploy().await {
        warn!("Deployment refused: {}", e);
    }

    if let Err(e) = engine.select_phase("phase3").await {
        warn!("{}", e);
    }
    if let Err(e) = engine.replay_mission().await {
        warn!("Replay refused: {}", e);
    }

    let report = engine.export_log().await;
    info!(
        "Exported {} entries to {}:\n{}",
        report.entries.len(),
        report.file_name,
        report.render()
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
}
