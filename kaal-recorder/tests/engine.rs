use chrono::{TimeZone, Utc};
use kaal::notify::CollectingNotifier;
use kaal::prelude::*;
use kaal::random::ScriptedRandom;
use kaal::time::FixedClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::{sleep, timeout, Instant};

fn clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 14, 7, 42, 9).unwrap())
}

fn engine_with(emit_probability: f64) -> (KaalEngine, CollectingNotifier) {
    let config = RecorderConfig {
        emit_probability,
        ..RecorderConfig::default()
    };
    let notifier = CollectingNotifier::new();
    let engine = KaalEngine::with_parts(
        config,
        Box::new(ScriptedRandom::constant(0.5)),
        Arc::new(clock()),
        Arc::new(notifier.clone()),
    )
    .unwrap();
    (engine, notifier)
}

#[tokio::test(start_paused = true)]
async fn engine_refuses_configs_that_fail_validation() {
    let mut config = RecorderConfig {
        emit_probability: 1.0,
        ..RecorderConfig::default()
    };
    config.messages.error.clear();
    let built = KaalEngine::with_parts(
        config,
        Box::new(ScriptedRandom::constant(0.0).with_indices([2])),
        Arc::new(clock()),
        Arc::new(CollectingNotifier::new()),
    );
    assert!(matches!(
        built,
        Err(KaalError::EmptyMessagePool(Severity::Error))
    ));

    let config = RecorderConfig {
        emit_probability: 5.0,
        ..RecorderConfig::default()
    };
    assert!(matches!(
        KaalEngine::new(config),
        Err(KaalError::InvalidConfig(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn elapsed_counts_one_per_second_while_recording() {
    let (engine, _) = engine_with(0.0);
    assert_eq!(engine.start().await, Transition::Started);

    sleep(Duration::from_millis(3_500)).await;
    let status = engine.status().await;
    assert_eq!(status.state, RecordingState::Recording);
    assert_eq!(status.elapsed_seconds, 3);
    assert_eq!(engine.log_snapshot().await.len(), 3);

    sleep(Duration::from_secs(9)).await;
    assert_eq!(engine.status().await.elapsed_seconds, 12);
}

#[tokio::test(start_paused = true)]
async fn stop_freezes_counter_and_cancels_ticker() {
    let (engine, notifier) = engine_with(0.0);
    engine.start().await;
    sleep(Duration::from_millis(2_500)).await;

    assert_eq!(
        engine.stop().await,
        Transition::Stopped { elapsed_seconds: 2 }
    );
    assert_eq!(engine.active_timers(), 0);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.status().await.elapsed_seconds, 2);
    assert_eq!(engine.stop().await, Transition::Unchanged);
    assert_eq!(
        notifier.titles(),
        ["Recording Started", "Recording Stopped"]
    );
    assert_eq!(
        notifier.toasts()[1].description,
        "Session recorded for 00:00:02."
    );
}

#[tokio::test(start_paused = true)]
async fn second_start_resets_without_a_second_ticker() {
    let (engine, _) = engine_with(0.0);
    engine.start().await;
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(engine.start().await, Transition::Restarted);
    assert_eq!(engine.status().await.elapsed_seconds, 0);
    assert_eq!(engine.active_timers(), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(engine.status().await.elapsed_seconds, 2);
}

#[tokio::test(start_paused = true)]
async fn start_after_stop_counts_from_zero() {
    let (engine, _) = engine_with(0.0);
    engine.start().await;
    sleep(Duration::from_millis(4_200)).await;
    engine.stop().await;
    engine.toggle().await;
    assert_eq!(engine.status().await.elapsed_seconds, 0);
    sleep(Duration::from_millis(1_100)).await;
    assert_eq!(engine.status().await.elapsed_seconds, 1);
}

#[tokio::test(start_paused = true)]
async fn forced_emission_appends_one_entry_per_tick() {
    let (engine, _) = engine_with(1.0);
    let mut events = engine.subscribe_recorder_events();
    engine.start().await;
    sleep(Duration::from_millis(1_500)).await;

    let log = engine.log_snapshot().await;
    assert_eq!(log.len(), 4);
    let entry = log.last().unwrap();
    assert_eq!(entry.timestamp(), "07:42:09");
    assert!(RecorderConfig::default()
        .messages
        .pool(entry.severity())
        .iter()
        .any(|m| m == entry.message()));

    assert!(matches!(events.try_recv(), Ok(RecorderEvent::Started { restarted: false })));
    assert!(matches!(events.try_recv(), Ok(RecorderEvent::Tick { elapsed_seconds: 1 })));
    match events.try_recv() {
        Ok(RecorderEvent::EntryAppended(appended)) => assert_eq!(&appended, entry),
        other => panic!("expected an appended entry, got {:?}", other),
    }
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn export_reports_the_snapshot_taken_at_request_time() {
    let (engine, notifier) = engine_with(0.0);
    let began = Instant::now();
    let exporter = engine.clone();
    let export = tokio::spawn(async move { exporter.export_log().await });

    sleep(Duration::from_millis(1_000)).await;
    assert!(!engine.can_export().await);
    assert_eq!(engine.clear_log().await, 3);

    let report = export.await.unwrap();
    assert!(began.elapsed() >= Duration::from_millis(2_000));
    assert_eq!(report.entries.len(), 3);
    assert_eq!(report.file_name, "mission_report.log");
    assert!(engine.log_snapshot().await.is_empty());
    assert!(!engine.can_export().await);
    assert_eq!(notifier.titles(), ["Logs Cleared", "Log Exported"]);
    assert_eq!(
        notifier.toasts()[1].description,
        "mission_report.log has been generated."
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_export_frees_the_export_slot() {
    let (engine, notifier) = engine_with(0.0);
    let abandoned = timeout(Duration::from_millis(100), engine.export_log()).await;
    assert!(abandoned.is_err());

    assert!(engine.can_export().await);
    assert!(!engine.status().await.exporting);
    assert_eq!(
        engine.simulation_phase(SimulationKind::Export).await,
        SimulationPhase::Idle
    );

    sleep(Duration::from_secs(5)).await;
    assert!(notifier.titles().is_empty());
    let report = engine.export_log().await;
    assert_eq!(report.entries.len(), 3);
    assert!(engine.can_export().await);
}

#[tokio::test(start_paused = true)]
async fn replay_loads_after_its_delay() {
    let (engine, _) = engine_with(0.0);
    let mut simulations = engine.subscribe_simulation_events();
    engine.replay_mission().await.unwrap();
    assert!(matches!(
        engine.replay_mission().await,
        Err(KaalError::SimulationInProgress(SimulationKind::Replay))
    ));

    sleep(Duration::from_millis(2_400)).await;
    assert_eq!(
        engine.simulation_phase(SimulationKind::Replay).await,
        SimulationPhase::Loading
    );
    sleep(Duration::from_millis(200)).await;
    assert_eq!(
        engine.simulation_phase(SimulationKind::Replay).await,
        SimulationPhase::Ready
    );

    let phases: Vec<_> = std::iter::from_fn(|| simulations.try_recv().ok())
        .map(|event| event.phase)
        .collect();
    assert_eq!(phases, [SimulationPhase::Loading, SimulationPhase::Ready]);
}

#[tokio::test(start_paused = true)]
async fn deploy_requires_placed_assets() {
    let (engine, notifier) = engine_with(0.0);
    assert!(matches!(engine.deploy().await, Err(KaalError::NothingToDeploy)));
    assert_eq!(notifier.toasts()[0].variant, ToastVariant::Destructive);

    engine.place_asset(AssetKind::Tanks, 10.2, 20.7).await;
    engine.place_asset(AssetKind::Drones, 0.0, 0.0).await;
    engine.deploy().await.unwrap();
    sleep(Duration::from_millis(1_000)).await;
    engine.place_asset(AssetKind::Soldiers, 4.0, 4.0).await;
    sleep(Duration::from_millis(1_600)).await;

    let last = notifier.toasts().pop().unwrap();
    assert_eq!(last.title, "Deployment Successful");
    assert_eq!(last.description, "Deployed 2 assets to scene.");
    let placed: u32 = engine
        .deployment_counts()
        .await
        .into_iter()
        .map(|(_, count)| count)
        .sum();
    assert_eq!(placed, 3);
    assert_eq!(
        notifier.toasts()[1].description,
        "Placed tanks at coordinates X:10, Y:21"
    );
}

#[tokio::test(start_paused = true)]
async fn timeline_selection_goes_through_engine() {
    let (engine, _) = engine_with(0.0);
    let phase = engine.select_phase("phase1").await.unwrap();
    assert_eq!(phase.status, PhaseStatus::Current);
    assert!(matches!(
        engine.select_phase("phase7").await,
        Err(KaalError::UnknownPhase(id)) if id == "phase7"
    ));
    let current: Vec<_> = engine
        .timeline_phases()
        .await
        .into_iter()
        .filter(|p| p.status == PhaseStatus::Current)
        .map(|p| p.id)
        .collect();
    assert_eq!(current, ["phase1", "phase2"]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_leaves_no_armed_timers() {
    let (engine, _) = engine_with(0.0);
    let mut system = engine.subscribe_system_events();
    engine.start().await;
    engine.replay_mission().await.unwrap();
    engine.load_interface(Interface::Tablet).await.unwrap();
    engine.place_asset(AssetKind::Tanks, 1.0, 1.0).await;
    engine.deploy().await.unwrap();
    assert_eq!(engine.active_timers(), 4);

    assert_eq!(engine.shutdown().await, 4);
    assert_eq!(engine.active_timers(), 0);
    assert_eq!(engine.status().await.state, RecordingState::Idle);
    for kind in [
        SimulationKind::Replay,
        SimulationKind::Deployment,
        SimulationKind::InterfaceLoad,
    ] {
        assert_eq!(engine.simulation_phase(kind).await, SimulationPhase::Idle);
    }

    let mut armed = 0;
    let mut cancelled = 0;
    let mut shutdown_seen = false;
    while let Ok(event) = system.try_recv() {
        match event {
            SystemEvent::TimerArmed { .. } => armed += 1,
            SystemEvent::TimerCancelled { .. } => cancelled += 1,
            SystemEvent::EngineShutdown { cancelled_timers } => {
                assert_eq!(cancelled_timers, 4);
                shutdown_seen = true;
            }
            SystemEvent::EngineStarted { .. } => {}
        }
    }
    assert_eq!((armed, cancelled), (4, 4));
    assert!(shutdown_seen);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.status().await.elapsed_seconds, 0);
}

#[tokio::test(start_paused = true)]
async fn panels_stay_usable_after_shutdown() {
    let (engine, notifier) = engine_with(0.0);
    engine.place_asset(AssetKind::Tanks, 3.0, 3.0).await;
    engine.deploy().await.unwrap();
    engine.shutdown().await;

    sleep(Duration::from_secs(10)).await;
    assert!(!notifier.titles().iter().any(|t| t == "Deployment Successful"));

    engine.deploy().await.unwrap();
    engine.replay_mission().await.unwrap();
    sleep(Duration::from_millis(2_600)).await;
    assert_eq!(
        engine.simulation_phase(SimulationKind::Deployment).await,
        SimulationPhase::Ready
    );
    assert_eq!(notifier.toasts().pop().unwrap().description, "Deployed 1 assets to scene.");
}

#[tokio::test(start_paused = true)]
async fn run_until_shuts_down_when_the_signal_fires() {
    let (engine, _) = engine_with(0.0);
    let mut system = engine.subscribe_system_events();
    engine.start().await;

    let runner = engine.clone();
    let handle = tokio::spawn(async move {
        runner.run_until(sleep(Duration::from_millis(3_500))).await;
    });
    handle.await.unwrap();

    let status = engine.status().await;
    assert_eq!(status.state, RecordingState::Idle);
    assert_eq!(status.elapsed_seconds, 3);
    assert_eq!(engine.active_timers(), 0);

    let events: Vec<_> = std::iter::from_fn(|| system.try_recv().ok()).collect();
    assert!(matches!(events.first(), Some(SystemEvent::TimerArmed { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, SystemEvent::EngineStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(SystemEvent::EngineShutdown { cancelled_timers: 1 })
    ));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_engine_aborts_the_ticker() {
    let (engine, _) = engine_with(0.0);
    let mut events = engine.subscribe_recorder_events();
    engine.start().await;
    drop(engine);

    sleep(Duration::from_secs(3)).await;
    assert!(matches!(events.recv().await, Ok(RecorderEvent::Started { .. })));
    assert!(events.recv().await.is_err());
}
