//! The core engine that owns every panel and drives their timers.

use crate::common::{Interface, SimulationKind, TimerId};
use crate::components::deployment::{AssetKind, DeploymentPanel};
use crate::components::sequence::{SimulationPhase, TimedSimulation};
use crate::components::timeline::{MissionPhase, MissionTimeline};
use crate::components::timers::TimerRegistry;
use crate::config::RecorderConfig;
use crate::error::{KaalError, Result};
use crate::events::{RecorderEvent, SimulationEvent, SystemEvent};
use crate::log::LogEntry;
use crate::notify::{Notifier, Toast, TracingNotifier};
use crate::random::{RandomSource, StdRandom};
use crate::recorder::{ExportReport, RecorderStatus, SessionRecorder, Transition};
use crate::time::{SystemWallClock, TickEvent, Ticker, WallClock};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// The main KAAL engine.
///
/// Holds the session recorder, the mission timeline and the deployment
/// panel, and arms every timer they need. The engine is cheap to clone; all
/// clones share the same state. Timers are aborted on [`shutdown`] or when
/// the last clone is dropped.
///
/// [`shutdown`]: KaalEngine::shutdown
#[derive(Clone)]
pub struct KaalEngine {
    config: Arc<RecorderConfig>,
    recorder: Arc<RwLock<SessionRecorder>>,
    timeline: Arc<RwLock<MissionTimeline>>,
    deployment: Arc<RwLock<DeploymentPanel>>,
    interface_load: Arc<RwLock<TimedSimulation>>,
    notifier: Arc<dyn Notifier>,
    timers: Arc<Mutex<TimerRegistry>>,
    ticker_id: Arc<Mutex<Option<TimerId>>>,
    tick_sender: broadcast::Sender<TickEvent>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    recorder_event_sender: broadcast::Sender<RecorderEvent>,
    simulation_event_sender: broadcast::Sender<SimulationEvent>,
}

// Core implementation block for internal logic.
impl KaalEngine {
    /// Creates an engine on the system clock, with an RNG seeded from the
    /// configuration and toasts written to the tracing subscriber.
    ///
    /// Fails when the configuration does not validate.
    pub fn new(config: RecorderConfig) -> Result<Self> {
        let rng = Box::new(StdRandom::from_seed_option(config.seed));
        Self::with_parts(config, rng, Arc::new(SystemWallClock), Arc::new(TracingNotifier))
    }

    /// Creates an engine with explicit random, clock and notifier strategies.
    pub fn with_parts(
        config: RecorderConfig,
        rng: Box<dyn RandomSource>,
        clock: Arc<dyn WallClock>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let recorder = SessionRecorder::new(&config, rng, clock)?;
        let capacity = config.channel_capacity;
        let (tick_sender, _) = broadcast::channel(capacity);
        let (system_event_sender, _) = broadcast::channel(capacity);
        let (recorder_event_sender, _) = broadcast::channel(capacity);
        let (simulation_event_sender, _) = broadcast::channel(capacity);

        let timeline = MissionTimeline::new(config.delays.for_kind(SimulationKind::Replay));
        let deployment = DeploymentPanel::new(config.delays.for_kind(SimulationKind::Deployment));
        let interface_load = TimedSimulation::new(
            SimulationKind::InterfaceLoad,
            config.delays.for_kind(SimulationKind::InterfaceLoad),
        );

        Ok(Self {
            config: Arc::new(config),
            recorder: Arc::new(RwLock::new(recorder)),
            timeline: Arc::new(RwLock::new(timeline)),
            deployment: Arc::new(RwLock::new(deployment)),
            interface_load: Arc::new(RwLock::new(interface_load)),
            notifier,
            timers: Arc::new(Mutex::new(TimerRegistry::new())),
            ticker_id: Arc::new(Mutex::new(None)),
            tick_sender,
            system_event_sender,
            recorder_event_sender,
            simulation_event_sender,
        })
    }

    fn lock_timers(&self) -> MutexGuard<'_, TimerRegistry> {
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_ticker_id(&self) -> MutexGuard<'_, Option<TimerId>> {
        self.ticker_id.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawns `task` and registers it so teardown can abort it.
    ///
    /// The task must not hold a clone of the engine, or the registry could
    /// never be dropped.
    fn arm_timer<F>(&self, task: F) -> TimerId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.lock_timers().arm(tokio::spawn(task));
        self.system_event_sender
            .send(SystemEvent::TimerArmed { id })
            .ok();
        id
    }

    fn cancel_timer(&self, id: TimerId) -> bool {
        let cancelled = self.lock_timers().cancel(id);
        if cancelled {
            self.system_event_sender
                .send(SystemEvent::TimerCancelled { id })
                .ok();
        }
        cancelled
    }

    /// Arms the recording ticker unless one is already running.
    fn arm_ticker(&self) {
        let mut slot = self.lock_ticker_id();
        if let Some(id) = *slot {
            if self.lock_timers().is_armed(id) {
                debug!("Ticker {:?} already armed.", id);
                return;
            }
        }

        let recorder = self.recorder.clone();
        let events = self.recorder_event_sender.clone();
        let ticks = self.tick_sender.clone();
        let ticker = Ticker::new(self.config.resolution.period());
        let id = self.arm_timer(ticker.run(move |tick| {
            let recorder = recorder.clone();
            let events = events.clone();
            let ticks = ticks.clone();
            async move {
                ticks.send(tick).ok();
                let Some(outcome) = recorder.write().await.on_tick() else {
                    return false;
                };
                events
                    .send(RecorderEvent::Tick {
                        elapsed_seconds: outcome.elapsed_seconds,
                    })
                    .ok();
                if let Some(entry) = outcome.appended {
                    events.send(RecorderEvent::EntryAppended(entry)).ok();
                }
                true
            }
        }));
        *slot = Some(id);
    }

    fn cancel_ticker(&self) {
        let taken = self.lock_ticker_id().take();
        if let Some(id) = taken {
            self.cancel_timer(id);
        }
    }

    /// Runs a recorder transition and arms or cancels the ticker to match,
    /// all under the recorder's write lock.
    async fn transition(&self, apply: impl FnOnce(&mut SessionRecorder) -> Transition) -> Transition {
        let mut recorder = self.recorder.write().await;
        let transition = apply(&mut *recorder);
        match transition {
            Transition::Started => self.arm_ticker(),
            Transition::Stopped { .. } => self.cancel_ticker(),
            Transition::Restarted | Transition::Unchanged => {}
        }
        drop(recorder);
        self.publish_transition(transition);
        transition
    }

    fn publish_transition(&self, transition: Transition) {
        let event = match transition {
            Transition::Started => RecorderEvent::Started { restarted: false },
            Transition::Restarted => RecorderEvent::Started { restarted: true },
            Transition::Stopped { elapsed_seconds } => RecorderEvent::Stopped { elapsed_seconds },
            Transition::Unchanged => {
                debug!("Stop requested while idle; nothing to do.");
                return;
            }
        };
        info!("Recorder => {:?}", event);
        self.recorder_event_sender.send(event).ok();
        if let Some(toast) = transition.toast() {
            self.notifier.notify(toast);
        }
    }

    fn publish_simulation(&self, kind: SimulationKind, phase: SimulationPhase) {
        self.simulation_event_sender
            .send(SimulationEvent { kind, phase })
            .ok();
    }
}

// Public API implementation block.
impl KaalEngine {
    /// Announces startup, waits for Ctrl+C, then shuts down.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.announce_start();
        info!("KaalEngine running. Press Ctrl+C to shut down.");
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received. Cancelling all timers...");
        self.shutdown().await;
        Ok(())
    }

    /// Like [`run`](Self::run), but shuts down when `signal` resolves.
    pub async fn run_until(&self, signal: impl Future<Output = ()>) {
        self.announce_start();
        signal.await;
        self.shutdown().await;
    }

    fn announce_start(&self) {
        info!(
            "KaalEngine starting with tick period {:?}.",
            self.config.resolution.period()
        );
        self.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();
    }

    /// Stops recording, aborts every armed timer and resets every timed
    /// simulation, so nothing is left loading once its timer is gone.
    ///
    /// Returns the number of timers cancelled, the recording ticker included.
    pub async fn shutdown(&self) -> usize {
        let mut recorder = self.recorder.write().await;
        let transition = recorder.stop();
        let cancelled = {
            self.lock_ticker_id().take();
            self.lock_timers().cancel_all()
        };
        drop(recorder);
        self.publish_transition(transition);
        for id in &cancelled {
            self.system_event_sender
                .send(SystemEvent::TimerCancelled { id: *id })
                .ok();
        }
        self.timeline.write().await.replay_mut().reset();
        self.deployment.write().await.reset();
        self.interface_load.write().await.reset();
        self.system_event_sender
            .send(SystemEvent::EngineShutdown {
                cancelled_timers: cancelled.len(),
            })
            .ok();
        info!("KaalEngine has shut down ({} timers cancelled).", cancelled.len());
        cancelled.len()
    }

    /// Idle -> Recording; resets the elapsed counter.
    pub async fn start(&self) -> Transition {
        self.transition(SessionRecorder::start).await
    }

    /// Recording -> Idle; the elapsed counter freezes. A no-op while idle.
    pub async fn stop(&self) -> Transition {
        self.transition(SessionRecorder::stop).await
    }

    pub async fn toggle(&self) -> Transition {
        self.transition(SessionRecorder::toggle).await
    }

    /// Empties the session log. Returns how many entries were dropped.
    pub async fn clear_log(&self) -> usize {
        let removed = self.recorder.write().await.clear_log();
        self.recorder_event_sender
            .send(RecorderEvent::Cleared { removed })
            .ok();
        self.notifier.notify(SessionRecorder::clear_toast());
        removed
    }

    /// Snapshots the log, waits out the export delay and reports success.
    ///
    /// Entries appended or cleared during the delay do not affect the report.
    /// Dropping the future mid-delay cancels the export and frees the slot.
    pub async fn export_log(&self) -> ExportReport {
        let (report, in_flight) = self.recorder.write().await.begin_export();
        let entries = report.entries.len();
        self.recorder_event_sender
            .send(RecorderEvent::ExportStarted { entries })
            .ok();
        self.publish_simulation(SimulationKind::Export, SimulationPhase::Loading);

        tokio::time::sleep(self.config.delays.for_kind(SimulationKind::Export)).await;

        drop(in_flight);
        self.recorder_event_sender
            .send(RecorderEvent::ExportCompleted {
                file_name: report.file_name.clone(),
                entries,
            })
            .ok();
        self.publish_simulation(SimulationKind::Export, SimulationPhase::Ready);
        self.notifier.notify(report.toast());
        report
    }

    /// Changes the per-tick emit probability at runtime.
    pub async fn set_emit_probability(&self, probability: f64) {
        self.recorder.write().await.set_emit_probability(probability);
    }

    pub async fn status(&self) -> RecorderStatus {
        self.recorder.read().await.status()
    }

    pub async fn can_export(&self) -> bool {
        self.recorder.read().await.can_export()
    }

    pub async fn log_snapshot(&self) -> Vec<LogEntry> {
        self.recorder.read().await.log().snapshot()
    }

    pub async fn timeline_phases(&self) -> Vec<MissionPhase> {
        self.timeline.read().await.phases().to_vec()
    }

    /// Makes a mission phase current.
    pub async fn select_phase(&self, id: &str) -> Result<MissionPhase> {
        let mut timeline = self.timeline.write().await;
        let phase = timeline.select(id)?.clone();
        debug!("Timeline phase {} is now current.", phase.id);
        Ok(phase)
    }

    /// Starts loading the mission replay. Refused while one is loading.
    pub async fn replay_mission(&self) -> Result<TimerId> {
        let mut timeline = self.timeline.write().await;
        timeline.replay_mut().begin()?;
        let delay = timeline.replay().delay();
        let shared = self.timeline.clone();
        let events = self.simulation_event_sender.clone();
        let id = self.arm_timer(async move {
            tokio::time::sleep(delay).await;
            if shared.write().await.replay_mut().complete() {
                info!("Mission replay loaded.");
                events
                    .send(SimulationEvent {
                        kind: SimulationKind::Replay,
                        phase: SimulationPhase::Ready,
                    })
                    .ok();
            }
        });
        drop(timeline);
        self.publish_simulation(SimulationKind::Replay, SimulationPhase::Loading);
        Ok(id)
    }

    /// Places one asset on the deployment grid.
    pub async fn place_asset(&self, kind: AssetKind, x: f64, y: f64) -> u32 {
        let mut deployment = self.deployment.write().await;
        let toast = deployment.place(kind, x, y);
        let count = deployment.count(kind);
        drop(deployment);
        self.notifier.notify(toast);
        count
    }

    pub async fn deployment_counts(&self) -> Vec<(AssetKind, u32)> {
        let deployment = self.deployment.read().await;
        AssetKind::ALL
            .into_iter()
            .map(|kind| (kind, deployment.count(kind)))
            .collect()
    }

    /// Deploys every placed asset after the deployment delay.
    ///
    /// Fails, with a destructive toast, when nothing has been placed.
    pub async fn deploy(&self) -> Result<TimerId> {
        let mut deployment = self.deployment.write().await;
        let total = match deployment.begin_deploy() {
            Ok(total) => total,
            Err(KaalError::NothingToDeploy) => {
                drop(deployment);
                warn!("Deployment refused: no assets placed.");
                self.notifier.notify(DeploymentPanel::refused_toast());
                return Err(KaalError::NothingToDeploy);
            }
            Err(other) => return Err(other),
        };
        let delay = deployment.simulation().delay();
        let shared = self.deployment.clone();
        let events = self.simulation_event_sender.clone();
        let notifier = self.notifier.clone();
        let id = self.arm_timer(async move {
            tokio::time::sleep(delay).await;
            let toast = shared.write().await.complete_deploy();
            if let Some(toast) = toast {
                events
                    .send(SimulationEvent {
                        kind: SimulationKind::Deployment,
                        phase: SimulationPhase::Ready,
                    })
                    .ok();
                notifier.notify(toast);
            }
        });
        drop(deployment);
        info!("Deploying {} assets.", total);
        self.publish_simulation(SimulationKind::Deployment, SimulationPhase::Loading);
        Ok(id)
    }

    /// Starts loading an operator interface. Refused while one is loading.
    pub async fn load_interface(&self, interface: Interface) -> Result<TimerId> {
        let mut loader = self.interface_load.write().await;
        loader.begin()?;
        let delay = loader.delay();
        let shared = self.interface_load.clone();
        let events = self.simulation_event_sender.clone();
        let notifier = self.notifier.clone();
        let id = self.arm_timer(async move {
            tokio::time::sleep(delay).await;
            if shared.write().await.complete() {
                events
                    .send(SimulationEvent {
                        kind: SimulationKind::InterfaceLoad,
                        phase: SimulationPhase::Ready,
                    })
                    .ok();
                notifier.notify(Toast::new(
                    "Interface Ready",
                    format!("The {} interface has loaded.", interface),
                ));
            }
        });
        drop(loader);
        self.publish_simulation(SimulationKind::InterfaceLoad, SimulationPhase::Loading);
        Ok(id)
    }

    pub async fn simulation_phase(&self, kind: SimulationKind) -> SimulationPhase {
        match kind {
            SimulationKind::Export => {
                if self.recorder.read().await.status().exporting {
                    SimulationPhase::Loading
                } else {
                    SimulationPhase::Idle
                }
            }
            SimulationKind::Replay => self.timeline.read().await.replay().phase(),
            SimulationKind::Deployment => self.deployment.read().await.simulation().phase(),
            SimulationKind::InterfaceLoad => self.interface_load.read().await.phase(),
        }
    }

    /// Timers that are armed and have not finished.
    pub fn active_timers(&self) -> usize {
        self.lock_timers().active()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Subscribes to the raw `TickEvent` stream of the recording ticker.
    pub fn subscribe_tick_events(&self) -> broadcast::Receiver<TickEvent> {
        self.tick_sender.subscribe()
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Subscribes to the `RecorderEvent` stream.
    pub fn subscribe_recorder_events(&self) -> broadcast::Receiver<RecorderEvent> {
        self.recorder_event_sender.subscribe()
    }

    /// Subscribes to the `SimulationEvent` stream.
    pub fn subscribe_simulation_events(&self) -> broadcast::Receiver<SimulationEvent> {
        self.simulation_event_sender.subscribe()
    }
}
