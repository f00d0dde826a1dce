//! The session recorder: the Idle/Recording state machine, its elapsed-time
//! counter and the random event emitter that feeds the session log.
//!
//! Everything here is synchronous and deterministic given its injected
//! [`RandomSource`] and [`WallClock`]. The async [`KaalEngine`] owns the
//! ticker that calls [`SessionRecorder::on_tick`] once per period.
//!
//! [`KaalEngine`]: crate::engine::KaalEngine

use crate::config::RecorderConfig;
use crate::error::Result;
use crate::log::{LogEntry, MessagePools, SessionLog, Severity};
use crate::notify::Toast;
use crate::random::RandomSource;
use crate::time::{format_clock_time, format_duration, WallClock};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// File name reported for log exports.
pub const EXPORT_FILE_NAME: &str = "mission_report.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingState::Idle => f.write_str("Standby"),
            RecordingState::Recording => f.write_str("Active"),
        }
    }
}

/// What a `start`, `stop` or `toggle` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Recording. The caller must arm a ticker.
    Started,
    /// `start` while already recording: the counter went back to zero and the
    /// existing ticker keeps running.
    Restarted,
    /// Recording -> Idle. The caller must cancel its ticker.
    Stopped { elapsed_seconds: u64 },
    /// `stop` while idle.
    Unchanged,
}

impl Transition {
    /// The toast the command center shows for this transition, if any.
    pub fn toast(&self) -> Option<Toast> {
        match self {
            Transition::Started | Transition::Restarted => Some(Toast::new(
                "Recording Started",
                "Session recording has been initiated.",
            )),
            Transition::Stopped { elapsed_seconds } => Some(Toast::new(
                "Recording Stopped",
                format!("Session recorded for {}.", format_duration(*elapsed_seconds)),
            )),
            Transition::Unchanged => None,
        }
    }
}

/// The effects of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub elapsed_seconds: u64,
    /// The entry the emitter appended on this tick, if the roll succeeded.
    pub appended: Option<LogEntry>,
}

/// A point-in-time view of the recorder, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderStatus {
    pub state: RecordingState,
    pub elapsed_seconds: u64,
    pub entry_count: usize,
    pub exporting: bool,
}

/// The in-memory result of exporting the session log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub file_name: String,
    pub exported_at: DateTime<Utc>,
    pub entries: Vec<LogEntry>,
}

impl ExportReport {
    /// The report body, one log line per entry.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }

    pub fn toast(&self) -> Toast {
        Toast::new("Log Exported", format!("{} has been generated.", self.file_name))
    }
}

/// Marks one export as in flight for as long as it is alive.
///
/// Dropping the guard finishes the export, including when the exporting
/// future is cancelled before its delay elapses.
#[must_use = "the export stops counting as in flight once the guard is dropped"]
#[derive(Debug)]
pub struct ExportGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct SessionRecorder {
    state: RecordingState,
    elapsed_seconds: u64,
    log: SessionLog,
    emit_probability: f64,
    messages: MessagePools,
    timezone: Tz,
    exports_in_flight: Arc<AtomicUsize>,
    rng: Box<dyn RandomSource>,
    clock: Arc<dyn WallClock>,
}

impl SessionRecorder {
    /// Builds an idle recorder with the configured seed log.
    ///
    /// Fails when `config` does not pass [`RecorderConfig::validate`], so a
    /// running recorder always has a probability in `[0, 1]` and a non-empty
    /// pool for every severity.
    pub fn new(
        config: &RecorderConfig,
        rng: Box<dyn RandomSource>,
        clock: Arc<dyn WallClock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: RecordingState::Idle,
            elapsed_seconds: 0,
            log: SessionLog::seeded(config.initial_entries()),
            emit_probability: config.emit_probability,
            messages: config.messages.clone(),
            timezone: config.timezone,
            exports_in_flight: Arc::new(AtomicUsize::new(0)),
            rng,
            clock,
        })
    }

    fn exports_in_flight(&self) -> usize {
        self.exports_in_flight.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn emit_probability(&self) -> f64 {
        self.emit_probability
    }

    /// Changes the per-tick emit probability, clamped to `[0, 1]`.
    pub fn set_emit_probability(&mut self, probability: f64) {
        self.emit_probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
    }

    pub fn status(&self) -> RecorderStatus {
        RecorderStatus {
            state: self.state,
            elapsed_seconds: self.elapsed_seconds,
            entry_count: self.log.len(),
            exporting: self.exports_in_flight() > 0,
        }
    }

    /// Starts recording and resets the counter to zero.
    pub fn start(&mut self) -> Transition {
        self.elapsed_seconds = 0;
        match self.state {
            RecordingState::Idle => {
                self.state = RecordingState::Recording;
                debug!("Recorder: Idle -> Recording");
                Transition::Started
            }
            RecordingState::Recording => {
                debug!("Recorder: restart while recording, counter reset");
                Transition::Restarted
            }
        }
    }

    /// Stops recording. The counter keeps its value. A no-op while idle.
    pub fn stop(&mut self) -> Transition {
        match self.state {
            RecordingState::Recording => {
                self.state = RecordingState::Idle;
                debug!(
                    "Recorder: Recording -> Idle after {}s",
                    self.elapsed_seconds
                );
                Transition::Stopped {
                    elapsed_seconds: self.elapsed_seconds,
                }
            }
            RecordingState::Idle => Transition::Unchanged,
        }
    }

    /// Starts when idle, stops when recording.
    pub fn toggle(&mut self) -> Transition {
        match self.state {
            RecordingState::Idle => self.start(),
            RecordingState::Recording => self.stop(),
        }
    }

    /// Advances the counter by one and rolls for a random log entry.
    ///
    /// Returns `None` when idle: a tick that arrives after `stop` changes
    /// nothing.
    pub fn on_tick(&mut self) -> Option<TickOutcome> {
        if !self.is_recording() {
            return None;
        }
        self.elapsed_seconds += 1;
        trace!("Recorder tick, elapsed {}s", self.elapsed_seconds);

        let appended = if self.rng.next_unit() < self.emit_probability {
            Some(self.emit_random_entry())
        } else {
            None
        };
        Some(TickOutcome {
            elapsed_seconds: self.elapsed_seconds,
            appended,
        })
    }

    fn emit_random_entry(&mut self) -> LogEntry {
        let severity = Severity::ALL[self.rng.pick_index(Severity::ALL.len())];
        let pool = self.messages.pool(severity);
        let message = pool[self.rng.pick_index(pool.len())].clone();
        let now = self.clock.now();
        let timestamp = format_clock_time(now, self.timezone);
        let entry = self.log.append(timestamp, now, message, severity).clone();
        debug!("Recorder emitted entry #{}: {}", entry.id(), entry);
        entry
    }

    /// Empties the log. Returns how many entries were dropped.
    pub fn clear_log(&mut self) -> usize {
        self.log.clear()
    }

    pub fn clear_toast() -> Toast {
        Toast::new("Logs Cleared", "All log entries have been cleared.")
    }

    /// Whether an export would have anything to write and none is running.
    pub fn can_export(&self) -> bool {
        self.exports_in_flight() == 0 && !self.log.is_empty()
    }

    pub fn can_clear(&self) -> bool {
        !self.log.is_empty()
    }

    /// Marks an export as running and returns the snapshot it will write.
    ///
    /// The export stays in flight until the returned guard is dropped.
    pub fn begin_export(&mut self) -> (ExportReport, ExportGuard) {
        self.exports_in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = ExportGuard {
            in_flight: self.exports_in_flight.clone(),
        };
        let report = ExportReport {
            file_name: EXPORT_FILE_NAME.to_string(),
            exported_at: self.clock.now(),
            entries: self.log.snapshot(),
        };
        (report, guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KaalError;
    use crate::random::ScriptedRandom;
    use crate::time::FixedClock;
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 14, 7, 42, 9).unwrap())
    }

    fn recorder_with(rng: ScriptedRandom, seeded: bool) -> SessionRecorder {
        let config = RecorderConfig {
            seed_initial_log: seeded,
            ..RecorderConfig::default()
        };
        SessionRecorder::new(&config, Box::new(rng), Arc::new(clock())).unwrap()
    }

    fn quiet_recorder() -> SessionRecorder {
        let mut recorder = recorder_with(ScriptedRandom::constant(0.0), true);
        recorder.set_emit_probability(0.0);
        recorder
    }

    #[test]
    fn three_quiet_ticks_count_three_seconds() {
        let mut recorder = quiet_recorder();
        let before = recorder.log().snapshot();
        assert_eq!(recorder.start(), Transition::Started);
        for _ in 0..3 {
            recorder.on_tick();
        }
        assert_eq!(recorder.elapsed_seconds(), 3);
        assert_eq!(recorder.log().entries(), before.as_slice());
    }

    #[test]
    fn elapsed_grows_by_tick_count() {
        let mut recorder = quiet_recorder();
        recorder.start();
        for n in 1..=120u64 {
            let outcome = recorder.on_tick().unwrap();
            assert_eq!(outcome.elapsed_seconds, n);
        }
    }

    #[test]
    fn restart_after_stop_resets_counter() {
        let mut recorder = quiet_recorder();
        recorder.start();
        recorder.on_tick();
        recorder.on_tick();
        assert_eq!(recorder.stop(), Transition::Stopped { elapsed_seconds: 2 });
        assert_eq!(recorder.elapsed_seconds(), 2);
        assert_eq!(recorder.start(), Transition::Started);
        assert_eq!(recorder.elapsed_seconds(), 0);
    }

    #[test]
    fn start_while_recording_resets_without_new_ticker() {
        let mut recorder = quiet_recorder();
        recorder.start();
        recorder.on_tick();
        assert_eq!(recorder.start(), Transition::Restarted);
        assert_eq!(recorder.elapsed_seconds(), 0);
        assert!(recorder.is_recording());
    }

    #[test]
    fn stop_is_tolerated_while_idle() {
        let mut recorder = quiet_recorder();
        assert_eq!(recorder.stop(), Transition::Unchanged);
        assert_eq!(recorder.state(), RecordingState::Idle);
        assert!(Transition::Unchanged.toast().is_none());
    }

    #[test]
    fn ticks_while_idle_change_nothing() {
        let mut recorder = recorder_with(ScriptedRandom::constant(0.0), false);
        recorder.set_emit_probability(1.0);
        assert!(recorder.on_tick().is_none());
        recorder.start();
        recorder.on_tick();
        recorder.stop();
        assert!(recorder.on_tick().is_none());
        assert_eq!(recorder.elapsed_seconds(), 1);
        assert_eq!(recorder.log().len(), 1);
    }

    #[test]
    fn forced_emission_appends_exactly_one_pool_message() {
        for severity_index in 0..3 {
            let rng = ScriptedRandom::constant(0.99).with_indices([severity_index, 3]);
            let mut recorder = recorder_with(rng, true);
            recorder.set_emit_probability(1.0);
            let before = recorder.log().len();
            recorder.start();
            let outcome = recorder.on_tick().unwrap();

            assert_eq!(recorder.log().len(), before + 1);
            let entry = outcome.appended.unwrap();
            let severity = entry.severity();
            assert_eq!(severity, Severity::ALL[severity_index]);
            let config = RecorderConfig::default();
            assert!(config
                .messages
                .pool(severity)
                .iter()
                .any(|m| m == entry.message()));
            assert_eq!(entry.timestamp(), "07:42:09");
            assert_eq!(recorder.log().last(), Some(&entry));
        }
    }

    #[test]
    fn emission_uses_probability_threshold() {
        let rng = ScriptedRandom::new().with_units([0.049, 0.05, 0.951]);
        let mut recorder = recorder_with(rng, false);
        recorder.start();
        assert!(recorder.on_tick().unwrap().appended.is_some());
        assert!(recorder.on_tick().unwrap().appended.is_none());
        assert!(recorder.on_tick().unwrap().appended.is_none());
    }

    #[test]
    fn existing_entries_are_never_rewritten() {
        let mut recorder = recorder_with(ScriptedRandom::constant(0.0), true);
        recorder.set_emit_probability(1.0);
        recorder.start();
        let mut seen: Vec<LogEntry> = recorder.log().snapshot();
        for _ in 0..10 {
            recorder.on_tick();
            let now = recorder.log().entries();
            assert_eq!(&now[..seen.len()], seen.as_slice());
            seen = now.to_vec();
        }
        let ids: Vec<_> = seen.iter().map(|e| e.id()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn clear_empties_any_log() {
        let mut recorder = quiet_recorder();
        assert!(recorder.can_clear());
        assert_eq!(recorder.clear_log(), 3);
        assert_eq!(recorder.log().len(), 0);
        assert_eq!(recorder.clear_log(), 0);
        assert!(!recorder.can_clear());
        assert!(!recorder.can_export());
    }

    #[test]
    fn export_snapshot_is_detached_from_log() {
        let mut recorder = quiet_recorder();
        let (report, guard) = recorder.begin_export();
        assert!(recorder.status().exporting);
        assert!(!recorder.can_export());
        recorder.clear_log();
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.file_name, EXPORT_FILE_NAME);
        assert!(report.render().starts_with("[10:15:22] INFO    Session initialized\n"));
        drop(guard);
        assert!(!recorder.status().exporting);
    }

    #[test]
    fn overlapping_exports_release_independently() {
        let mut recorder = quiet_recorder();
        let (_, first) = recorder.begin_export();
        let (_, second) = recorder.begin_export();
        drop(first);
        assert!(recorder.status().exporting);
        drop(second);
        assert!(recorder.can_export());
    }

    #[test]
    fn unvalidated_config_is_rejected() {
        let mut config = RecorderConfig::default();
        config.messages.error.clear();
        let rng = Box::new(ScriptedRandom::constant(0.0));
        assert!(matches!(
            SessionRecorder::new(&config, rng, Arc::new(clock())),
            Err(KaalError::EmptyMessagePool(Severity::Error))
        ));

        let config = RecorderConfig {
            emit_probability: 5.0,
            ..RecorderConfig::default()
        };
        let rng = Box::new(ScriptedRandom::constant(0.0));
        assert!(matches!(
            SessionRecorder::new(&config, rng, Arc::new(clock())),
            Err(KaalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn stop_toast_reports_duration() {
        let toast = Transition::Stopped { elapsed_seconds: 3_661 }.toast().unwrap();
        assert_eq!(toast.title, "Recording Stopped");
        assert_eq!(toast.description, "Session recorded for 01:01:01.");
    }
}
