//! Defines all public event types broadcast by the recorder engine.
//!
//! Listeners subscribe to these strongly-typed streams instead of polling the
//! engine's state.

use crate::common::{SimulationKind, TimerId};
use crate::components::sequence::SimulationPhase;
use crate::log::LogEntry;
use tokio::time::Instant;

/// Events related to the lifecycle of the engine and its timers.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once when the engine's `run` loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired once when the engine has torn down every timer.
    EngineShutdown { cancelled_timers: usize },
    /// A background timer was registered.
    TimerArmed { id: TimerId },
    /// A background timer was aborted before finishing.
    TimerCancelled { id: TimerId },
}

/// Events emitted by the session recorder.
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// Recording began, or restarted with the counter reset.
    Started { restarted: bool },
    /// Recording stopped; the counter is frozen at `elapsed_seconds`.
    Stopped { elapsed_seconds: u64 },
    /// One tick was processed while recording.
    Tick { elapsed_seconds: u64 },
    /// The emitter appended a random entry.
    EntryAppended(LogEntry),
    /// The log was emptied.
    Cleared { removed: usize },
    /// An export snapshot was taken.
    ExportStarted { entries: usize },
    /// An export finished after its simulated delay.
    ExportCompleted { file_name: String, entries: usize },
}

/// A timed simulation changed phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationEvent {
    pub kind: SimulationKind,
    pub phase: SimulationPhase,
}
