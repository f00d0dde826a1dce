//! Finite, timed phase sequences that stand in for the dashboard's fake
//! "loading" delays.

use crate::common::SimulationKind;
use crate::error::{KaalError, Result};
use std::fmt;
use std::time::Duration;

/// The phase a timed simulation is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationPhase {
    #[default]
    Idle,
    Loading,
    Ready,
}

impl fmt::Display for SimulationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationPhase::Idle => f.write_str("idle"),
            SimulationPhase::Loading => f.write_str("loading"),
            SimulationPhase::Ready => f.write_str("ready"),
        }
    }
}

/// An `Idle -> Loading -> Ready` machine with a fixed loading delay.
///
/// The machine itself does no waiting; the engine arms a timer for
/// [`delay`](Self::delay) after [`begin`](Self::begin) and calls
/// [`complete`](Self::complete) when it fires.
#[derive(Debug, Clone)]
pub struct TimedSimulation {
    kind: SimulationKind,
    delay: Duration,
    phase: SimulationPhase,
    completed_runs: u32,
}

impl TimedSimulation {
    pub fn new(kind: SimulationKind, delay: Duration) -> Self {
        Self {
            kind,
            delay,
            phase: SimulationPhase::Idle,
            completed_runs: 0,
        }
    }

    pub fn kind(&self) -> SimulationKind {
        self.kind
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn phase(&self) -> SimulationPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SimulationPhase::Loading
    }

    pub fn completed_runs(&self) -> u32 {
        self.completed_runs
    }

    /// Enters `Loading`. Refused while a run is already loading.
    pub fn begin(&mut self) -> Result<()> {
        if self.is_loading() {
            return Err(KaalError::SimulationInProgress(self.kind));
        }
        self.phase = SimulationPhase::Loading;
        Ok(())
    }

    /// Moves `Loading -> Ready`. Returns `false` if nothing was loading.
    pub fn complete(&mut self) -> bool {
        if !self.is_loading() {
            return false;
        }
        self.phase = SimulationPhase::Ready;
        self.completed_runs += 1;
        true
    }

    /// Abandons any run in progress and returns to `Idle`.
    pub fn reset(&mut self) {
        self.phase = SimulationPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay() -> TimedSimulation {
        TimedSimulation::new(SimulationKind::Replay, Duration::from_millis(2_500))
    }

    #[test]
    fn runs_idle_loading_ready() {
        let mut sim = replay();
        assert_eq!(sim.phase(), SimulationPhase::Idle);
        sim.begin().unwrap();
        assert_eq!(sim.phase(), SimulationPhase::Loading);
        assert!(sim.complete());
        assert_eq!(sim.phase(), SimulationPhase::Ready);
        assert_eq!(sim.completed_runs(), 1);
    }

    #[test]
    fn begin_is_refused_while_loading() {
        let mut sim = replay();
        sim.begin().unwrap();
        assert!(matches!(
            sim.begin(),
            Err(KaalError::SimulationInProgress(SimulationKind::Replay))
        ));
    }

    #[test]
    fn ready_simulation_can_run_again() {
        let mut sim = replay();
        sim.begin().unwrap();
        sim.complete();
        sim.begin().unwrap();
        assert!(sim.complete());
        assert_eq!(sim.completed_runs(), 2);
    }

    #[test]
    fn complete_without_begin_is_ignored() {
        let mut sim = replay();
        assert!(!sim.complete());
        sim.begin().unwrap();
        sim.reset();
        assert!(!sim.complete());
        assert_eq!(sim.completed_runs(), 0);
    }
}
