//! The mission timeline: a fixed list of mission phases and the replay loader.

use crate::common::SimulationKind;
use crate::components::sequence::TimedSimulation;
use crate::error::{KaalError, Result};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    Complete,
    Current,
    Upcoming,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseStatus::Complete => f.write_str("complete"),
            PhaseStatus::Current => f.write_str("current"),
            PhaseStatus::Upcoming => f.write_str("upcoming"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionPhase {
    pub id: String,
    pub name: String,
    /// Planned length, as `MM:SS`.
    pub duration: String,
    pub status: PhaseStatus,
    /// Percentage, 0 to 100.
    pub progress: u8,
}

impl MissionPhase {
    fn new(id: &str, name: &str, duration: &str, status: PhaseStatus, progress: u8) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            duration: duration.to_string(),
            status,
            progress: progress.min(100),
        }
    }
}

pub struct MissionTimeline {
    phases: Vec<MissionPhase>,
    replay: TimedSimulation,
}

impl MissionTimeline {
    /// The standard three-phase mission.
    pub fn new(replay_delay: Duration) -> Self {
        Self::with_phases(
            vec![
                MissionPhase::new("phase1", "Phase 1: Reconnaissance", "15:00", PhaseStatus::Complete, 100),
                MissionPhase::new("phase2", "Phase 2: Operation", "30:00", PhaseStatus::Current, 45),
                MissionPhase::new("phase3", "Phase 3: Debrief", "15:00", PhaseStatus::Upcoming, 0),
            ],
            replay_delay,
        )
    }

    pub fn with_phases(phases: Vec<MissionPhase>, replay_delay: Duration) -> Self {
        Self {
            phases,
            replay: TimedSimulation::new(SimulationKind::Replay, replay_delay),
        }
    }

    pub fn phases(&self) -> &[MissionPhase] {
        &self.phases
    }

    /// The first phase marked current.
    pub fn current(&self) -> Option<&MissionPhase> {
        self.phases.iter().find(|p| p.status == PhaseStatus::Current)
    }

    /// Marks the phase with `id` as current. Other phases are untouched.
    pub fn select(&mut self, id: &str) -> Result<&MissionPhase> {
        let phase = self
            .phases
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| KaalError::UnknownPhase(id.to_string()))?;
        phase.status = PhaseStatus::Current;
        Ok(&*phase)
    }

    pub fn replay(&self) -> &TimedSimulation {
        &self.replay
    }

    pub fn replay_mut(&mut self) -> &mut TimedSimulation {
        &mut self.replay
    }
}
