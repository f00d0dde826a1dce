//! Contains common, primitive types shared across the recorder engine.
//!
//! This module defines the ID types used to identify log entries, armed timers
//! and timed simulations. Using distinct types keeps the identifiers from being
//! mixed up with each other or with plain counters.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Uniquely identifies a timer armed by the engine.
    ///
    /// Every background timer (the recording ticker, each timed simulation)
    /// gets one of these when it is registered. Keys are never reused, so a
    /// stale `TimerId` can not cancel a newer timer by accident.
    pub struct TimerId;
}

/// Identifies a single entry in the session log.
///
/// Ids are handed out by the log in strictly increasing order and are never
/// reused, even after the log is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of timed simulation the command center runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationKind {
    /// Writing out the session log report.
    Export,
    /// Loading a mission replay from the timeline.
    Replay,
    /// Deploying placed assets to the scene.
    Deployment,
    /// Loading one of the operator interfaces.
    InterfaceLoad,
}

impl SimulationKind {
    pub fn label(&self) -> &'static str {
        match self {
            SimulationKind::Export => "export",
            SimulationKind::Replay => "replay",
            SimulationKind::Deployment => "deployment",
            SimulationKind::InterfaceLoad => "interface-load",
        }
    }
}

impl fmt::Display for SimulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The operator interfaces the command center can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    Tablet,
    Desktop,
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interface::Tablet => f.write_str("tablet"),
            Interface::Desktop => f.write_str("desktop"),
        }
    }
}
