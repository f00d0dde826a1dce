//! # KAAL
//!
//! The session recording and timed simulation engine behind the KAAL command
//! center.
//!
//! ## Core Concepts
//!
//! - **Session Recorder**: an `Idle`/`Recording` state machine. While
//!   recording, a ticker advances an elapsed-seconds counter once per tick and,
//!   with a configurable probability, appends a random entry to an append-only
//!   session log.
//! - **Timed simulations**: short `Idle -> Loading -> Ready` sequences that
//!   model the command center's loading delays (log export, mission replay,
//!   asset deployment, interface loading).
//! - **Injected strategies**: the random source, the wall clock and the toast
//!   notifier are all passed in, so every outcome can be scripted in tests.
//! - **Event-driven**: the engine broadcasts strongly-typed events
//!   (`RecorderEvent`, `SimulationEvent`, `SystemEvent`) to any subscriber.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use kaal::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = KaalEngine::new(RecorderConfig::load(None)?)?;
//!
//!     let mut recorder_events = engine.subscribe_recorder_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = recorder_events.recv().await {
//!             println!("Recorder event: {:?}", event);
//!         }
//!     });
//!
//!     engine.start().await;
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "KAAL Session Recorder";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod log;
pub mod notify;
pub mod random;
pub mod recorder;
pub mod time;

/// A prelude module for easy importing of the most common KAAL types.
pub mod prelude {
    pub use crate::common::{EntryId, Interface, SimulationKind, TimerId};
    pub use crate::components::deployment::AssetKind;
    pub use crate::components::sequence::SimulationPhase;
    pub use crate::components::timeline::{MissionPhase, PhaseStatus};
    pub use crate::config::{ClockResolution, RecorderConfig};
    pub use crate::engine::KaalEngine;
    pub use crate::error::KaalError;
    pub use crate::events::{RecorderEvent, SimulationEvent, SystemEvent};
    pub use crate::log::{LogEntry, Severity};
    pub use crate::notify::{Notifier, Toast, ToastVariant};
    pub use crate::recorder::{ExportReport, RecordingState, Transition};
}
