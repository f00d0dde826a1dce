//! Contains the panel state machines and the timer bookkeeping the engine uses.
//!
//! Each panel of the command center owns its state explicitly: the mission
//! timeline, the deployment panel, and the timed simulations that model their
//! loading delays. The `KaalEngine` keeps one of each and arms timers for
//! them through the `TimerRegistry`.

pub mod deployment;
pub mod sequence;
pub mod timeline;
pub mod timers;
