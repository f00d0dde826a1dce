use crate::common::SimulationKind;
use crate::log::Severity;
use thiserror::Error;

/// Errors raised at the fallible edges of the recorder.
///
/// The recorder's own state machine is total: starting, stopping, ticking,
/// exporting and clearing never fail. These variants cover configuration and
/// the panels whose actions can be refused.
#[derive(Error, Debug)]
pub enum KaalError {
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Message pool for {0} is empty")]
    EmptyMessagePool(Severity),

    #[error("Unknown timeline phase: {0}")]
    UnknownPhase(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Deployment refused: no assets have been placed")]
    NothingToDeploy,

    #[error("A {0} simulation is already in progress")]
    SimulationInProgress(SimulationKind),
}

pub type Result<T> = std::result::Result<T, KaalError>;
