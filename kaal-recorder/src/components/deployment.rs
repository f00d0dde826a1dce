//! The deployment panel: placed asset counters and the deploy action.

use crate::common::SimulationKind;
use crate::components::sequence::TimedSimulation;
use crate::error::{KaalError, Result};
use crate::notify::Toast;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Soldiers,
    Tanks,
    Drones,
    Bunkers,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Soldiers,
        AssetKind::Tanks,
        AssetKind::Drones,
        AssetKind::Bunkers,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            AssetKind::Soldiers => "soldiers",
            AssetKind::Tanks => "tanks",
            AssetKind::Drones => "drones",
            AssetKind::Bunkers => "bunkers",
        }
    }

    fn index(&self) -> usize {
        match self {
            AssetKind::Soldiers => 0,
            AssetKind::Tanks => 1,
            AssetKind::Drones => 2,
            AssetKind::Bunkers => 3,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AssetKind {
    type Err = KaalError;

    fn from_str(s: &str) -> Result<Self> {
        AssetKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| KaalError::UnknownAsset(s.to_string()))
    }
}

pub struct DeploymentPanel {
    counts: [u32; 4],
    deploy: TimedSimulation,
    /// Assets counted when the loading deployment was started.
    deploying: u32,
}

impl DeploymentPanel {
    pub fn new(deploy_delay: Duration) -> Self {
        Self {
            counts: [0; 4],
            deploy: TimedSimulation::new(SimulationKind::Deployment, deploy_delay),
            deploying: 0,
        }
    }

    pub fn count(&self, kind: AssetKind) -> u32 {
        self.counts[kind.index()]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Places one asset at grid coordinates `(x, y)`.
    pub fn place(&mut self, kind: AssetKind, x: f64, y: f64) -> Toast {
        self.counts[kind.index()] += 1;
        Toast::new(
            "Asset Added",
            format!(
                "Placed {} at coordinates X:{}, Y:{}",
                kind,
                x.round() as i64,
                y.round() as i64
            ),
        )
    }

    pub fn simulation(&self) -> &TimedSimulation {
        &self.deploy
    }

    /// Starts deploying. Returns the number of assets being deployed.
    ///
    /// Refused when nothing has been placed or a deployment is loading.
    pub fn begin_deploy(&mut self) -> Result<u32> {
        let total = self.total();
        if total == 0 {
            return Err(KaalError::NothingToDeploy);
        }
        self.deploy.begin()?;
        self.deploying = total;
        Ok(total)
    }

    /// Finishes a loading deployment. Returns its success toast, or `None`
    /// if no deployment was loading.
    ///
    /// The toast reports the assets counted by `begin_deploy`; anything
    /// placed while loading waits for the next deployment.
    pub fn complete_deploy(&mut self) -> Option<Toast> {
        if self.deploy.complete() {
            Some(Self::success_toast(self.deploying))
        } else {
            None
        }
    }

    /// Abandons a loading deployment. Placed assets are kept.
    pub fn reset(&mut self) {
        self.deploy.reset();
        self.deploying = 0;
    }

    pub fn success_toast(total: u32) -> Toast {
        Toast::new(
            "Deployment Successful",
            format!("Deployed {} assets to scene.", total),
        )
    }

    pub fn refused_toast() -> Toast {
        Toast::destructive(
            "Deployment Failed",
            "Please add at least one asset to deploy.",
        )
    }
}
