//! Three-step wizard: Intel Engine → Strategy Workshop → Final Playbook
//!
//! Forward steps are gated on the data currently present, not on whether a
//! step was ever completed. Emptying the grid after reaching the playbook
//! therefore locks step 3 again until a tile is placed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wizard position, serialized as its step number (1–3)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WizardStep {
    /// Campaign input and research request
    #[default]
    Input = 1,
    /// Research review, strategy wells and grid assembly
    Strategy = 2,
    /// Finalized grid, export and share
    Playbook = 3,
}

/// Navigation refused because the target's entry condition is not met
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Invalid wizard step: {0}")]
    InvalidStep(u8),

    #[error("Step {step} is locked: {reason}")]
    Locked { step: u8, reason: &'static str },
}

/// Data presence the gates look at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub research_sections: usize,
    pub grid_tiles: usize,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [WizardStep::Input, WizardStep::Strategy, WizardStep::Playbook];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            WizardStep::Input => "Intel Engine",
            WizardStep::Strategy => "Strategy Workshop",
            WizardStep::Playbook => "Final Playbook",
        }
    }

    /// Whether `self` may be entered given current data
    pub fn is_accessible(&self, progress: Progress) -> bool {
        self.gate(progress).is_ok()
    }

    fn gate(&self, progress: Progress) -> Result<(), WizardError> {
        match self {
            WizardStep::Input => Ok(()),
            WizardStep::Strategy if progress.research_sections > 0 => Ok(()),
            WizardStep::Strategy => Err(WizardError::Locked {
                step: 2,
                reason: "run research first",
            }),
            WizardStep::Playbook if progress.grid_tiles > 0 => Ok(()),
            WizardStep::Playbook => Err(WizardError::Locked {
                step: 3,
                reason: "place at least one tile in the grid",
            }),
        }
    }

    /// Move from `self` to `target`
    ///
    /// Backward moves and staying put are always allowed.
    pub fn navigate(self, target: WizardStep, progress: Progress) -> Result<WizardStep, WizardError> {
        if target <= self {
            return Ok(target);
        }
        target.gate(progress)?;
        Ok(target)
    }

    /// Every step currently reachable, in order
    pub fn accessible_steps(progress: Progress) -> Vec<WizardStep> {
        Self::ALL
            .into_iter()
            .filter(|step| step.is_accessible(progress))
            .collect()
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = WizardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(WizardStep::Input),
            2 => Ok(WizardStep::Strategy),
            3 => Ok(WizardStep::Playbook),
            other => Err(WizardError::InvalidStep(other)),
        }
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> u8 {
        step.number()
    }
}
