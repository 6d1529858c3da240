/// Engine configuration
///
/// Settings that change computed results live here so they are chosen once
/// and applied to every streak and rate the engine produces.

use serde::{Deserialize, Serialize};

use crate::analytics::{DEFAULT_RATE_DECIMALS, MAX_RATE_DECIMALS};
use crate::domain::{DomainError, StreakPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether a completion yesterday keeps the current streak alive
    pub streak_policy: StreakPolicy,
    /// Decimal places kept on completion-rate percentages
    pub rate_decimals: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streak_policy: StreakPolicy::default(),
            rate_decimals: DEFAULT_RATE_DECIMALS,
        }
    }
}

impl EngineConfig {
    /// Reject settings the engine would otherwise silently adjust
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.rate_decimals > MAX_RATE_DECIMALS {
            return Err(DomainError::Validation {
                message: format!(
                    "rate_decimals must be at most {}, got {}",
                    MAX_RATE_DECIMALS, self.rate_decimals
                ),
            });
        }
        Ok(())
    }
}
