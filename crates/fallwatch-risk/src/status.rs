//! Coarse, lossy projection of the session state for indicator hardware.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::RiskState;

/// What a status light shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIndicator {
    /// Occupancy gate closed; nothing is evaluated.
    Inactive,
    /// Monitoring with no alert outstanding.
    Monitoring,
    /// A soft alert is active.
    SoftAlert,
    /// A hard alert is active or an alert is still unacknowledged.
    Emergency,
}

impl StatusIndicator {
    /// Projects the session onto an indicator.
    ///
    /// An unacknowledged alert keeps the indicator at [`Emergency`] even
    /// after the state machine has moved on to `COOLDOWN`.
    ///
    /// [`Emergency`]: StatusIndicator::Emergency
    pub fn project(state: RiskState, occupied: bool, hard_alert_pending: bool) -> Self {
        if hard_alert_pending {
            return StatusIndicator::Emergency;
        }
        if !occupied {
            return StatusIndicator::Inactive;
        }
        match state {
            RiskState::HardAlert => StatusIndicator::Emergency,
            RiskState::SoftAlert => StatusIndicator::SoftAlert,
            RiskState::Idle | RiskState::FallCandidate | RiskState::Cooldown => {
                StatusIndicator::Monitoring
            }
        }
    }
}

impl fmt::Display for StatusIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusIndicator::Inactive => "inactive",
            StatusIndicator::Monitoring => "monitoring",
            StatusIndicator::SoftAlert => "soft_alert",
            StatusIndicator::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection() {
        assert_eq!(
            StatusIndicator::project(RiskState::Idle, false, false),
            StatusIndicator::Inactive
        );
        assert_eq!(
            StatusIndicator::project(RiskState::FallCandidate, true, false),
            StatusIndicator::Monitoring
        );
        assert_eq!(
            StatusIndicator::project(RiskState::SoftAlert, true, false),
            StatusIndicator::SoftAlert
        );
        assert_eq!(
            StatusIndicator::project(RiskState::HardAlert, true, false),
            StatusIndicator::Emergency
        );
        assert_eq!(
            StatusIndicator::project(RiskState::Cooldown, true, true),
            StatusIndicator::Emergency
        );
    }
}
