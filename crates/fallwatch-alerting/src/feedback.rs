//! Caregiver feedback counters.

use serde::{Deserialize, Serialize};

use crate::record::AckState;

/// Outcome counts over the manager's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub acked_ok: u64,
    pub acked_false_alarm: u64,
    pub expired: u64,
}

impl FeedbackStats {
    pub fn record(&mut self, state: AckState) {
        match state {
            AckState::AckedOk => self.acked_ok += 1,
            AckState::AckedFalseAlarm => self.acked_false_alarm += 1,
            AckState::Expired => self.expired += 1,
            AckState::Pending => {}
        }
    }

    /// Alerts a caregiver responded to.
    pub fn responded(&self) -> u64 {
        self.acked_ok + self.acked_false_alarm
    }

    /// Share of responses marked as false alarms, `None` before any response.
    pub fn false_positive_ratio(&self) -> Option<f64> {
        let responded = self.responded();
        (responded > 0).then(|| self.acked_false_alarm as f64 / responded as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_ignores_expired() {
        let mut stats = FeedbackStats::default();
        assert_eq!(stats.false_positive_ratio(), None);

        stats.record(AckState::AckedOk);
        stats.record(AckState::AckedOk);
        stats.record(AckState::AckedOk);
        stats.record(AckState::AckedFalseAlarm);
        stats.record(AckState::Expired);
        stats.record(AckState::Pending);

        assert_eq!(stats.responded(), 4);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.false_positive_ratio(), Some(0.25));
    }
}
