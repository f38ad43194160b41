//! Bounded, time-ordered buffer of recent keypoint samples.

use std::collections::vec_deque::{self, VecDeque};

use chrono::{DateTime, Duration, Utc};
use fallwatch_core::KeypointSample;

use crate::error::{RiskError, RiskResult};

/// Converts fractional seconds into a [`chrono::Duration`] with millisecond
/// resolution. Negative and non-finite inputs map to zero.
pub fn seconds(value: f64) -> Duration {
    if !value.is_finite() || value <= 0.0 {
        return Duration::zero();
    }
    Duration::milliseconds((value * 1000.0).round() as i64)
}

/// Elapsed seconds from `since` to `now`, clamped at zero.
pub fn elapsed_s(now: DateTime<Utc>, since: DateTime<Utc>) -> f64 {
    let ms = (now - since).num_milliseconds();
    if ms <= 0 {
        0.0
    } else {
        ms as f64 / 1000.0
    }
}

/// Rolling window of samples covering at least the configured lookback.
///
/// Timestamps are strictly increasing. Samples older than the lookback,
/// measured from the newest sample, are evicted on every append.
#[derive(Debug, Clone)]
pub struct MotionHistory {
    samples: VecDeque<KeypointSample>,
    max_lookback: Duration,
}

impl MotionHistory {
    /// Creates an empty buffer retaining `max_lookback_s` seconds of history.
    pub fn new(max_lookback_s: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            max_lookback: seconds(max_lookback_s),
        }
    }

    /// Appends a sample.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::OutOfOrder`] if the sample is not strictly newer
    /// than the newest stored one. The buffer is left unchanged.
    pub fn append(&mut self, sample: KeypointSample) -> RiskResult<()> {
        if let Some(last) = self.samples.back() {
            if sample.timestamp() <= last.timestamp() {
                return Err(RiskError::out_of_order(last.timestamp(), sample.timestamp()));
            }
        }
        let horizon = sample
            .timestamp()
            .checked_sub_signed(self.max_lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.samples.push_back(sample);
        while self
            .samples
            .front()
            .is_some_and(|oldest| oldest.timestamp() < horizon)
        {
            self.samples.pop_front();
        }
        Ok(())
    }

    /// Samples whose age at `now` is at most `duration_s`, oldest first.
    ///
    /// Callers treat fewer than two samples as inconclusive.
    pub fn window(&self, duration_s: f64, now: DateTime<Utc>) -> vec_deque::Iter<'_, KeypointSample> {
        let oldest_allowed = now
            .checked_sub_signed(seconds(duration_s))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let start = self
            .samples
            .partition_point(|s| s.timestamp() < oldest_allowed);
        self.samples.range(start..)
    }

    /// Samples at or after `since`, oldest first.
    pub fn since(&self, since: DateTime<Utc>) -> vec_deque::Iter<'_, KeypointSample> {
        let start = self.samples.partition_point(|s| s.timestamp() < since);
        self.samples.range(start..)
    }

    /// Newest sample.
    pub fn latest(&self) -> Option<&KeypointSample> {
        self.samples.back()
    }

    /// Sample preceding the newest one.
    pub fn previous(&self) -> Option<&KeypointSample> {
        self.samples.len().checked_sub(2).and_then(|i| self.samples.get(i))
    }

    /// Timestamp of the newest sample.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.latest().map(KeypointSample::timestamp)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drops every stored sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> KeypointSample {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        KeypointSample::new(base + Duration::milliseconds(ms))
    }

    #[test]
    fn rejects_out_of_order_and_duplicate_timestamps() {
        let mut history = MotionHistory::new(10.0);
        history.append(at(1000)).unwrap();
        assert!(matches!(history.append(at(1000)), Err(RiskError::OutOfOrder { .. })));
        assert!(matches!(history.append(at(500)), Err(RiskError::OutOfOrder { .. })));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn evicts_beyond_lookback() {
        let mut history = MotionHistory::new(2.0);
        for i in 0..50 {
            history.append(at(i * 100)).unwrap();
        }
        // Newest is 4.9s; anything before 2.9s is gone.
        let oldest = history.window(100.0, at(4900).timestamp()).next().unwrap();
        assert_eq!(oldest.timestamp(), at(2900).timestamp());
        assert_eq!(history.len(), 21);
    }

    #[test]
    fn window_selects_by_elapsed_time() {
        let mut history = MotionHistory::new(10.0);
        for i in 0..10 {
            history.append(at(i * 250)).unwrap();
        }
        let now = at(2250).timestamp();
        let window: Vec<_> = history.window(1.0, now).collect();
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].timestamp(), at(1250).timestamp());
        assert!(window.windows(2).all(|w| w[0].timestamp() < w[1].timestamp()));

        assert_eq!(history.window(1.0, at(60_000).timestamp()).len(), 0);
    }

    #[test]
    fn previous_and_clear() {
        let mut history = MotionHistory::new(10.0);
        assert!(history.previous().is_none());
        history.append(at(0)).unwrap();
        history.append(at(100)).unwrap();
        assert_eq!(history.previous().unwrap().timestamp(), at(0).timestamp());
        assert_eq!(history.since(at(50).timestamp()).len(), 1);

        history.clear();
        assert!(history.is_empty());
        assert!(history.last_timestamp().is_none());
        history.append(at(0)).unwrap();
    }

    #[test]
    fn lookback_beyond_calendar_range_keeps_everything() {
        let mut history = MotionHistory::new(1e13);
        for i in 0..5 {
            history.append(at(i * 100)).unwrap();
        }
        assert_eq!(history.len(), 5);
        assert_eq!(history.window(1e13, at(400).timestamp()).len(), 5);
    }

    #[test]
    fn elapsed_clamps_negative() {
        let a = at(0).timestamp();
        let b = at(1500).timestamp();
        assert_eq!(elapsed_s(b, a), 1.5);
        assert_eq!(elapsed_s(a, b), 0.0);
        assert_eq!(seconds(-3.0), Duration::zero());
    }
}
