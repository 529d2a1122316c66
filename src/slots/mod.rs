//! Slot Calendar
//!
//! Forging time is divided into fixed-duration slots counted from the chain
//! epoch. Transaction timestamps are expressed in seconds since the epoch and
//! resolve to a slot number; the verifier rejects timestamps whose slot lies
//! beyond the current one.

use crate::chain::constants;
use chrono::{DateTime, Utc};

/// Maps epoch timestamps to forging slots
#[derive(Debug, Clone)]
pub struct SlotCalendar {
    epoch: DateTime<Utc>,
    interval: i64,
}

impl SlotCalendar {
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self { epoch, interval: constants::SLOT_INTERVAL }
    }

    /// Seconds elapsed since the chain epoch
    pub fn epoch_time(&self) -> i32 {
        (Utc::now() - self.epoch).num_seconds() as i32
    }

    /// Slot number containing the given epoch timestamp
    pub fn slot_number(&self, timestamp: i32) -> i64 {
        (timestamp as i64).div_euclid(self.interval)
    }

    /// Slot number containing the current wall-clock time
    pub fn current_slot(&self) -> i64 {
        self.slot_number(self.epoch_time())
    }
}

impl Default for SlotCalendar {
    fn default() -> Self {
        Self::new(crate::chain::ChainParams::default().epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_number() {
        let slots = SlotCalendar::default();

        assert_eq!(slots.slot_number(0), 0);
        assert_eq!(slots.slot_number(9), 0);
        assert_eq!(slots.slot_number(10), 1);
        assert_eq!(slots.slot_number(141738), 14173);
    }

    #[test]
    fn test_negative_timestamps_floor() {
        let slots = SlotCalendar::default();

        // Timestamps before the epoch land in negative slots, never in slot 0
        assert_eq!(slots.slot_number(-1), -1);
        assert_eq!(slots.slot_number(-10), -1);
        assert_eq!(slots.slot_number(-11), -2);
    }

    #[test]
    fn test_current_slot_tracks_epoch_time() {
        let slots = SlotCalendar::default();
        let now = slots.epoch_time();

        assert_eq!(slots.current_slot(), slots.slot_number(now));
        assert!(slots.slot_number(now - 100) <= slots.current_slot());
    }
}
