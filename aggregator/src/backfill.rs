//! Full-history backfill windows
//!
//! Windows run from the genesis window forward, one periodicity at a time,
//! while the window start is before "now". They are contiguous and never
//! overlap, so their union covers `[genesis window start, last window end)`.

use analytics_common::{ExecutionWindow, Periodicity, GENESIS_EPOCH_SECONDS};

/// Ascending windows from `start` up to (but not including) `now`
#[derive(Debug, Clone)]
pub struct BackfillWindows {
    next: ExecutionWindow,
    now: i64,
}

impl BackfillWindows {
    pub fn new(periodicity: Periodicity, start: i64, now: i64) -> Self {
        Self {
            next: periodicity.window_containing(start),
            now,
        }
    }
}

impl Iterator for BackfillWindows {
    type Item = ExecutionWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.from_timestamp() >= self.now {
            return None;
        }
        let current = self.next;
        self.next = current.following();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.now - self.next.from_timestamp();
        if remaining <= 0 {
            return (0, Some(0));
        }
        let step = self.next.duration_seconds();
        let count = ((remaining + step - 1) / step) as usize;
        (count, Some(count))
    }
}

impl ExactSizeIterator for BackfillWindows {}

/// Every window of `periodicity` from the genesis epoch to `now`
pub fn windows_since_genesis(periodicity: Periodicity, now: i64) -> BackfillWindows {
    BackfillWindows::new(periodicity, GENESIS_EPOCH_SECONDS, now)
}
