use std::sync::atomic::{AtomicU8, Ordering};

/// Highest percentage reported before the terminal call succeeds.
const CAP: u8 = 99;

/// Monotonic percentage shared between a transfer and its progress sink.
///
/// Values only move forward and stay at or below 99 until [`finish`]
/// snaps them to 100. Safe to update from transport callbacks running on
/// other tasks.
///
/// [`finish`]: ProgressGate::finish
#[derive(Debug, Default)]
pub struct ProgressGate {
    value: AtomicU8,
}

impl ProgressGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a new percentage. Returns the value to report if it moved forward.
    pub fn advance(&self, percent: u8) -> Option<u8> {
        let capped = percent.min(CAP);
        let previous = self.value.fetch_max(capped, Ordering::AcqRel);
        (capped > previous).then_some(capped)
    }

    /// Offers `done / total` as a percentage.
    pub fn advance_ratio(&self, done: u64, total: u64) -> Option<u8> {
        self.advance(percent_of(done, total))
    }

    /// Snaps to 100. Returns `true` the first time.
    pub fn finish(&self) -> bool {
        self.value.swap(100, Ordering::AcqRel) != 100
    }

    /// Returns to 0 for the next unit.
    pub fn reset(&self) {
        self.value.store(0, Ordering::Release);
    }

    pub fn current(&self) -> u8 {
        self.value.load(Ordering::Acquire)
    }
}

/// Integer percentage of `done / total`, floored, clamped to 100.
fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (done.min(total) as u128 * 100) / total as u128;
    pct as u8
}
