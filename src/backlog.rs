use parking_lot::Mutex;

/// Outstanding unbounded-mode requests. Never negative.
#[derive(Debug, Default)]
pub struct BacklogCounter {
    count: Mutex<u64>,
}

impl BacklogCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        *self.count.lock()
    }

    /// Add a signed delta and return the new value. A decrement past zero
    /// clamps at zero.
    pub fn add(&self, delta: i64) -> u64 {
        let mut count = self.count.lock();
        let magnitude = delta.unsigned_abs();

        if delta >= 0 {
            *count = count.saturating_add(magnitude);
        } else if magnitude > *count {
            tracing::warn!(
                count = *count,
                delta,
                "Backlog decrement exceeds outstanding requests, clamping to zero"
            );
            *count = 0;
        } else {
            *count -= magnitude;
        }
        *count
    }

    /// Add `amount` if the backlog is below `low_water`, under a single lock.
    /// Returns the value seen before the top-up when it fires.
    pub fn top_up_if_below(&self, low_water: u64, amount: u64) -> Option<u64> {
        let mut count = self.count.lock();
        if *count >= low_water {
            return None;
        }
        let before = *count;
        *count = count.saturating_add(amount);
        Some(before)
    }

    pub fn complete_one(&self) -> u64 {
        self.add(-1)
    }
}
