use crate::Height;

/// Range of blocks during which tickets are accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub start: Height,
    pub timeout: u64,
}

impl Window {
    pub fn new(start: Height, timeout: u64) -> Self {
        Self { start, timeout }
    }

    /// First height at which submissions are rejected.
    pub fn closes_at(&self) -> Height {
        self.start.saturating_add(self.timeout)
    }

    /// Returns true if tickets are accepted at `now`.
    pub fn is_open(&self, now: Height) -> bool {
        now < self.closes_at()
    }
}
