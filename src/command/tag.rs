//! Command tag issuance.
//!
//! Tags correlate commands with their terminal responses.

use std::sync::atomic::{AtomicU32, Ordering};

/// Issues sequential command tags.
///
/// Tags are zero-padded decimal counters (`0000`, `0001`, ...), monotonic
/// within a session and never reused. The counter widens past four digits
/// naturally. Reset only when a fresh connection is established.
#[derive(Debug, Default)]
pub struct TagSequence {
    counter: AtomicU32,
}

impl TagSequence {
    /// Creates a sequence starting at `0000`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
        }
    }

    /// Issues the next tag.
    ///
    /// # Panics
    ///
    /// Panics if the counter would wrap. Over four billion transactions on
    /// one connection means the session state is corrupt anyway.
    #[must_use]
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        assert!(n != u32::MAX, "tag counter overflow");
        format!("{n:04}")
    }

    /// Current counter value without issuing a tag.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Resets the counter for a fresh connection.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}
