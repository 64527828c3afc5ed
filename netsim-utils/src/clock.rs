//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic time for the protocol state engines.
///
/// LSA aging and penalty decay read the current time exclusively through
/// this trait, so tests can step time forward instead of sleeping.
pub trait Clock
where
    Self: Clone + std::fmt::Debug,
{
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by the operating system's monotonic clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

/// Manually driven clock.
///
/// Clones share the same underlying time, which makes it possible to drive
/// several state engines from a single time source.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<Instant>>);

// ===== impl SystemClock =====

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ===== impl ManualClock =====

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock(Arc::new(Mutex::new(Instant::now())))
    }

    /// Moves the clock forward by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += duration;
    }

    /// Moves the clock forward by the given number of seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Default for ManualClock {
    fn default() -> ManualClock {
        ManualClock::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.lock().unwrap()
    }
}

// ===== unit tests =====
