// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Exponential delay between retries of failed passes
#[derive(Debug)]
pub struct ErrorBackoff {
    base: Duration,
    max: Duration,
    failures: AtomicU32,
}

impl ErrorBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: AtomicU32::new(0),
        }
    }

    /// Delay before the next retry; doubles with every consecutive failure up to the cap
    pub fn next_delay(&self) -> Duration {
        let failures = self.failures.fetch_add(1, Ordering::SeqCst);
        let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }
}
