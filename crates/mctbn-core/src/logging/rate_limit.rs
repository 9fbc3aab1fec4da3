//! Rate-limited warnings for recurring, expected conditions.
//!
//! Unseen states during cross-validation or prediction can occur once per
//! observation; logging every occurrence would flood the output. A
//! [`RateLimitedWarning`] lets the first few occurrences through and then
//! only every `every`-th one, always reporting the running total.
//!
//! Counters belong to one run through [`RunWarnings`], shared by every clone
//! of that run's [`LogContext`](super::LogContext).

use super::config::{LogConfig, WarningLimit};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter deciding which occurrences of a recurring warning are logged.
#[derive(Debug)]
pub struct RateLimitedWarning {
    count: AtomicU64,
    burst: u64,
    every: u64,
}

impl RateLimitedWarning {
    /// Log the first `burst` occurrences, then every `every`-th.
    pub const fn new(burst: u64, every: u64) -> Self {
        RateLimitedWarning {
            count: AtomicU64::new(0),
            burst,
            every,
        }
    }

    /// Record one occurrence. Returns the total so far when it should be logged.
    pub fn hit(&self) -> Option<u64> {
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        if n <= self.burst || (self.every > 0 && (n - self.burst) % self.every == 0) {
            Some(n)
        } else {
            None
        }
    }

    /// Occurrences recorded so far.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for RateLimitedWarning {
    fn default() -> Self {
        WarningLimit::default().into()
    }
}

impl From<WarningLimit> for RateLimitedWarning {
    fn from(limit: WarningLimit) -> Self {
        Self::new(limit.burst, limit.every)
    }
}

/// The recurring warnings of one learning or prediction run.
#[derive(Debug, Default)]
pub struct RunWarnings {
    /// `stats.unseen_state`
    pub unseen_state: RateLimitedWarning,
    /// `classify.fallback_to_prior`
    pub prior_fallback: RateLimitedWarning,
}

impl RunWarnings {
    pub fn from_config(config: &LogConfig) -> Self {
        RunWarnings {
            unseen_state: config.unseen_state.into(),
            prior_fallback: config.prior_fallback.into(),
        }
    }

    /// Updates skipped for values outside a node domain in this run.
    pub fn skipped_updates(&self) -> u64 {
        self.unseen_state.count()
    }

    /// Predictions decided by the prior in this run.
    pub fn prior_fallbacks(&self) -> u64 {
        self.prior_fallback.count()
    }
}
