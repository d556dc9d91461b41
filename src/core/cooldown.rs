//! Per-user cooldown between accepted requests
//!
//! Records are kept in a bounded moka cache: entries expire once the window
//! has passed and the least recently used users are evicted past the ceiling,
//! so the map never grows with the lifetime of the process.

use moka::ops::compute::Op;
use moka::sync::Cache;
use std::time::Duration;

use crate::core::config;

/// Result of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// Request accepted; `now` has been recorded for the user
    Allow,
    /// Request refused; the user must wait this many more seconds
    Deny { remaining_secs: u64 },
}

impl CooldownDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownDecision::Allow)
    }
}

/// Cooldown gate keyed by Telegram user id, storing the epoch second of the
/// last accepted request.
#[derive(Clone)]
pub struct CooldownGate {
    window_secs: u64,
    records: Cache<u64, i64>,
}

impl CooldownGate {
    pub fn new(window: Duration, max_entries: u64) -> Self {
        // Expiry only bounds memory; the decision itself is computed from the stored timestamp.
        let ttl = window.max(Duration::from_secs(1));
        let records = Cache::builder().max_capacity(max_entries).time_to_live(ttl).build();
        Self {
            window_secs: window.as_secs(),
            records,
        }
    }

    pub fn from_env() -> Self {
        Self::new(config::cooldown::window(), *config::cooldown::MAX_ENTRIES)
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Checks whether `user_id` may submit a request at `now` (epoch seconds).
    ///
    /// On allow, `now` becomes the user's last accepted time in the same
    /// atomic step, so two concurrent checks for one user cannot both pass.
    pub fn check(&self, user_id: u64, now: i64) -> CooldownDecision {
        let window = self.window_secs as i64;
        let mut decision = CooldownDecision::Allow;

        self.records.entry(user_id).and_compute_with(|existing| {
            if let Some(entry) = existing {
                let elapsed = now - *entry.value();
                if elapsed >= 0 && elapsed < window {
                    decision = CooldownDecision::Deny {
                        remaining_secs: (window - elapsed) as u64,
                    };
                    return Op::Nop;
                }
            }
            Op::Put(now)
        });

        decision
    }

    /// Convenience wrapper using the wall clock.
    pub fn check_now(&self, user_id: u64) -> CooldownDecision {
        self.check(user_id, chrono::Utc::now().timestamp())
    }

    /// Number of users currently tracked (after pending evictions are applied).
    pub fn tracked_users(&self) -> u64 {
        self.records.run_pending_tasks();
        self.records.entry_count()
    }
}
