//! Handler types and dependencies

use moka::ops::compute::Op;
use moka::sync::Cache;
use std::time::Duration;

use crate::core::cooldown::CooldownGate;
use crate::download::queue::TaskQueue;
use crate::telegram::router::RouterSettings;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type HandlerResult = Result<(), HandlerError>;

/// How long a picker keyboard stays answerable
const PICK_TTL: Duration = Duration::from_secs(15 * 60);

/// Search behind an open picker keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPick {
    /// User who ran the search and passed the cooldown for it
    pub requester: u64,
    pub query: String,
}

/// Result of pressing a picker button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickClaim {
    /// First press by the requester; the keyboard is consumed
    Claimed(PendingPick),
    /// Someone else's keyboard; left open for its owner
    NotYours,
    /// Already used, timed out, or from before a restart
    Expired,
}

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub queue: TaskQueue,
    pub cooldown: CooldownGate,
    pub router: RouterSettings,
    /// yt-dlp binary for `/status` and picker listings
    pub ytdl_bin: String,
    pub search_picker: bool,
    /// Open picker keyboards, keyed by (chat id, message id)
    pub pending_picks: Cache<(i64, i32), PendingPick>,
}

impl HandlerDeps {
    pub fn new(
        queue: TaskQueue,
        cooldown: CooldownGate,
        router: RouterSettings,
        ytdl_bin: String,
        search_picker: bool,
    ) -> Self {
        Self {
            queue,
            cooldown,
            router,
            ytdl_bin,
            search_picker,
            pending_picks: Cache::builder().max_capacity(10_000).time_to_live(PICK_TTL).build(),
        }
    }

    /// Consumes the picker entry for `key` if `user_id` owns it.
    ///
    /// Check and removal happen in one step, so a double tap claims once.
    pub fn claim_pick(&self, key: (i64, i32), user_id: u64) -> PickClaim {
        let mut claim = PickClaim::Expired;
        self.pending_picks.entry(key).and_compute_with(|existing| match existing {
            Some(entry) if entry.value().requester == user_id => {
                claim = PickClaim::Claimed(entry.into_value());
                Op::Remove
            }
            Some(_) => {
                claim = PickClaim::NotYours;
                Op::Nop
            }
            None => Op::Nop,
        });
        claim
    }
}
