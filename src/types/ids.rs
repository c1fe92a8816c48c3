//! Strongly-typed identifiers.
//!
//! Channel ids are plain integers so they can be handed to a worker that
//! shares nothing else with the creating thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Next id handed out by [`ChannelId::next`]. Zero is never issued.
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Stable numeric identity of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Allocate a fresh, process-unique id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Rebuild an id from the integer a worker was handed.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<ChannelId> for u64 {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

impl From<u64> for ChannelId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
