//! Bounded, reference-counted channel.
//!
//! A [`Channel`] is a handle to a fixed-capacity FIFO shared between threads.
//! All queue state lives behind one mutex, with two condition variables used
//! to park producers (buffer full) and consumers (buffer empty):
//!
//! ```text
//!   send ──► [ tail ... head ] ──► receive
//!              │            │
//!        not_full        not_empty
//! ```
//!
//! Handles are reference counted. `retain` (or `clone`) and [`Channel::from_id`]
//! add a reference; `release` (or drop) removes one. The queue, its condition
//! variables and any payloads still queued are torn down when the last handle
//! goes away.
//!
//! Closing is separate from lifetime: a closed channel rejects every send but
//! still drains buffered payloads to receivers, then reports "nothing
//! received" without blocking.

mod ring;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::payload::Payload;
use crate::registry;
use crate::types::{ChannelConfig, ChannelId, Error, Result};

use ring::RingBuffer;

/// Snapshot of a channel's state and traffic counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub id: ChannelId,
    pub capacity: usize,
    pub queued: usize,
    pub closed: bool,
    pub sent: u64,
    pub received: u64,
    /// Immediate sends turned away because the buffer was full.
    pub rejected: u64,
    pub high_water_mark: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Counters {
    sent: u64,
    received: u64,
    rejected: u64,
    high_water_mark: usize,
}

#[derive(Debug)]
struct State<T> {
    ring: RingBuffer<T>,
    closed: bool,
    counters: Counters,
}

struct Shared<T> {
    id: ChannelId,
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    created_at: DateTime<Utc>,
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        registry::unregister(self.id);
        let dropped = self.state.get_mut().ring.clear();
        tracing::debug!(channel_id = %self.id, dropped, "channel torn down");
    }
}

/// Handle to a bounded channel carrying values of type `T`.
///
/// `T` is expected to be cheap to clone (a reference-counted buffer such as
/// [`Payload`]): a send retains a new reference and the receiver takes
/// ownership of the queued one.
pub struct Channel<T = Payload> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Channel<T> {
    /// Create a channel holding at most `capacity` values.
    ///
    /// Fails with `InvalidCapacity` for zero and `OutOfMemory` if the slot
    /// storage cannot be allocated. Nothing is registered on failure.
    pub fn new(capacity: usize) -> Result<Self> {
        let ring = RingBuffer::with_capacity(capacity)?;
        let id = ChannelId::next();

        let shared = Arc::new(Shared {
            id,
            state: Mutex::new(State {
                ring,
                closed: false,
                counters: Counters::default(),
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            created_at: Utc::now(),
        });
        registry::register(id, &shared);

        tracing::debug!(channel_id = %id, capacity, "channel created");
        Ok(Self { shared })
    }

    /// Create a channel with the configured default capacity.
    pub fn with_config(config: &ChannelConfig) -> Result<Self> {
        Self::new_checked(config.default_capacity, config)
    }

    /// Create a channel, rejecting capacities above `config.max_capacity`.
    pub fn new_checked(capacity: usize, config: &ChannelConfig) -> Result<Self> {
        if capacity > config.max_capacity {
            return Err(Error::InvalidCapacity(capacity));
        }
        Self::new(capacity)
    }

    /// Rebuild a handle from a numeric identity.
    ///
    /// Adds a reference to the channel. Fails with `UnknownChannel` once every
    /// handle has been released, or if the id names a channel carrying a
    /// different payload type.
    pub fn from_id(id: impl Into<ChannelId>) -> Result<Self> {
        let id = id.into();
        match registry::lookup::<Shared<T>>(id) {
            Some(shared) => {
                tracing::trace!(channel_id = %id, "channel handle rebuilt from id");
                Ok(Self { shared })
            }
            None => Err(Error::UnknownChannel(id)),
        }
    }
}

impl<T> Channel<T> {
    /// Stable numeric identity, usable with [`Channel::from_id`].
    pub fn id(&self) -> ChannelId {
        self.shared.id
    }

    /// Add a reference. Never blocks.
    pub fn retain(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Drop this reference, tearing the channel down if it was the last one.
    pub fn release(self) {
        drop(self);
    }

    /// Number of live handles to this channel.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    pub fn capacity(&self) -> usize {
        self.shared.state.lock().ring.capacity()
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.shared.state.lock().ring.is_full()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Receive a value, or `None` if nothing was received.
    ///
    /// Blocks while the buffer is empty unless `immediate` is set or the
    /// channel is closed. A closed channel keeps handing out buffered values
    /// in order; `None` from a blocking receive therefore means "closed and
    /// drained".
    pub fn receive(&self, immediate: bool) -> Option<T> {
        let mut state = self.shared.state.lock();
        while state.ring.is_empty() {
            if immediate || state.closed {
                return None;
            }
            tracing::trace!(channel_id = %self.shared.id, "receive waiting for data");
            self.shared.not_empty.wait(&mut state);
        }

        let value = state.ring.pop();
        state.counters.received += 1;
        drop(state);

        self.shared.not_full.notify_one();
        value
    }

    /// Close the channel and wake every blocked sender and receiver.
    ///
    /// Idempotent. Senders fail from now on; receivers drain what is left.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        let was_closed = std::mem::replace(&mut state.closed, true);
        let queued = state.ring.len();
        drop(state);

        self.shared.not_full.notify_all();
        self.shared.not_empty.notify_all();

        if !was_closed {
            tracing::debug!(channel_id = %self.shared.id, queued, "channel closed");
        }
    }

    pub fn stats(&self) -> ChannelStats {
        let state = self.shared.state.lock();
        ChannelStats {
            id: self.shared.id,
            capacity: state.ring.capacity(),
            queued: state.ring.len(),
            closed: state.closed,
            sent: state.counters.sent,
            received: state.counters.received,
            rejected: state.counters.rejected,
            high_water_mark: state.counters.high_water_mark,
            created_at: self.shared.created_at,
        }
    }

    /// Blocking iterator over received values, ending once the channel is
    /// closed and drained.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { channel: self }
    }
}

impl<T: Clone> Channel<T> {
    /// Queue a new reference to `payload`.
    ///
    /// Returns `Ok(true)` once queued. With `immediate` set, a full buffer
    /// returns `Ok(false)` instead of blocking. Fails with `ChannelClosed` if
    /// the channel is (or becomes, while waiting) closed, even when space is
    /// available.
    pub fn send(&self, payload: &T, immediate: bool) -> Result<bool> {
        let mut state = self.shared.state.lock();
        while state.ring.is_full() && !state.closed {
            if immediate {
                state.counters.rejected += 1;
                return Ok(false);
            }
            tracing::trace!(channel_id = %self.shared.id, "send waiting for space");
            self.shared.not_full.wait(&mut state);
        }

        if state.closed {
            return Err(Error::ChannelClosed(self.shared.id));
        }

        state.ring.push(payload.clone());
        state.counters.sent += 1;
        let queued = state.ring.len();
        if queued > state.counters.high_water_mark {
            state.counters.high_water_mark = queued;
        }
        drop(state);

        self.shared.not_empty.notify_one();
        Ok(true)
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        self.retain()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.shared.id)
            .field("refs", &Arc::strong_count(&self.shared))
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`Channel::iter`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    channel: &'a Channel<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.receive(false)
    }
}

impl<'a, T> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
