//! # threadchan - Bounded Channels for Worker Threads
//!
//! A fixed-capacity, thread-safe, reference-counted channel for passing
//! opaque byte payloads between independently scheduled threads:
//! - Blocking and non-blocking (`immediate`) send/receive
//! - Strict FIFO delivery per channel
//! - One-way close: senders fail, receivers drain what is buffered
//! - Reference-counted handles, rebuildable from a numeric [`ChannelId`]
//!
//! ## Architecture
//!
//! ```text
//!   thread A                                    thread B
//!   Channel::new(cap) ── id() ──► u64 ──► Channel::from_id(id)
//!        │                                           │
//!        │   ┌─────────────── Shared ─────────────┐  │
//!        └──►│ Mutex<ring buffer + closed flag>   │◄─┘
//!            │ Condvar not_full / not_empty       │
//!            └────────────────────────────────────┘
//!                         ▲ weak
//!                  process-wide registry
//! ```
//!
//! The registry only holds weak references, so an id stops resolving as soon
//! as the last handle is released.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod channel;
pub mod payload;
pub mod registry;
pub mod types;

// Internal utilities
pub mod observability;

pub use channel::{Channel, ChannelStats, Iter};
pub use payload::Payload;
pub use types::{ChannelConfig, ChannelId, Config, Error, Result};
