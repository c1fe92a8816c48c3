//! Core types for threadchan.
//!
//! This module provides foundational types used throughout the crate:
//! - **IDs**: The numeric channel identity handed across threads
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Channel defaults and observability settings

mod config;
mod errors;
mod ids;

pub use config::{ChannelConfig, Config, ObservabilityConfig};
pub use errors::{Error, Result};
pub use ids::ChannelId;
