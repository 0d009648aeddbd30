//! Trigger matching and multi-channel fan-out.
//!
//! The [`Relay`] listens to every session's inbound stream, keeps the
//! messages that start with the trigger marker, strips the marker and
//! broadcasts what is left to every session's outbound sink.

pub mod error;
pub mod relay;
pub mod trigger;

pub use {
    error::{Error, Result},
    relay::{Relay, RelayState, RelaySummary},
    trigger::Trigger,
};
