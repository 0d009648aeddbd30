//! Shared types and error helpers used across all chorus crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::{ChannelId, ChatMessage},
};
