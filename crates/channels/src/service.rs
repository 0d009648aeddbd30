//! The capabilities the session engine needs from a chat service.

use std::time::Duration;

use {
    async_trait::async_trait,
    chorus_common::{ChannelId, ChatMessage},
};

use crate::Result;

/// One poll response: messages in service order plus the service's
/// suggested wait before the next poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollBatch {
    pub items: Vec<ChatMessage>,
    pub next_poll_hint: Duration,
}

impl PollBatch {
    pub fn new(items: Vec<ChatMessage>, next_poll_hint: Duration) -> Self {
        Self {
            items,
            next_poll_hint,
        }
    }
}

/// Read and write access to live chats.
///
/// One instance is shared by every session; implementations apply their own
/// request timeouts.
#[async_trait]
pub trait LiveChatService: Send + Sync {
    /// Fetch the messages currently visible in a chat.
    async fn poll(&self, channel: &ChannelId) -> Result<PollBatch>;

    /// Post a text message to a chat.
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<()>;
}

/// Turns a human-facing chat URL into a channel id. Used once at startup.
#[async_trait]
pub trait ChannelResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ChannelId>;
}
