//! YouTube live chat backend.
//!
//! [`YouTubeClient`] talks to the Data API v3 and implements the
//! [`LiveChatService`](chorus_channels::LiveChatService) and
//! [`ChannelResolver`](chorus_channels::ChannelResolver) capabilities, so
//! the session engine can poll and post to live chats without knowing which
//! service is behind them.

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod links;

pub use {
    auth::{AuthMode, TokenCache, select_token},
    client::YouTubeClient,
    error::{Error, Result},
};
