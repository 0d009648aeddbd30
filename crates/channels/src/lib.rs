//! Multi-channel session engine.
//!
//! Each live chat gets a [`Session`]: a deduplicating poller feeding an
//! inbound stream, and a bounded sender draining an outbound sink. Sessions
//! are created together by a [`SessionRegistry`] and only ever talk to the
//! chat service through [`LiveChatService`], so one channel failing never
//! touches another.

pub mod error;
pub mod poller;
pub mod registry;
pub mod sender;
pub mod service;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use {
    error::{Error, Result},
    poller::{InboundStream, PollerConfig, PollerExit, SeenSet},
    registry::{SessionRegistry, resolve_all},
    sender::{OutboundSink, SenderConfig, SenderStats},
    service::{ChannelResolver, LiveChatService, PollBatch},
    session::{Session, SessionConfig, SessionReport},
};
