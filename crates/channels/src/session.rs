//! A session pairs one channel's poller and sender.

use std::sync::Arc;

use {
    chorus_common::ChannelId,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{
    poller::{InboundStream, PollerConfig, PollerExit, spawn_poller},
    sender::{OutboundSink, SenderConfig, SenderStats, spawn_sender},
    service::LiveChatService,
};

/// Settings shared by every session in a registry.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub poller: PollerConfig,
    pub sender: SenderConfig,
}

impl From<&chorus_config::ChorusConfig> for SessionConfig {
    fn from(cfg: &chorus_config::ChorusConfig) -> Self {
        Self {
            poller: PollerConfig::from(&cfg.polling),
            sender: SenderConfig::from(&cfg.outbound),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub channel_id: ChannelId,
    pub poller: PollerExit,
    pub sender: SenderStats,
}

/// One live chat: an inbound stream fed by its poller and an outbound sink
/// drained by its sender. Both tasks share the same service client.
pub struct Session {
    channel_id: ChannelId,
    inbound: Option<InboundStream>,
    outbound: OutboundSink,
    cancel: CancellationToken,
    poller: JoinHandle<PollerExit>,
    sender: JoinHandle<SenderStats>,
}

impl Session {
    /// Start polling and sending for `channel_id`.
    ///
    /// The poller stops when `cancel` (or this session's own token, see
    /// [`Session::shutdown`]) fires.
    pub fn start(
        channel_id: ChannelId,
        service: Arc<dyn LiveChatService>,
        config: &SessionConfig,
        cancel: &CancellationToken,
    ) -> Self {
        let cancel = cancel.child_token();
        let (inbound, poller) = spawn_poller(
            channel_id.clone(),
            Arc::clone(&service),
            config.poller.clone(),
            cancel.clone(),
        );
        let (outbound, sender) = spawn_sender(channel_id.clone(), service, config.sender.clone());

        info!(channel_id = %channel_id, "session started");

        Self {
            channel_id,
            inbound: Some(inbound),
            outbound,
            cancel,
            poller,
            sender,
        }
    }

    pub fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Hand out the inbound stream. Only the first call returns it.
    pub fn take_inbound(&mut self) -> Option<InboundStream> {
        self.inbound.take()
    }

    pub fn outbound(&self) -> &OutboundSink {
        &self.outbound
    }

    /// Stop the poller, let the sender drain its queue, and collect both
    /// outcomes.
    ///
    /// The sender only finishes once every clone of [`Session::outbound`]
    /// has been dropped.
    pub async fn shutdown(self) -> SessionReport {
        self.cancel.cancel();
        drop(self.inbound);
        drop(self.outbound);

        let poller = self.poller.await.unwrap_or_else(|e| {
            warn!(channel_id = %self.channel_id, error = %e, "poller task aborted");
            PollerExit::Failed(format!("poller task aborted: {e}"))
        });
        let sender = self.sender.await.unwrap_or_else(|e| {
            warn!(channel_id = %self.channel_id, error = %e, "sender task aborted");
            SenderStats::default()
        });

        info!(channel_id = %self.channel_id, ?poller, sent = sender.sent, failed = sender.failed, "session stopped");

        SessionReport {
            channel_id: self.channel_id,
            poller,
            sender,
        }
    }
}
