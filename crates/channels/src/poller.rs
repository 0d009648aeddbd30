//! Deduplicating poller: repeatedly fetches one chat and emits each message
//! the first time its id is seen.

use std::{collections::HashSet, sync::Arc, time::Duration};

use {
    chorus_common::{ChannelId, ChatMessage},
    tokio::{sync::mpsc, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use chorus_metrics::{channels as ch_metrics, counter, labels};

use crate::service::LiveChatService;

/// Polling cadence for one channel.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Fraction added on top of the service's hint.
    pub slack: f64,
    /// Used in place of a missing (zero) hint. Non-zero hints are followed
    /// as given.
    pub fallback_interval: Duration,
    /// Capacity of the inbound stream.
    pub buffer: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from(&chorus_config::PollingConfig::default())
    }
}

impl From<&chorus_config::PollingConfig> for PollerConfig {
    fn from(cfg: &chorus_config::PollingConfig) -> Self {
        Self {
            slack: cfg.slack,
            fallback_interval: Duration::from_millis(cfg.fallback_interval_ms),
            buffer: cfg.buffer,
        }
    }
}

impl PollerConfig {
    /// How long to wait before the next poll, given the hint from the most
    /// recent response.
    pub fn next_delay(&self, hint: Duration) -> Duration {
        let base = if hint.is_zero() {
            self.fallback_interval
        } else {
            hint
        };
        if !self.slack.is_finite() || self.slack <= 0.0 {
            return base;
        }
        Duration::try_from_secs_f64(base.as_secs_f64() * (1.0 + self.slack)).unwrap_or(Duration::MAX)
    }
}

/// Message ids a poller has already emitted. Only ever grows.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    /// Record `id`, returning `true` the first time it is seen.
    pub fn insert(&mut self, id: &str) -> bool {
        // Look up by `&str` first so repeat ids never allocate.
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_owned())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Why a poller stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerExit {
    /// A poll call failed. Pollers never retry.
    Failed(String),
    /// The session's cancellation token fired.
    Cancelled,
    /// Nobody is reading the inbound stream any more.
    Detached,
}

/// Read side of a poller: unseen messages for one channel, in service order.
///
/// Yields `None` once the poller has stopped.
#[derive(Debug)]
pub struct InboundStream {
    channel_id: ChannelId,
    rx: mpsc::Receiver<ChatMessage>,
}

impl InboundStream {
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub async fn recv(&mut self) -> Option<ChatMessage> {
        self.rx.recv().await
    }
}

/// Spawn a poller for `channel_id`.
///
/// The task runs until a poll fails, `cancel` fires, or the returned stream
/// is dropped. The stream closes when the task ends.
pub fn spawn_poller(
    channel_id: ChannelId,
    service: Arc<dyn LiveChatService>,
    config: PollerConfig,
    cancel: CancellationToken,
) -> (InboundStream, JoinHandle<PollerExit>) {
    let (tx, rx) = mpsc::channel(config.buffer.max(1));
    let poller = Poller {
        channel_id: channel_id.clone(),
        service,
        config,
        cancel,
        tx,
    };
    let handle = tokio::spawn(poller.run());
    (InboundStream { channel_id, rx }, handle)
}

struct Poller {
    channel_id: ChannelId,
    service: Arc<dyn LiveChatService>,
    config: PollerConfig,
    cancel: CancellationToken,
    tx: mpsc::Sender<ChatMessage>,
}

impl Poller {
    async fn run(self) -> PollerExit {
        info!(channel_id = %self.channel_id, "poller started");
        let exit = self.poll_loop().await;
        match &exit {
            PollerExit::Failed(error) => {
                warn!(channel_id = %self.channel_id, error = %error, "poll failed, channel stopped");
            },
            PollerExit::Cancelled => info!(channel_id = %self.channel_id, "poller cancelled"),
            PollerExit::Detached => {
                debug!(channel_id = %self.channel_id, "inbound stream dropped, poller stopped");
            },
        }
        exit
    }

    async fn poll_loop(&self) -> PollerExit {
        let mut seen = SeenSet::default();

        loop {
            let polled = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return PollerExit::Cancelled,
                polled = self.service.poll(&self.channel_id) => polled,
            };

            #[cfg(feature = "metrics")]
            counter!(ch_metrics::POLLS_TOTAL, labels::CHANNEL => self.channel_id.to_string())
                .increment(1);

            let batch = match polled {
                Ok(batch) => batch,
                Err(e) => {
                    #[cfg(feature = "metrics")]
                    counter!(ch_metrics::POLL_ERRORS_TOTAL, labels::CHANNEL => self.channel_id.to_string())
                        .increment(1);
                    return PollerExit::Failed(e.to_string());
                },
            };

            let total = batch.items.len();
            let mut fresh = 0usize;
            for message in batch.items {
                if !seen.insert(&message.id) {
                    continue;
                }
                fresh += 1;
                let delivered = tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return PollerExit::Cancelled,
                    sent = self.tx.send(message) => sent.is_ok(),
                };
                if !delivered {
                    return PollerExit::Detached;
                }
            }

            #[cfg(feature = "metrics")]
            {
                counter!(ch_metrics::MESSAGES_RECEIVED_TOTAL, labels::CHANNEL => self.channel_id.to_string())
                    .increment(fresh as u64);
                counter!(ch_metrics::DUPLICATES_SKIPPED_TOTAL, labels::CHANNEL => self.channel_id.to_string())
                    .increment((total - fresh) as u64);
            }

            let delay = self.config.next_delay(batch.next_poll_hint);
            debug!(
                channel_id = %self.channel_id,
                total,
                fresh,
                seen = seen.len(),
                delay = ?delay,
                "poll complete"
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return PollerExit::Cancelled,
                () = tokio::time::sleep(delay) => {},
            }
        }
    }
}
