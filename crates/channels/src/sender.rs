//! Outbound sender: drains one channel's submission queue into the chat
//! service with a bounded number of sends in flight.

use std::sync::Arc;

use {
    chorus_common::ChannelId,
    tokio::{
        sync::{Semaphore, mpsc},
        task::{JoinError, JoinHandle, JoinSet},
    },
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use chorus_metrics::{channels as ch_metrics, counter, histogram, labels};

use crate::{Error, Result, service::LiveChatService};

/// Queueing and concurrency limits for one channel's sender.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub queue_capacity: usize,
    /// `1` dispatches strictly in submission order.
    pub max_in_flight: usize,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self::from(&chorus_config::OutboundConfig::default())
    }
}

impl From<&chorus_config::OutboundConfig> for SenderConfig {
    fn from(cfg: &chorus_config::OutboundConfig) -> Self {
        Self {
            queue_capacity: cfg.queue_capacity,
            max_in_flight: cfg.max_in_flight,
        }
    }
}

/// Write side of a sender. Cheap to clone; every clone feeds the same queue.
///
/// The sender stops once every clone has been dropped and the queue is empty.
#[derive(Debug, Clone)]
pub struct OutboundSink {
    channel_id: ChannelId,
    tx: mpsc::Sender<String>,
}

impl OutboundSink {
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Queue `text` for delivery. Waits only for queue space, never for the
    /// network.
    pub async fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.tx.send(text.into()).await.map_err(|_| {
            Error::unavailable(format!("sender for {} has stopped", self.channel_id))
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Delivery outcome counts for one sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub sent: u64,
    pub failed: u64,
}

impl SenderStats {
    fn record(&mut self, channel_id: &ChannelId, outcome: std::result::Result<bool, JoinError>) {
        match outcome {
            Ok(true) => self.sent += 1,
            Ok(false) => self.failed += 1,
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "send task aborted");
                self.failed += 1;
            },
        }
    }
}

/// Spawn the sender for `channel_id`.
///
/// Send failures are logged and counted; they never stop the sender.
pub fn spawn_sender(
    channel_id: ChannelId,
    service: Arc<dyn LiveChatService>,
    config: SenderConfig,
) -> (OutboundSink, JoinHandle<SenderStats>) {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    let handle = tokio::spawn(run(
        channel_id.clone(),
        service,
        config.max_in_flight.max(1),
        rx,
    ));
    (OutboundSink { channel_id, tx }, handle)
}

async fn run(
    channel_id: ChannelId,
    service: Arc<dyn LiveChatService>,
    max_in_flight: usize,
    mut rx: mpsc::Receiver<String>,
) -> SenderStats {
    let limit = Arc::new(Semaphore::new(max_in_flight));
    let mut in_flight = JoinSet::new();
    let mut stats = SenderStats::default();

    debug!(channel_id = %channel_id, max_in_flight, "sender started");

    while let Some(text) = rx.recv().await {
        // The semaphore is never closed, so this only fails if that changes.
        let Ok(permit) = Arc::clone(&limit).acquire_owned().await else {
            break;
        };
        while let Some(done) = in_flight.try_join_next() {
            stats.record(&channel_id, done);
        }

        let service = Arc::clone(&service);
        let channel_id = channel_id.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            dispatch(service.as_ref(), &channel_id, &text).await
        });
    }

    while let Some(done) = in_flight.join_next().await {
        stats.record(&channel_id, done);
    }

    info!(
        channel_id = %channel_id,
        sent = stats.sent,
        failed = stats.failed,
        "sender stopped"
    );
    stats
}

async fn dispatch(service: &dyn LiveChatService, channel_id: &ChannelId, text: &str) -> bool {
    #[cfg(feature = "metrics")]
    let started = std::time::Instant::now();

    let result = service.send(channel_id, text).await;

    #[cfg(feature = "metrics")]
    histogram!(ch_metrics::SEND_DURATION_SECONDS, labels::CHANNEL => channel_id.to_string())
        .record(started.elapsed().as_secs_f64());

    match result {
        Ok(()) => {
            debug!(channel_id = %channel_id, text, "message sent");
            #[cfg(feature = "metrics")]
            counter!(ch_metrics::MESSAGES_SENT_TOTAL, labels::CHANNEL => channel_id.to_string())
                .increment(1);
            true
        },
        Err(e) => {
            warn!(channel_id = %channel_id, text, error = %e, "send failed, message dropped");
            #[cfg(feature = "metrics")]
            counter!(ch_metrics::SEND_ERRORS_TOTAL, labels::CHANNEL => channel_id.to_string())
                .increment(1);
            false
        },
    }
}
