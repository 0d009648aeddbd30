use std::sync::Arc;

use {
    chorus_channels::{InboundStream, OutboundSink, PollerExit, SessionRegistry},
    chorus_common::ChannelId,
    futures::future::join_all,
    tokio::{
        sync::{mpsc, watch},
        task::{JoinHandle, JoinSet},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use chorus_metrics::{counter, labels, relay as relay_metrics};

use crate::{Result, trigger::Trigger};

/// Lifecycle of a relay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Listening to at least one inbound stream.
    Running,
    /// Every listener has stopped; senders are flushing their queues.
    Draining,
    /// All sessions are shut down.
    Stopped,
}

/// What happened during a relay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelaySummary {
    pub channels: usize,
    /// Messages that matched the trigger and were broadcast.
    pub relayed: u64,
    /// Messages ignored by the trigger rule.
    pub discarded: u64,
    /// Sends the chat service accepted, across all channels.
    pub sent: u64,
    /// Sends the chat service rejected, across all channels.
    pub send_failures: u64,
    /// Channels whose poller stopped on a service error.
    pub failed_channels: Vec<ChannelId>,
}

/// Fans messages in from every session and back out to all of them.
pub struct Relay {
    registry: SessionRegistry,
    trigger: Trigger,
    echo_to_source: bool,
    state: watch::Sender<RelayState>,
}

impl Relay {
    pub fn new(registry: SessionRegistry, trigger: Trigger) -> Self {
        let (state, _) = watch::channel(RelayState::Running);
        Self {
            registry,
            trigger,
            echo_to_source: true,
            state,
        }
    }

    pub fn from_config(registry: SessionRegistry, cfg: &chorus_config::RelayConfig) -> Result<Self> {
        Ok(Self::new(registry, Trigger::try_from(cfg)?).with_echo_to_source(cfg.echo_to_source))
    }

    /// Whether relayed text is also sent back to the chat it came from.
    pub fn with_echo_to_source(mut self, echo: bool) -> Self {
        self.echo_to_source = echo;
        self
    }

    /// Watch the relay move through [`RelayState`].
    pub fn state(&self) -> watch::Receiver<RelayState> {
        self.state.subscribe()
    }

    /// Relay until every inbound stream has closed or `cancel` fires, then
    /// shut every session down.
    pub async fn run(self, cancel: CancellationToken) -> RelaySummary {
        let Self {
            mut registry,
            trigger,
            echo_to_source,
            state,
        } = self;

        let fan_out = Arc::new(FanOut {
            sinks: registry.sinks(),
            echo_to_source,
        });
        let trigger = Arc::new(trigger);

        let mut listeners = JoinSet::new();
        for inbound in registry.take_inbound_streams() {
            listeners.spawn(listen(
                inbound,
                Arc::clone(&fan_out),
                Arc::clone(&trigger),
                cancel.clone(),
            ));
        }

        let mut summary = RelaySummary {
            channels: registry.len(),
            ..Default::default()
        };
        info!(
            channels = summary.channels,
            marker = trigger.marker(),
            echo_to_source,
            "relay running"
        );

        while let Some(joined) = listeners.join_next().await {
            match joined {
                Ok(stats) => {
                    summary.relayed += stats.relayed;
                    summary.discarded += stats.discarded;
                },
                Err(e) => warn!(error = %e, "relay listener aborted"),
            }
        }

        state.send_replace(RelayState::Draining);
        info!("all inbound streams closed, draining outbound queues");

        // Listeners have joined their forwarders; senders finish once this
        // last set of sink clones is gone.
        drop(fan_out);
        for report in registry.shutdown().await {
            summary.sent += report.sender.sent;
            summary.send_failures += report.sender.failed;
            if let PollerExit::Failed(_) = report.poller {
                summary.failed_channels.push(report.channel_id);
            }
        }

        state.send_replace(RelayState::Stopped);
        info!(
            relayed = summary.relayed,
            discarded = summary.discarded,
            sent = summary.sent,
            send_failures = summary.send_failures,
            failed_channels = summary.failed_channels.len(),
            "relay stopped"
        );
        summary
    }
}

#[derive(Debug, Default)]
struct ListenerStats {
    relayed: u64,
    discarded: u64,
}

struct FanOut {
    sinks: Vec<OutboundSink>,
    echo_to_source: bool,
}

impl FanOut {
    /// One forwarder per sink that should receive messages from `source`.
    fn forwarders(&self, source: &ChannelId) -> Vec<Forwarder> {
        self.sinks
            .iter()
            .filter(|sink| self.echo_to_source || sink.channel_id() != source)
            .map(|sink| Forwarder::spawn(source.clone(), sink.clone()))
            .collect()
    }
}

/// Ordered hand-off from one listener to one sink.
///
/// The listener pushes without waiting; the forwarder task awaits queue
/// space on its own sink, so a full queue only stalls that target.
struct Forwarder {
    tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl Forwarder {
    fn spawn(source: ChannelId, sink: OutboundSink) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(forward(source, sink, rx));
        Self { tx, task }
    }

    fn push(&self, payload: &str) -> bool {
        self.tx.send(payload.to_owned()).is_ok()
    }

    /// Close the hand-off and wait until everything pushed has been queued.
    async fn finish(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!(error = %e, "relay forwarder aborted");
        }
    }
}

async fn forward(source: ChannelId, sink: OutboundSink, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(payload) = rx.recv().await {
        if let Err(e) = sink.submit(payload).await {
            warn!(source = %source, target = %sink.channel_id(), error = %e, "could not queue relayed message");
            #[cfg(feature = "metrics")]
            counter!(relay_metrics::FANOUT_ERRORS_TOTAL, labels::CHANNEL => sink.channel_id().to_string())
                .increment(1);
            // The sender is gone; nothing later can reach it either.
            break;
        }
    }
}

/// Relay every triggered message from `inbound` to its target sessions.
///
/// A message that is only markers (`"/r /r "`) leaves an empty payload and
/// is discarded rather than sent, since chat services reject empty text.
async fn listen(
    mut inbound: InboundStream,
    fan_out: Arc<FanOut>,
    trigger: Arc<Trigger>,
    cancel: CancellationToken,
) -> ListenerStats {
    let source = inbound.channel_id().clone();
    let forwarders = fan_out.forwarders(&source);
    drop(fan_out);
    let mut stats = ListenerStats::default();

    loop {
        let message = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = inbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let payload = match trigger.apply(&message.text) {
            Some(payload) if !payload.is_empty() => payload,
            _ => {
                debug!(channel_id = %source, message_id = %message.id, "no relay trigger");
                stats.discarded += 1;
                #[cfg(feature = "metrics")]
                counter!(relay_metrics::DISCARDED_TOTAL, labels::CHANNEL => source.to_string())
                    .increment(1);
                continue;
            },
        };

        info!(channel_id = %source, message_id = %message.id, payload, "relaying message");
        let targets = forwarders.iter().filter(|f| f.push(payload)).count();
        debug!(channel_id = %source, targets, "relayed message handed off");

        stats.relayed += 1;
        #[cfg(feature = "metrics")]
        counter!(relay_metrics::RELAYED_TOTAL, labels::CHANNEL => source.to_string()).increment(1);
    }

    join_all(forwarders.into_iter().map(Forwarder::finish)).await;
    debug!(channel_id = %source, "listener stopped");
    stats
}
