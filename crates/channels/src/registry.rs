//! Channel resolution and the fixed set of running sessions.

use std::{collections::HashSet, sync::Arc};

use {
    chorus_common::ChannelId,
    futures::future::try_join_all,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use chorus_metrics::{channels as ch_metrics, gauge};

use crate::{
    Error, Result,
    poller::InboundStream,
    sender::OutboundSink,
    service::{ChannelResolver, LiveChatService},
    session::{Session, SessionConfig, SessionReport},
};

/// Resolve every URL concurrently. Returns ids in URL order, or the first
/// failure; there is no partial result.
pub async fn resolve_all(resolver: &dyn ChannelResolver, urls: &[String]) -> Result<Vec<ChannelId>> {
    let lookups = urls.iter().map(|url| async move {
        let channel_id = resolver.resolve(url).await.map_err(|e| match e {
            Error::Resolve { .. } => e,
            other => Error::resolve(url.as_str(), other),
        })?;
        info!(url = %url, channel_id = %channel_id, "resolved live chat");
        Ok::<_, Error>(channel_id)
    });
    try_join_all(lookups).await
}

/// All running sessions, one per distinct channel id, in startup order.
///
/// Built once; the set of sessions never changes afterwards.
pub struct SessionRegistry {
    sessions: Vec<Session>,
}

impl SessionRegistry {
    /// Start one session per distinct channel id.
    pub fn start(
        channel_ids: impl IntoIterator<Item = ChannelId>,
        service: Arc<dyn LiveChatService>,
        config: &SessionConfig,
        cancel: &CancellationToken,
    ) -> Self {
        let mut sessions = Vec::new();
        let mut started = HashSet::new();

        for channel_id in channel_ids {
            if !started.insert(channel_id.clone()) {
                warn!(channel_id = %channel_id, "channel listed more than once, joining it once");
                continue;
            }
            sessions.push(Session::start(
                channel_id,
                Arc::clone(&service),
                config,
                cancel,
            ));
        }

        #[cfg(feature = "metrics")]
        gauge!(ch_metrics::SESSIONS_ACTIVE).set(sessions.len() as f64);

        info!(sessions = sessions.len(), "session registry started");
        Self { sessions }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// A clone of every session's outbound sink, in startup order.
    pub fn sinks(&self) -> Vec<OutboundSink> {
        self.sessions.iter().map(|s| s.outbound().clone()).collect()
    }

    /// Hand out every inbound stream that has not been taken yet.
    pub fn take_inbound_streams(&mut self) -> Vec<InboundStream> {
        self.sessions
            .iter_mut()
            .filter_map(Session::take_inbound)
            .collect()
    }

    /// Shut every session down concurrently.
    pub async fn shutdown(self) -> Vec<SessionReport> {
        let reports = futures::future::join_all(self.sessions.into_iter().map(Session::shutdown)).await;

        #[cfg(feature = "metrics")]
        gauge!(ch_metrics::SESSIONS_ACTIVE).set(0.0);

        reports
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::testing::ScriptedService,
    };

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn resolves_in_url_order() {
        let resolver = ScriptedService::new()
            .resolves("https://youtu.be/a", "chat-a")
            .resolves("https://youtu.be/b", "chat-b");

        let ids = resolve_all(&resolver, &urls(&["https://youtu.be/b", "https://youtu.be/a"]))
            .await
            .unwrap();
        assert_eq!(ids, [ChannelId::new("chat-b"), ChannelId::new("chat-a")]);
    }

    #[tokio::test]
    async fn one_failed_resolution_fails_startup() {
        let resolver = ScriptedService::new().resolves("https://youtu.be/a", "chat-a");

        let err = resolve_all(&resolver, &urls(&["https://youtu.be/a", "https://youtu.be/gone"]))
            .await
            .unwrap_err();
        match err {
            Error::Resolve { url, .. } => assert_eq!(url, "https://youtu.be/gone"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_ids_share_one_session() {
        let service = Arc::new(ScriptedService::new().idle_when_exhausted(1000));
        let cancel = CancellationToken::new();
        let mut registry = SessionRegistry::start(
            ["c1", "c2", "c1"].map(ChannelId::new),
            service,
            &SessionConfig::default(),
            &cancel,
        );

        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());

        let sinks = registry.sinks();
        assert_eq!(
            sinks.iter().map(|s| s.channel_id().clone()).collect::<Vec<_>>(),
            ["c1", "c2"].map(ChannelId::new)
        );

        assert_eq!(registry.take_inbound_streams().len(), 2);
        assert!(registry.take_inbound_streams().is_empty());

        drop(sinks);
        cancel.cancel();
        let reports = registry.shutdown().await;
        assert_eq!(reports.len(), 2);
    }
}
