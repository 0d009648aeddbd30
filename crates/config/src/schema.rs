//! Config schema types (relay, polling, outbound, youtube, metrics).

use std::path::PathBuf;

use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChorusConfig {
    pub relay: RelayConfig,
    pub polling: PollingConfig,
    pub outbound: OutboundConfig,
    pub youtube: YouTubeConfig,
    pub metrics: MetricsConfig,
}

/// Trigger and fan-out behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Prefix that authorizes a message for relay. Every leading repetition
    /// is stripped before the text is broadcast.
    pub marker: String,
    /// Also send relayed text back to the chat it came from.
    pub echo_to_source: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            marker: "/r ".into(),
            echo_to_source: true,
        }
    }
}

/// Inbound polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Fraction added on top of the server's polling hint (0.5 = +50%).
    pub slack: f64,
    /// Wait used when the server gives no polling hint, in milliseconds.
    pub fallback_interval_ms: u64,
    /// Capacity of each channel's inbound stream.
    pub buffer: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            slack: 0.5,
            fallback_interval_ms: 1_000,
            buffer: 64,
        }
    }
}

/// Outbound send pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Capacity of each channel's outbound queue.
    pub queue_capacity: usize,
    /// Sends allowed in flight per channel. `1` sends strictly in order.
    pub max_in_flight: usize,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_in_flight: 4,
        }
    }
}

/// YouTube Data API access.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// Base URL of the Data API v3.
    pub api_base: String,
    /// OAuth access token, usually `${YOUTUBE_ACCESS_TOKEN}`.
    #[serde(skip_serializing)]
    pub access_token: Option<Secret<String>>,
    /// Where the access token is cached between runs. Defaults to
    /// `token.json` in the config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_cache: Option<PathBuf>,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for YouTubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeConfig")
            .field("api_base", &self.api_base)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_cache", &self.token_cache)
            .finish_non_exhaustive()
    }
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/youtube/v3".into(),
            access_token: None,
            token_cache: None,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn defaults() {
        let cfg = ChorusConfig::default();
        assert_eq!(cfg.relay.marker, "/r ");
        assert!(cfg.relay.echo_to_source);
        assert!((cfg.polling.slack - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.polling.fallback_interval_ms, 1_000);
        assert_eq!(cfg.outbound.max_in_flight, 4);
        assert!(cfg.youtube.access_token.is_none());
        assert!(!cfg.metrics.enabled);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: ChorusConfig = toml::from_str(
            r#"
            [relay]
            marker = "!echo "

            [outbound]
            max_in_flight = 1
            "#,
        )
        .unwrap();
        assert_eq!(cfg.relay.marker, "!echo ");
        assert!(cfg.relay.echo_to_source);
        assert_eq!(cfg.outbound.max_in_flight, 1);
        assert_eq!(cfg.outbound.queue_capacity, 64);
    }

    #[test]
    fn access_token_is_redacted_and_never_serialized() {
        let cfg: ChorusConfig =
            serde_json::from_str(r#"{"youtube": {"access_token": "ya29.secret"}}"#).unwrap();
        assert_eq!(
            cfg.youtube
                .access_token
                .as_ref()
                .unwrap()
                .expose_secret()
                .as_str(),
            "ya29.secret"
        );
        assert!(!format!("{:?}", cfg.youtube).contains("ya29"));
        assert!(!serde_json::to_string(&cfg).unwrap().contains("ya29"));
    }
}
