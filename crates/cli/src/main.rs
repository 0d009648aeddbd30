use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    chorus_channels::{LiveChatService, SessionConfig, SessionRegistry, resolve_all},
    chorus_config::ChorusConfig,
    chorus_metrics::MetricsRecorderConfig,
    chorus_relay::{Relay, Trigger},
    chorus_youtube::{AuthMode, TokenCache, YouTubeClient, select_token},
    clap::Parser,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser, Debug)]
#[command(
    name = "chorus",
    version,
    about = "Relay marked messages between YouTube live chats"
)]
struct Cli {
    /// Live stream URLs. Every chat receives what any of them relays.
    #[arg(required = true, value_name = "URL")]
    urls: Vec<String>,

    /// Discard the cached access token and use the configured one.
    #[arg(long, default_value_t = false)]
    refresh_auth: bool,

    /// Config file (default: chorus.{toml,yaml,yml,json} in ./ or ~/.config/chorus/).
    #[arg(long, env = "CHORUS_CONFIG")]
    config: Option<PathBuf>,

    /// Trigger marker (overrides relay.marker).
    #[arg(long)]
    marker: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config file, apply command-line overrides and validate.
fn load_config(cli: &Cli) -> anyhow::Result<ChorusConfig> {
    let mut config = match &cli.config {
        Some(path) => chorus_config::load_config(path)?,
        None => chorus_config::discover_and_load(),
    };
    if let Some(marker) = &cli.marker {
        config.relay.marker = marker.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received, shutting down");
            cancel.cancel();
        },
        Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chorus starting");

    let config = load_config(&cli)?;
    let metrics = chorus_metrics::init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
    })?;
    let trigger = Trigger::try_from(&config.relay)?;

    let cache = TokenCache::from_config(&config.youtube);
    let token = select_token(
        AuthMode::from_refresh_flag(cli.refresh_auth),
        &cache,
        config.youtube.access_token.as_ref(),
    )?;
    let client = Arc::new(YouTubeClient::from_config(&config.youtube, token)?);

    let channel_ids = resolve_all(client.as_ref(), &cli.urls)
        .await
        .context("could not find a live chat for every URL")?;

    let cancel = CancellationToken::new();
    let registry = SessionRegistry::start(
        channel_ids,
        client as Arc<dyn LiveChatService>,
        &SessionConfig::from(&config),
        &cancel,
    );
    let relay = Relay::new(registry, trigger).with_echo_to_source(config.relay.echo_to_source);

    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    let summary = relay.run(cancel).await;

    for channel_id in &summary.failed_channels {
        warn!(channel_id = %channel_id, "channel stopped after a polling error");
    }
    info!(
        channels = summary.channels,
        relayed = summary.relayed,
        sent = summary.sent,
        send_failures = summary.send_failures,
        "chorus finished"
    );
    if config.metrics.enabled {
        debug!(metrics = %metrics.render(), "final metrics");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_required() {
        assert!(Cli::try_parse_from(["chorus"]).is_err());
        assert!(Cli::try_parse_from(["chorus", "--refresh-auth"]).is_err());
    }

    #[test]
    fn parses_flags_and_urls() {
        let cli = Cli::try_parse_from([
            "chorus",
            "--refresh-auth",
            "--marker",
            "!r ",
            "https://youtu.be/a",
            "https://youtu.be/b",
        ])
        .unwrap();
        assert!(cli.refresh_auth);
        assert_eq!(cli.marker.as_deref(), Some("!r "));
        assert_eq!(cli.urls, ["https://youtu.be/a", "https://youtu.be/b"]);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn marker_flag_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chorus.toml");
        std::fs::write(&path, "[relay]\nmarker = \"/relay \"\necho_to_source = false\n").unwrap();

        let mut cli = Cli::try_parse_from(["chorus", "https://youtu.be/a"]).unwrap();
        cli.config = Some(path);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.relay.marker, "/relay ");
        assert!(!config.relay.echo_to_source);

        cli.marker = Some("!! ".into());
        assert_eq!(load_config(&cli).unwrap().relay.marker, "!! ");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chorus.toml");
        std::fs::write(&path, "[polling]\nslack = -1.0\n").unwrap();

        let mut cli = Cli::try_parse_from(["chorus", "https://youtu.be/a"]).unwrap();
        cli.config = Some(path);
        assert!(load_config(&cli).is_err());
    }
}
