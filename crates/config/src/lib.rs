//! Configuration loading, validation and env substitution.
//!
//! Config files: `chorus.toml`, `chorus.yaml`, `chorus.yml` or `chorus.json`,
//! searched in `./` then `~/.config/chorus/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        ChorusConfig, MetricsConfig, OutboundConfig, PollingConfig, RelayConfig, YouTubeConfig,
    },
};
