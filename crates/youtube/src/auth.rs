//! Access token selection and the on-disk token cache.

use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::{debug, info, warn},
};

use crate::error::{Context, Error, Result};

/// Whether a cached token may be reused or must be replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Reuse,
    /// Discard the cache and take the configured token.
    Refresh,
}

impl AuthMode {
    pub fn from_refresh_flag(refresh: bool) -> Self {
        if refresh { Self::Refresh } else { Self::Reuse }
    }
}

#[derive(Serialize, Deserialize)]
struct CachedToken {
    #[serde(serialize_with = "serialize_secret")]
    access_token: Secret<String>,
    /// Unix timestamp of the write.
    #[serde(default)]
    saved_at: u64,
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// File-based token cache, `token.json` in the config directory by default.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Use `youtube.token_cache` when set, otherwise the config directory.
    pub fn from_config(cfg: &chorus_config::YouTubeConfig) -> Self {
        let path = cfg
            .token_cache
            .clone()
            .unwrap_or_else(|| default_cache_path(chorus_config::config_dir()));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached token, if there is a readable one.
    pub fn load(&self) -> Option<Secret<String>> {
        let path = self.path.display().to_string();
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "token cache not found");
                return None;
            },
            Err(e) => {
                warn!(path = %path, error = %e, "token cache read failed");
                return None;
            },
        };

        match serde_json::from_str::<CachedToken>(&data) {
            Ok(cached) if !cached.access_token.expose_secret().is_empty() => {
                debug!(path = %path, saved_at = cached.saved_at, "cached token loaded");
                Some(cached.access_token)
            },
            Ok(_) => {
                warn!(path = %path, "token cache is empty");
                None
            },
            Err(e) => {
                warn!(path = %path, error = %e, "token cache parse failed");
                None
            },
        }
    }

    pub fn save(&self, token: &Secret<String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let data = serde_json::to_string_pretty(&CachedToken {
            access_token: token.clone(),
            saved_at,
        })?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("writing {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %self.path.display(), "access token cached");
        Ok(())
    }

    /// Remove the cache file. A missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "token cache cleared");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `token.json` under `config_dir`. Without a home directory this falls
/// back to a path relative to the working directory.
fn default_cache_path(config_dir: Option<PathBuf>) -> PathBuf {
    let dir = config_dir.unwrap_or_else(|| {
        let fallback = PathBuf::from(".config/chorus");
        warn!(
            path = %fallback.display(),
            "no config directory for this user, caching the token relative to the working directory"
        );
        fallback
    });
    dir.join("token.json")
}

/// Pick the access token for this run.
///
/// `Reuse` prefers the cached token and falls back to `configured`, caching
/// it. `Refresh` drops the cache and requires `configured`.
pub fn select_token(
    mode: AuthMode,
    cache: &TokenCache,
    configured: Option<&Secret<String>>,
) -> Result<Secret<String>> {
    if mode == AuthMode::Refresh {
        cache.clear()?;
    } else if let Some(token) = cache.load() {
        return Ok(token);
    }

    let token = configured
        .filter(|t| !t.expose_secret().is_empty())
        .cloned()
        .ok_or_else(|| {
            Error::message(
                "no YouTube access token: set youtube.access_token or YOUTUBE_ACCESS_TOKEN",
            )
        })?;

    if let Err(e) = cache.save(&token) {
        warn!(path = %cache.path().display(), error = %e, "could not cache access token");
    }
    Ok(token)
}
