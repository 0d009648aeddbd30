use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::ChorusConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["chorus.toml", "chorus.yaml", "chorus.yml", "chorus.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ChorusConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chorus.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chorus/chorus.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ChorusConfig::default()` if no config file is found or the one
/// found cannot be parsed.
pub fn discover_and_load() -> ChorusConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ChorusConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chorus/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chorus").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<ChorusConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, std::io::Write};

    fn write_temp(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_toml() {
        let file = write_temp(
            ".toml",
            r#"
            [polling]
            slack = 0.1
            fallback_interval_ms = 250
            "#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert!((cfg.polling.slack - 0.1).abs() < f64::EPSILON);
        assert_eq!(cfg.polling.fallback_interval_ms, 250);
    }

    #[test]
    fn loads_yaml() {
        let file = write_temp(".yaml", "relay:\n  echo_to_source: false\n");
        let cfg = load_config(file.path()).unwrap();
        assert!(!cfg.relay.echo_to_source);
        assert_eq!(cfg.relay.marker, "/r ");
    }

    #[test]
    fn loads_json() {
        let file = write_temp(".json", r#"{"outbound": {"queue_capacity": 8}}"#);
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.outbound.queue_capacity, 8);
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = write_temp(".ini", "marker=x");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == "ini"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let file = write_temp(".toml", "[relay\nmarker = ");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config(Path::new("/nonexistent/chorus.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
