use crate::{Error, Result};

/// Prefix rule deciding which messages get relayed.
///
/// A message matches when its text starts with the marker. The relayed
/// payload is the text with every leading repetition of the marker removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    marker: String,
}

impl Trigger {
    pub fn new(marker: impl Into<String>) -> Result<Self> {
        let marker = marker.into();
        if marker.is_empty() {
            return Err(Error::EmptyMarker);
        }
        Ok(Self { marker })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn matches(&self, text: &str) -> bool {
        text.starts_with(&self.marker)
    }

    /// Remove every leading repetition of the marker.
    pub fn strip<'a>(&self, text: &'a str) -> &'a str {
        let mut rest = text;
        while let Some(stripped) = rest.strip_prefix(self.marker.as_str()) {
            rest = stripped;
        }
        rest
    }

    /// The payload to relay, or `None` when `text` does not match.
    ///
    /// Text made only of markers yields `Some("")`. The relay counts that
    /// as discarded and sends nothing.
    pub fn apply<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.matches(text).then(|| self.strip(text))
    }
}

impl TryFrom<&chorus_config::RelayConfig> for Trigger {
    type Error = Error;

    fn try_from(cfg: &chorus_config::RelayConfig) -> Result<Self> {
        Self::new(cfg.marker.clone())
    }
}
