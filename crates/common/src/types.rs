use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Identifies one live chat. Opaque to everything except the service that
/// issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A chat message as seen by a poller.
///
/// `id` is the service-assigned identifier and is only used for
/// deduplication; it is never sent back out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_serializes_as_plain_string() {
        let id = ChannelId::new("Cg0KC2xpdmVjaGF0");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"Cg0KC2xpdmVjaGF0\""
        );
        assert_eq!(id.to_string(), "Cg0KC2xpdmVjaGF0");
    }
}
