//! Wire types for the Data API v3 endpoints the client uses.
//!
//! Only the fields the relay reads are modelled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Serialize};

/// `GET search?part=id`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchListResponse {
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    /// Absent when the hit is a channel or playlist.
    #[serde(default)]
    pub video_id: Option<String>,
}

/// `GET videos?part=liveStreamingDetails`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VideoListResponse {
    pub items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamingDetails {
    /// Only present while the broadcast is live.
    #[serde(default)]
    pub active_live_chat_id: Option<String>,
}

/// `GET liveChat/messages?part=snippet`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LiveChatMessageListResponse {
    pub items: Vec<LiveChatMessage>,
    pub polling_interval_millis: u64,
}

#[derive(Debug, Deserialize)]
pub struct LiveChatMessage {
    pub id: String,
    #[serde(default)]
    pub snippet: LiveChatMessageSnippet,
}

impl LiveChatMessage {
    /// The text shown in chat. Super chats and other events carry their
    /// text in `displayMessage`; plain text messages also have it under
    /// `textMessageDetails`.
    pub fn text(&self) -> &str {
        match self.snippet.display_message.as_deref() {
            Some(text) => text,
            None => self
                .snippet
                .text_message_details
                .as_ref()
                .map_or("", |d| d.message_text.as_str()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LiveChatMessageSnippet {
    pub display_message: Option<String>,
    pub text_message_details: Option<TextMessageDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessageDetails {
    pub message_text: String,
}

/// Body of `POST liveChat/messages?part=snippet`.
#[derive(Debug, Serialize)]
pub struct InsertLiveChatMessage<'a> {
    pub snippet: InsertSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertSnippet<'a> {
    pub live_chat_id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text_message_details: InsertTextDetails<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTextDetails<'a> {
    pub message_text: &'a str,
}

impl<'a> InsertLiveChatMessage<'a> {
    pub fn text(live_chat_id: &'a str, message_text: &'a str) -> Self {
        Self {
            snippet: InsertSnippet {
                live_chat_id,
                kind: "textMessageEvent",
                text_message_details: InsertTextDetails { message_text },
            },
        }
    }
}

/// Google's error envelope: `{"error": {"code": 403, "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn message_list_reads_text_and_interval() {
        let body = r#"{
            "kind": "youtube#liveChatMessageListResponse",
            "pollingIntervalMillis": 2500,
            "items": [
                {"id": "a", "snippet": {"type": "textMessageEvent", "displayMessage": "/r hi",
                    "textMessageDetails": {"messageText": "/r hi"}}},
                {"id": "b", "snippet": {"textMessageDetails": {"messageText": "only details"}}},
                {"id": "c", "snippet": {"type": "tombstone"}}
            ]
        }"#;
        let list: LiveChatMessageListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(list.polling_interval_millis, 2500);
        let texts: Vec<_> = list.items.iter().map(LiveChatMessage::text).collect();
        assert_eq!(texts, ["/r hi", "only details", ""]);
    }

    #[test]
    fn insert_body_matches_api_shape() {
        let body = serde_json::to_value(InsertLiveChatMessage::text("chat-1", "ping")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "snippet": {
                    "liveChatId": "chat-1",
                    "type": "textMessageEvent",
                    "textMessageDetails": {"messageText": "ping"}
                }
            })
        );
    }

    #[test]
    fn video_without_live_details() {
        let list: VideoListResponse =
            serde_json::from_str(r#"{"items": [{"id": "v1"}]}"#).unwrap();
        assert!(list.items[0].live_streaming_details.is_none());
    }
}
