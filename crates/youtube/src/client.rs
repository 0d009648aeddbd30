use std::time::Duration;

use {
    async_trait::async_trait,
    chorus_channels::{ChannelResolver, LiveChatService, PollBatch},
    chorus_common::{ChannelId, ChatMessage},
    secrecy::{ExposeSecret, Secret},
    serde::de::DeserializeOwned,
    tracing::debug,
    url::Url,
};

use crate::{
    api::{
        ErrorResponse, InsertLiveChatMessage, LiveChatMessageListResponse, SearchListResponse,
        VideoListResponse,
    },
    error::{Context, Error, Result},
    links,
};

/// Data API v3 client. One instance is shared by every session.
pub struct YouTubeClient {
    http: reqwest::Client,
    api_base: String,
    token: Secret<String>,
}

impl std::fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("api_base", &self.api_base)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl YouTubeClient {
    pub fn new(api_base: &str, token: Secret<String>, timeout: Duration) -> Result<Self> {
        let parsed =
            Url::parse(api_base).with_context(|| format!("invalid YouTube API base {api_base}"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chorus/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: parsed.as_str().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(cfg: &chorus_config::YouTubeConfig, token: Secret<String>) -> Result<Self> {
        Self::new(
            &cfg.api_base,
            token,
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let resp = self
            .http
            .get(self.endpoint(path))
            .bearer_auth(self.token.expose_secret())
            .query(query)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// First video returned by a search for `query`.
    pub async fn search_video_id(&self, query: &str) -> Result<String> {
        let found: SearchListResponse = self
            .get("search", &[("part", "id"), ("type", "video"), ("q", query)])
            .await?;
        found
            .items
            .into_iter()
            .find_map(|hit| hit.id.video_id)
            .ok_or_else(|| Error::not_found(format!("video matching {query:?}")))
    }

    /// The live chat currently attached to `video_id`.
    pub async fn live_chat_id(&self, video_id: &str) -> Result<String> {
        let videos: VideoListResponse = self
            .get("videos", &[("part", "liveStreamingDetails"), ("id", video_id)])
            .await?;
        videos
            .items
            .into_iter()
            .find_map(|video| video.live_streaming_details?.active_live_chat_id)
            .ok_or_else(|| Error::not_found(format!("active live chat for video {video_id}")))
    }

    /// Live chat id for a watch link, falling back to search when the link
    /// does not carry a video id.
    pub async fn resolve_url(&self, url: &str) -> Result<String> {
        let video_id = match links::video_id(url) {
            Some(id) => id,
            None => {
                debug!(url, "no video id in link, searching");
                self.search_video_id(url).await?
            },
        };
        let chat_id = self.live_chat_id(&video_id).await?;
        debug!(url, video_id = %video_id, live_chat_id = %chat_id, "live chat found");
        Ok(chat_id)
    }

    pub async fn list_messages(&self, live_chat_id: &str) -> Result<LiveChatMessageListResponse> {
        self.get("liveChat/messages", &[
            ("liveChatId", live_chat_id),
            ("part", "snippet"),
        ])
        .await
    }

    pub async fn insert_message(&self, live_chat_id: &str, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.endpoint("liveChat/messages"))
            .bearer_auth(self.token.expose_secret())
            .query(&[("part", "snippet")])
            .json(&InsertLiveChatMessage::text(live_chat_id, text))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`Error::Api`], preferring the message
/// from Google's error envelope over the raw body.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or(body);
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl LiveChatService for YouTubeClient {
    async fn poll(&self, channel: &ChannelId) -> chorus_channels::Result<PollBatch> {
        let list = self
            .list_messages(channel.as_str())
            .await
            .map_err(|e| chorus_channels::Error::external(format!("list messages in {channel}"), e))?;

        let items: Vec<ChatMessage> = list
            .items
            .iter()
            .map(|m| ChatMessage::new(m.id.as_str(), m.text()))
            .collect();
        debug!(
            channel_id = %channel,
            items = items.len(),
            polling_interval_ms = list.polling_interval_millis,
            "fetched live chat messages"
        );
        Ok(PollBatch::new(
            items,
            Duration::from_millis(list.polling_interval_millis),
        ))
    }

    async fn send(&self, channel: &ChannelId, text: &str) -> chorus_channels::Result<()> {
        self.insert_message(channel.as_str(), text)
            .await
            .map_err(|e| chorus_channels::Error::external(format!("post message to {channel}"), e))
    }
}

#[async_trait]
impl ChannelResolver for YouTubeClient {
    async fn resolve(&self, url: &str) -> chorus_channels::Result<ChannelId> {
        self.resolve_url(url)
            .await
            .map(ChannelId::from)
            .map_err(|e| chorus_channels::Error::resolve(url, e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        mockito::Matcher,
        serde_json::json,
    };

    fn client(server: &mockito::Server) -> YouTubeClient {
        YouTubeClient::new(
            &server.url(),
            Secret::new("ya29.test".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> Matcher {
        Matcher::AllOf(
            pairs
                .iter()
                .map(|(k, v)| Matcher::UrlEncoded((*k).into(), (*v).into()))
                .collect(),
        )
    }

    fn live_video(chat_id: &str) -> String {
        json!({"items": [{"id": "v", "liveStreamingDetails": {"activeLiveChatId": chat_id}}]})
            .to_string()
    }

    #[tokio::test]
    async fn resolves_watch_link_without_search() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let videos = server
            .mock("GET", "/videos")
            .match_query(query(&[("part", "liveStreamingDetails"), ("id", "5qap5aO4i9A")]))
            .match_header("authorization", "Bearer ya29.test")
            .with_header("content-type", "application/json")
            .with_body(live_video("chat-lofi"))
            .create_async()
            .await;

        let id = client(&server)
            .resolve("https://youtu.be/5qap5aO4i9A")
            .await
            .unwrap();

        assert_eq!(id, ChannelId::new("chat-lofi"));
        search.assert_async().await;
        videos.assert_async().await;
    }

    #[tokio::test]
    async fn falls_back_to_search() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/search")
            .match_query(query(&[("part", "id"), ("q", "https://www.youtube.com/@lofi/live")]))
            .with_header("content-type", "application/json")
            .with_body(
                json!({"items": [
                    {"id": {"kind": "youtube#channel", "channelId": "UC1"}},
                    {"id": {"kind": "youtube#video", "videoId": "found"}}
                ]})
                .to_string(),
            )
            .create_async()
            .await;
        let _videos = server
            .mock("GET", "/videos")
            .match_query(query(&[("id", "found")]))
            .with_body(live_video("chat-found"))
            .create_async()
            .await;

        let id = client(&server)
            .resolve_url("https://www.youtube.com/@lofi/live")
            .await
            .unwrap();
        assert_eq!(id, "chat-found");
    }

    #[tokio::test]
    async fn video_without_live_chat_fails_resolution() {
        let mut server = mockito::Server::new_async().await;
        let _videos = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_body(json!({"items": [{"id": "ended"}]}).to_string())
            .create_async()
            .await;

        let err = client(&server)
            .resolve("https://youtu.be/ended")
            .await
            .unwrap_err();

        match err {
            chorus_channels::Error::Resolve { url, source } => {
                assert_eq!(url, "https://youtu.be/ended");
                assert!(source.to_string().contains("active live chat for video ended"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn poll_maps_messages_and_interval() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/liveChat/messages")
            .match_query(query(&[("liveChatId", "chat-1"), ("part", "snippet")]))
            .match_header("authorization", "Bearer ya29.test")
            .with_body(
                json!({
                    "pollingIntervalMillis": 3000,
                    "items": [
                        {"id": "m1", "snippet": {"displayMessage": "/r ping"}},
                        {"id": "m2", "snippet": {"textMessageDetails": {"messageText": "hi"}}}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let batch = client(&server).poll(&ChannelId::new("chat-1")).await.unwrap();

        assert_eq!(batch.next_poll_hint, Duration::from_millis(3000));
        assert_eq!(batch.items, [
            ChatMessage::new("m1", "/r ping"),
            ChatMessage::new("m2", "hi"),
        ]);
    }

    #[tokio::test]
    async fn empty_poll_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/liveChat/messages")
            .match_query(Matcher::Any)
            .with_body(r#"{"pollingIntervalMillis": 1500}"#)
            .create_async()
            .await;

        let batch = client(&server).poll(&ChannelId::new("chat-1")).await.unwrap();
        assert!(batch.items.is_empty());
        assert_eq!(batch.next_poll_hint, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn api_error_surfaces_google_message() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/liveChat/messages")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(
                json!({"error": {"code": 403, "message": "The live chat is no longer live."}})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server)
            .poll(&ChannelId::new("chat-1"))
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("list messages in chat-1"), "{text}");
        assert!(text.contains("403"), "{text}");
        assert!(text.contains("no longer live"), "{text}");
    }

    #[tokio::test]
    async fn send_posts_text_message_event() {
        let mut server = mockito::Server::new_async().await;
        let insert = server
            .mock("POST", "/liveChat/messages")
            .match_query(query(&[("part", "snippet")]))
            .match_header("authorization", "Bearer ya29.test")
            .match_body(Matcher::Json(json!({
                "snippet": {
                    "liveChatId": "chat-2",
                    "type": "textMessageEvent",
                    "textMessageDetails": {"messageText": "ping"}
                }
            })))
            .with_body(r#"{"id": "new"}"#)
            .create_async()
            .await;

        client(&server)
            .send(&ChannelId::new("chat-2"), "ping")
            .await
            .unwrap();
        insert.assert_async().await;
    }

    #[tokio::test]
    async fn send_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _insert = server
            .mock("POST", "/liveChat/messages")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("backend error")
            .create_async()
            .await;

        let err = client(&server)
            .send(&ChannelId::new("chat-2"), "ping")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("backend error"));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = YouTubeClient::new("not a url", Secret::new(String::new()), Duration::from_secs(1))
            .unwrap_err();
        assert!(err.to_string().contains("invalid YouTube API base"));
    }

    #[test]
    fn debug_hides_token() {
        let client = YouTubeClient::new(
            "https://example.com/youtube/v3/",
            Secret::new("secret-token".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.endpoint("videos"), "https://example.com/youtube/v3/videos");
        assert!(!format!("{client:?}").contains("secret-token"));
    }
}
