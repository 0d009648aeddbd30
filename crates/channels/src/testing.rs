//! Scripted in-memory chat service for tests.
//!
//! Each channel replays a fixed list of poll steps; once a channel's script
//! runs out it either fails (the default, which ends that channel's poller)
//! or keeps returning empty batches. Sends are recorded per channel.

use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::Mutex,
    time::Duration,
};

use {
    async_trait::async_trait,
    chorus_common::{ChannelId, ChatMessage},
    tokio::time::Instant,
};

use crate::{
    Error, Result,
    service::{ChannelResolver, LiveChatService, PollBatch},
};

/// One scripted poll response.
#[derive(Debug, Clone)]
pub enum PollStep {
    Batch(PollBatch),
    Fail(String),
}

/// A batch of `(id, text)` messages with a polling hint in milliseconds.
pub fn batch(hint_ms: u64, items: &[(&str, &str)]) -> PollStep {
    PollStep::Batch(PollBatch::new(
        items
            .iter()
            .map(|(id, text)| ChatMessage::new(*id, *text))
            .collect(),
        Duration::from_millis(hint_ms),
    ))
}

#[derive(Debug, Clone)]
enum WhenExhausted {
    Fail(String),
    Idle(Duration),
}

#[derive(Debug)]
struct State {
    scripts: HashMap<ChannelId, VecDeque<PollStep>>,
    exhausted: WhenExhausted,
    polls: HashMap<ChannelId, Vec<Instant>>,
    sent: Vec<(ChannelId, String)>,
    failing_sends: Vec<(ChannelId, Option<String>)>,
    send_delays: HashMap<ChannelId, Duration>,
    resolutions: HashMap<String, ChannelId>,
}

#[derive(Debug)]
pub struct ScriptedService {
    state: Mutex<State>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                scripts: HashMap::new(),
                exhausted: WhenExhausted::Fail("script exhausted".into()),
                polls: HashMap::new(),
                sent: Vec::new(),
                failing_sends: Vec::new(),
                send_delays: HashMap::new(),
                resolutions: HashMap::new(),
            }),
        }
    }

    fn with_state(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.lock());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append poll steps for `channel`.
    pub fn script(self, channel: &ChannelId, steps: impl IntoIterator<Item = PollStep>) -> Self {
        let channel = channel.clone();
        self.with_state(|s| s.scripts.entry(channel).or_default().extend(steps))
    }

    /// Exhausted scripts fail with `message`.
    pub fn then_fail_with(self, message: &str) -> Self {
        let message = message.to_string();
        self.with_state(|s| s.exhausted = WhenExhausted::Fail(message))
    }

    /// Exhausted scripts return empty batches with this hint instead of failing.
    pub fn idle_when_exhausted(self, hint_ms: u64) -> Self {
        self.with_state(|s| s.exhausted = WhenExhausted::Idle(Duration::from_millis(hint_ms)))
    }

    /// Every send to `channel` fails.
    pub fn fail_sends_to(self, channel: &ChannelId) -> Self {
        let channel = channel.clone();
        self.with_state(|s| s.failing_sends.push((channel, None)))
    }

    /// Sends of exactly `text` to `channel` fail.
    pub fn fail_sends_matching(self, channel: &ChannelId, text: &str) -> Self {
        let entry = (channel.clone(), Some(text.to_string()));
        self.with_state(|s| s.failing_sends.push(entry))
    }

    /// Sends to `channel` take `delay` before completing.
    pub fn send_delay(self, channel: &ChannelId, delay: Duration) -> Self {
        let channel = channel.clone();
        self.with_state(|s| {
            s.send_delays.insert(channel, delay);
        })
    }

    /// `url` resolves to `channel`; any other URL fails to resolve.
    pub fn resolves(self, url: &str, channel: &str) -> Self {
        let (url, channel) = (url.to_string(), ChannelId::new(channel));
        self.with_state(|s| {
            s.resolutions.insert(url, channel);
        })
    }

    /// Successful sends, in completion order.
    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.lock().sent.clone()
    }

    pub fn sent_to(&self, channel: &ChannelId) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// When each poll of `channel` started.
    pub fn poll_times(&self, channel: &ChannelId) -> Vec<Instant> {
        self.lock().polls.get(channel).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LiveChatService for ScriptedService {
    async fn poll(&self, channel: &ChannelId) -> Result<PollBatch> {
        let step = {
            let mut state = self.lock();
            state
                .polls
                .entry(channel.clone())
                .or_default()
                .push(Instant::now());
            let next = state.scripts.get_mut(channel).and_then(VecDeque::pop_front);
            match (next, &state.exhausted) {
                (Some(step), _) => step,
                (None, WhenExhausted::Fail(message)) => PollStep::Fail(message.clone()),
                (None, WhenExhausted::Idle(hint)) => {
                    PollStep::Batch(PollBatch::new(Vec::new(), *hint))
                },
            }
        };

        match step {
            PollStep::Batch(batch) => Ok(batch),
            PollStep::Fail(message) => Err(Error::external(
                format!("poll {channel}"),
                io::Error::other(message),
            )),
        }
    }

    async fn send(&self, channel: &ChannelId, text: &str) -> Result<()> {
        let (delay, fails) = {
            let state = self.lock();
            let fails = state.failing_sends.iter().any(|(c, matching)| {
                c == channel && matching.as_deref().is_none_or(|m| m == text)
            });
            (state.send_delays.get(channel).copied(), fails)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fails {
            return Err(Error::external(
                format!("send to {channel}"),
                io::Error::other("rejected by scripted service"),
            ));
        }

        self.lock().sent.push((channel.clone(), text.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ChannelResolver for ScriptedService {
    async fn resolve(&self, url: &str) -> Result<ChannelId> {
        self.lock()
            .resolutions
            .get(url)
            .cloned()
            .ok_or_else(|| Error::resolve(url, io::Error::new(io::ErrorKind::NotFound, "no live chat")))
    }
}
