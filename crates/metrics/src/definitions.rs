//! Metric name and label definitions.
//!
//! Every metric chorus records is named here so the full set is visible in
//! one place.

/// Per-channel polling and sending.
pub mod channels {
    /// Poll calls made against the chat service
    pub const POLLS_TOTAL: &str = "chorus_channel_polls_total";
    /// Poll calls that failed (each one ends that channel's poller)
    pub const POLL_ERRORS_TOTAL: &str = "chorus_channel_poll_errors_total";
    /// Unseen messages emitted by pollers
    pub const MESSAGES_RECEIVED_TOTAL: &str = "chorus_channel_messages_received_total";
    /// Messages dropped because their id was already seen
    pub const DUPLICATES_SKIPPED_TOTAL: &str = "chorus_channel_duplicates_skipped_total";
    /// Messages delivered to the chat service
    pub const MESSAGES_SENT_TOTAL: &str = "chorus_channel_messages_sent_total";
    /// Sends rejected by the chat service
    pub const SEND_ERRORS_TOTAL: &str = "chorus_channel_send_errors_total";
    /// Duration of a single send, in seconds
    pub const SEND_DURATION_SECONDS: &str = "chorus_channel_send_duration_seconds";
    /// Sessions currently running
    pub const SESSIONS_ACTIVE: &str = "chorus_channel_sessions_active";
}

/// Relay fan-in and fan-out.
pub mod relay {
    /// Inbound messages that matched the trigger and were broadcast
    pub const RELAYED_TOTAL: &str = "chorus_relay_relayed_total";
    /// Inbound messages ignored by the trigger rule
    pub const DISCARDED_TOTAL: &str = "chorus_relay_discarded_total";
    /// Submissions to an outbound sink that failed
    pub const FANOUT_ERRORS_TOTAL: &str = "chorus_relay_fanout_errors_total";
}

/// Common label keys
pub mod labels {
    pub const CHANNEL: &str = "channel";
}
