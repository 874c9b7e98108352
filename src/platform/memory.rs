//! In-memory chat transport
//!
//! Keeps channel histories in process so the prompt lifecycle and the
//! interaction router can run without a platform connection.

use super::{
    Channel, ChannelId, ChannelMessage, ChatTransport, GuildId, MessageId, OutgoingMessage,
    RoleId, User, UserId,
};
use crate::error::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

pub struct MemoryTransport {
    me: User,
    /// Oldest first
    channels: Mutex<HashMap<ChannelId, Vec<ChannelMessage>>>,
    roles: Mutex<HashMap<GuildId, HashMap<RoleId, String>>>,
    next_message_id: AtomicU64,
    sent: AtomicUsize,
    history_fetches: AtomicUsize,
    /// Answer history and send calls with a server error while set
    failing_history: AtomicBool,
    failing_sends: AtomicBool,
}

impl MemoryTransport {
    pub fn new(me: User) -> Self {
        Self {
            me,
            channels: Mutex::new(HashMap::new()),
            roles: Mutex::new(HashMap::new()),
            next_message_id: AtomicU64::new(1),
            sent: AtomicUsize::new(0),
            history_fetches: AtomicUsize::new(0),
            failing_history: AtomicBool::new(false),
            failing_sends: AtomicBool::new(false),
        }
    }

    pub fn add_channel(&self, channel: ChannelId) {
        self.channels.lock().entry(channel).or_default();
    }

    pub fn add_role(&self, guild: GuildId, role: RoleId, name: &str) {
        self.roles
            .lock()
            .entry(guild)
            .or_default()
            .insert(role, name.to_string());
    }

    /// Append a message authored by someone else (or by the bot in an
    /// earlier run) without counting it as sent
    pub fn seed_message(&self, channel: ChannelId, author: User, message: OutgoingMessage) {
        let record = self.build(channel, author, message);
        self.channels.lock().entry(channel).or_default().push(record);
    }

    /// Number of `send_message` calls served
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn history_fetch_count(&self) -> usize {
        self.history_fetches.load(Ordering::SeqCst)
    }

    pub fn fail_history(&self, failing: bool) {
        self.failing_history.store(failing, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, failing: bool) {
        self.failing_sends.store(failing, Ordering::SeqCst);
    }

    /// Messages in a channel, oldest first
    pub fn messages(&self, channel: ChannelId) -> Vec<ChannelMessage> {
        self.channels
            .lock()
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }

    fn build(&self, channel: ChannelId, author: User, message: OutgoingMessage) -> ChannelMessage {
        ChannelMessage {
            id: MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst)),
            channel_id: channel,
            author,
            content: message.content,
            components: message.components,
        }
    }

    fn unknown_channel(channel: ChannelId) -> TransportError {
        TransportError::NotFound(format!("channel {}", channel))
    }

    fn unavailable(endpoint: String) -> TransportError {
        TransportError::Status {
            endpoint,
            status: 503,
            body: "service unavailable".to_string(),
        }
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn current_user(&self) -> Result<User, TransportError> {
        Ok(self.me.clone())
    }

    async fn fetch_channel(&self, channel: ChannelId) -> Result<Channel, TransportError> {
        if !self.channels.lock().contains_key(&channel) {
            return Err(Self::unknown_channel(channel));
        }
        Ok(Channel {
            id: channel,
            name: None,
            guild_id: None,
        })
    }

    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>, TransportError> {
        self.history_fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing_history.load(Ordering::SeqCst) {
            return Err(Self::unavailable(format!("channels/{}/messages", channel)));
        }
        let channels = self.channels.lock();
        let history = channels
            .get(&channel)
            .ok_or_else(|| Self::unknown_channel(channel))?;
        Ok(history
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: &OutgoingMessage,
    ) -> Result<ChannelMessage, TransportError> {
        if self.failing_sends.load(Ordering::SeqCst) {
            return Err(Self::unavailable(format!("channels/{}/messages", channel)));
        }
        let mut channels = self.channels.lock();
        let history = channels
            .get_mut(&channel)
            .ok_or_else(|| Self::unknown_channel(channel))?;
        let record = self.build(channel, self.me.clone(), message.clone());
        history.push(record.clone());
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn guild_role_names(
        &self,
        guild: GuildId,
    ) -> Result<HashMap<RoleId, String>, TransportError> {
        self.roles
            .lock()
            .get(&guild)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(format!("guild {}", guild)))
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new(User {
            id: UserId(1),
            username: "registrar".to_string(),
        })
    }
}
