//! Registration prompt lifecycle
//!
//! Keeps one registration prompt alive in the registration channel across
//! restarts. The prompt's button handler is routed by its fixed custom id,
//! so any surviving message that still carries that button is as good as a
//! fresh one: at startup the recent history is scanned for a prompt the bot
//! posted earlier, and a new one is posted only if none is found.

use crate::error::{ConfigError, PromptError, TransportError};
use crate::platform::{
    ChannelId, ChannelMessage, ChatTransport, Component, MessageId, OutgoingMessage, UserId,
    BUTTON_STYLE_PRIMARY,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Custom id of the registration button. Changing it orphans every prompt
/// already posted.
pub const REGISTER_BUTTON_ID: &str = "register_button";

pub const DEFAULT_PROMPT_TEXT: &str = "📋 Click the button below to register for the tournament!";
const BUTTON_LABEL: &str = "Register";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    Unknown,
    Searching,
    /// An earlier prompt is still live and was reused
    Found(MessageId),
    /// A new prompt was posted
    Posted(MessageId),
}

/// The prompt message body
pub fn prompt_message(text: &str) -> OutgoingMessage {
    OutgoingMessage {
        content: text.to_string(),
        components: vec![Component::action_row(vec![Component::button(
            REGISTER_BUTTON_ID,
            BUTTON_LABEL,
            BUTTON_STYLE_PRIMARY,
        )])],
    }
}

/// A message counts as our prompt if we authored it and it still exposes
/// the registration button
pub fn is_registration_prompt(message: &ChannelMessage, bot_id: UserId) -> bool {
    message.author.id == bot_id && message.has_control(REGISTER_BUTTON_ID)
}

/// Prompt state for one channel
pub struct PromptLifecycle {
    transport: Arc<dyn ChatTransport>,
    channel: ChannelId,
    prompt_text: String,
    history_window: u8,
    state: PromptState,
}

impl PromptLifecycle {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        channel: ChannelId,
        prompt_text: impl Into<String>,
        history_window: u8,
    ) -> Self {
        Self {
            transport,
            channel,
            prompt_text: prompt_text.into(),
            history_window,
            state: PromptState::Unknown,
        }
    }

    pub fn state(&self) -> PromptState {
        self.state
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Reuse the prompt from an earlier run or post a new one.
    ///
    /// A missing or inaccessible channel is reported as a configuration
    /// error; the caller decides whether that is fatal.
    pub async fn ensure_prompt(&mut self) -> Result<PromptState, PromptError> {
        self.transport
            .fetch_channel(self.channel)
            .await
            .map_err(|e| match e {
                TransportError::NotFound(reason) => {
                    PromptError::Configuration(ConfigError::ChannelUnavailable {
                        channel: self.channel,
                        reason,
                    })
                }
                other => PromptError::Transport(other),
            })?;

        let me = self.transport.current_user().await?;

        self.transition(PromptState::Searching);
        let history = self
            .transport
            .fetch_recent_messages(self.channel, self.history_window)
            .await?;
        debug!(
            "Scanning {} recent message(s) in channel {} for a registration prompt",
            history.len(),
            self.channel
        );

        if let Some(existing) = history
            .iter()
            .find(|message| is_registration_prompt(message, me.id))
        {
            info!("Found existing registration message: {}", existing.id);
            self.transition(PromptState::Found(existing.id));
            return Ok(self.state);
        }

        let posted = self.post_prompt().await?;
        info!("Posted new registration message: {}", posted);
        Ok(self.state)
    }

    /// Post a new prompt without looking for an existing one
    pub async fn post_prompt(&mut self) -> Result<MessageId, PromptError> {
        let sent = self
            .transport
            .send_message(self.channel, &prompt_message(&self.prompt_text))
            .await?;
        self.transition(PromptState::Posted(sent.id));
        Ok(sent.id)
    }

    fn transition(&mut self, next: PromptState) {
        debug!(
            "Prompt state for channel {}: {:?} -> {:?}",
            self.channel, self.state, next
        );
        self.state = next;
    }
}
