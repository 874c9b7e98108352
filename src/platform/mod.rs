//! Platform model and transport seam
//!
//! The subset of the Discord object model the bot reads and writes, plus the
//! [`ChatTransport`] trait the prompt lifecycle talks through. The REST
//! implementation lives in [`crate::discord_client`]; [`memory`] holds an
//! in-process implementation for tests and dry runs.

pub mod memory;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SNOWFLAKE IDS
// ============================================================================

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        // Discord sends snowflakes as strings; config files use integers.
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Text(String),
                    Number(u64),
                }

                match Raw::deserialize(deserializer)? {
                    Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
                    Raw::Number(n) => Ok(Self(n)),
                }
            }
        }
    };
}

snowflake_id!(
    /// Platform user id
    UserId
);
snowflake_id!(ChannelId);
snowflake_id!(MessageId);
snowflake_id!(GuildId);
snowflake_id!(RoleId);

// ============================================================================
// OBJECT MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

/// A message as returned by the channel history endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl ChannelMessage {
    /// Whether any interactive element of this message carries `custom_id`
    pub fn has_control(&self, custom_id: &str) -> bool {
        self.components.iter().any(|c| c.contains_custom_id(custom_id))
    }
}

/// Component type tags
pub const COMPONENT_ACTION_ROW: u8 = 1;
pub const COMPONENT_BUTTON: u8 = 2;
pub const COMPONENT_TEXT_INPUT: u8 = 4;

pub const BUTTON_STYLE_PRIMARY: u8 = 1;
pub const TEXT_INPUT_STYLE_SHORT: u8 = 1;

/// Interactive message component (action row, button or text input).
///
/// Discord tags components with an integer `type`, so this is one flat
/// struct rather than a serde-tagged enum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Component {
    pub fn action_row(components: Vec<Component>) -> Self {
        Self {
            kind: COMPONENT_ACTION_ROW,
            components,
            ..Default::default()
        }
    }

    pub fn button(custom_id: &str, label: &str, style: u8) -> Self {
        Self {
            kind: COMPONENT_BUTTON,
            custom_id: Some(custom_id.to_string()),
            label: Some(label.to_string()),
            style: Some(style),
            ..Default::default()
        }
    }

    pub fn text_input(custom_id: &str, label: &str, required: bool) -> Self {
        Self {
            kind: COMPONENT_TEXT_INPUT,
            custom_id: Some(custom_id.to_string()),
            label: Some(label.to_string()),
            style: Some(TEXT_INPUT_STYLE_SHORT),
            required: Some(required),
            ..Default::default()
        }
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    /// Search this component and its children for `custom_id`
    pub fn contains_custom_id(&self, custom_id: &str) -> bool {
        self.custom_id.as_deref() == Some(custom_id)
            || self
                .components
                .iter()
                .any(|child| child.contains_custom_id(custom_id))
    }

    /// Find the submitted value of the text input named `custom_id`
    pub fn find_value(&self, custom_id: &str) -> Option<&str> {
        if self.custom_id.as_deref() == Some(custom_id) {
            return self.value.as_deref();
        }
        self.components
            .iter()
            .find_map(|child| child.find_value(custom_id))
    }
}

/// Body of a message the bot sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Outbound calls the bot makes against the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// The bot's own identity
    async fn current_user(&self) -> Result<User, TransportError>;

    /// Resolve a channel; `TransportError::NotFound` if it does not exist or
    /// is not visible to the bot.
    async fn fetch_channel(&self, channel: ChannelId) -> Result<Channel, TransportError>;

    /// Most recent `limit` messages, newest first
    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>, TransportError>;

    async fn send_message(
        &self,
        channel: ChannelId,
        message: &OutgoingMessage,
    ) -> Result<ChannelMessage, TransportError>;

    /// Role id to role name for a guild
    async fn guild_role_names(
        &self,
        guild: GuildId,
    ) -> Result<HashMap<RoleId, String>, TransportError>;
}
